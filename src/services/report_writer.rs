//! 结果写入服务 - 业务能力层
//!
//! 只负责"把分析产物写进输出目录"能力，不关心流程

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::models::AnalysisResult;

/// 结果写入服务
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 把最终分析结果写成带时间戳的 JSON 文件，返回文件路径
    pub fn save_analysis(&self, analysis: &AnalysisResult) -> AppResult<String> {
        self.ensure_output_dir()?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("feature_analysis_{}.json", timestamp));

        let json = serde_json::to_string_pretty(analysis).map_err(|e| {
            AppError::File(FileError::SerializeFailed {
                source: Box::new(e),
            })
        })?;
        fs::write(&path, json)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        debug!("结果已写入: {}", path.display());
        Ok(path.display().to_string())
    }

    /// 解析走到兜底策略时，把原始输出另存一份供事后排查
    pub fn save_raw_output(&self, raw: &str) -> AppResult<String> {
        self.ensure_output_dir()?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("raw_analysis_{}.txt", timestamp));

        fs::write(&path, raw)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        debug!("原始输出已写入: {}", path.display());
        Ok(path.display().to_string())
    }

    fn ensure_output_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            AppError::File(FileError::CreateDirFailed {
                path: self.output_dir.display().to_string(),
                source: Box::new(e),
            })
        })
    }
}
