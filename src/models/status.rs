//! 流水线状态
//!
//! 由编排器独占持有、加锁修改的共享进度记录，
//! 后台任务的中间进度也写到这里，外部调用方随时可读快照

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{FeatureSet, WorkflowResult};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// 空闲，尚未开始
    Idle,
    /// 正在提取特征
    Extracting,
    /// 正在爬取评论
    Scraping,
    /// 正在分块摘要
    Summarizing,
    /// 正在最终分析
    Analyzing,
    /// 完成
    Done,
    /// 失败
    Failed,
}

impl Phase {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// 流水线状态快照
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    /// 当前阶段
    pub phase: Phase,
    /// 进度（0-100，固定里程碑）
    pub progress: u8,
    /// 失败时的可读错误信息
    pub error: Option<String>,
    /// 最终结果
    pub result: Option<WorkflowResult>,
    /// 本次运行的开始时间
    pub start_time: Option<DateTime<Local>>,
    /// 提前发布的特征（评论仍在爬取时即可读到）
    pub features: Option<FeatureSet>,
    /// 缓存有效性标记：是否存在已缓存的评论
    pub reviews_cached: bool,
    /// 缓存有效性标记：缓存评论所属的商品 URL
    pub cached_product_url: Option<String>,
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            progress: 0,
            error: None,
            result: None,
            start_time: None,
            features: None,
            reviews_cached: false,
            cached_product_url: None,
        }
    }
}

impl PipelineStatus {
    /// 是否有流程在运行（Idle/Done/Failed 之外都视为运行中）
    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Done | Phase::Failed)
    }

    /// 新一轮运行前的重置
    ///
    /// 缓存有效性标记跨运行保留，同一商品连续分析时可以复用评论
    pub fn reset(&mut self) {
        let reviews_cached = self.reviews_cached;
        let cached_product_url = self.cached_product_url.take();
        *self = Self {
            reviews_cached,
            cached_product_url,
            ..Self::default()
        };
    }
}
