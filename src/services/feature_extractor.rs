//! 特征提取 - 业务能力层
//!
//! 只负责"从商品信息提取可分析特征"能力，不关心流程

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AppError, AppResult, PipelineError};
use crate::models::{FeatureSet, ProductIdentity};
use crate::services::inference::Inference;
use crate::services::retry::RetryPolicy;

/// 特征提取服务
pub struct FeatureExtractor {
    inference: Arc<dyn Inference>,
    retry: RetryPolicy,
    max_features: usize,
}

impl FeatureExtractor {
    pub fn new(inference: Arc<dyn Inference>, retry: RetryPolicy, max_features: usize) -> Self {
        Self {
            inference,
            retry,
            max_features,
        }
    }

    /// 提取商品的关键特征，截断到配置上限，保留模型给出的顺序
    pub async fn extract(&self, identity: &ProductIdentity) -> AppResult<FeatureSet> {
        let prompt = build_feature_prompt(identity);
        debug!("特征提取提示词长度: {} 字符", prompt.len());

        let raw = self
            .retry
            .run(|| self.inference.complete(&prompt))
            .await?;

        let features = parse_feature_response(&raw)?;
        info!("✅ 特征提取完成: 共 {} 个特征", features.len());

        Ok(FeatureSet::new(features).capped(self.max_features))
    }
}

fn build_feature_prompt(identity: &ProductIdentity) -> String {
    format!(
        "You are a product research assistant. Identify the key product features \
         that customers care about for the following product.\n\n\
         Product: {}\nURL: {}\n\n\
         Respond with ONLY a JSON object in a fenced code block, for example:\n\
         ```json\n{{\"features\": [\"battery\", \"grip\"]}}\n```\n\
         List at most 10 features, most important first.",
        identity.display_name(),
        identity.url()
    )
}

/// 解析特征提取响应
///
/// 接受 `{"features": [...]}` 对象或裸数组两种形态
pub fn parse_feature_response(raw: &str) -> AppResult<Vec<String>> {
    let json_str = crate::services::parser::extract_json_from_markdown(raw);
    let value: serde_json::Value = serde_json::from_str(&json_str).map_err(|e| {
        AppError::Pipeline(PipelineError::FeatureExtractionFailed {
            source: Box::new(AppError::Other(format!("特征列表不是合法 JSON: {}", e))),
        })
    })?;

    let items = match &value {
        serde_json::Value::Object(map) => map.get("features").and_then(|v| v.as_array()),
        serde_json::Value::Array(_) => value.as_array(),
        _ => None,
    };

    let features: Vec<String> = items
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if features.is_empty() {
        return Err(AppError::Pipeline(PipelineError::FeatureExtractionFailed {
            source: Box::new(AppError::Other("响应中没有可用的特征列表".to_string())),
        }));
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_object_response() {
        let raw = "Sure!\n```json\n{\"features\": [\"battery\", \"grip\"]}\n```";
        let features = parse_feature_response(raw).unwrap();
        assert_eq!(features, ["battery", "grip"]);
    }

    #[test]
    fn test_parse_bare_array_response() {
        let raw = "[\"comfort\", \"durability\", \"price\"]";
        let features = parse_feature_response(raw).unwrap();
        assert_eq!(features, ["comfort", "durability", "price"]);
    }

    #[test]
    fn test_parse_rejects_prose_only_response() {
        let result = parse_feature_response("I could not find any features.");
        assert!(matches!(
            result,
            Err(AppError::Pipeline(
                PipelineError::FeatureExtractionFailed { .. }
            ))
        ));
    }

    #[test]
    fn test_parse_skips_blank_entries() {
        let raw = "{\"features\": [\"battery\", \"  \", \"grip\"]}";
        let features = parse_feature_response(raw).unwrap();
        assert_eq!(features, ["battery", "grip"]);
    }
}
