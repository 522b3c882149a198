//! 最终分析 - 业务能力层
//!
//! 把特征列表和合并后的评论摘要组装成一次分析调用，
//! 返回原始文本交给解析器处理

use std::sync::Arc;

use tracing::debug;

use crate::error::AppResult;
use crate::models::FeatureSet;
use crate::services::inference::Inference;
use crate::services::retry::RetryPolicy;

/// 评论分析服务
pub struct ReviewAnalyst {
    inference: Arc<dyn Inference>,
    retry: RetryPolicy,
}

impl ReviewAnalyst {
    pub fn new(inference: Arc<dyn Inference>, retry: RetryPolicy) -> Self {
        Self { inference, retry }
    }

    /// 针对每个特征做情感分析，返回 LLM 的原始文本输出
    pub async fn analyze(&self, features: &FeatureSet, reviews_input: &str) -> AppResult<String> {
        let prompt = build_analysis_prompt(features, reviews_input);
        debug!("分析提示词长度: {} 字符", prompt.len());
        self.retry.run(|| self.inference.complete(&prompt)).await
    }
}

fn build_analysis_prompt(features: &FeatureSet, reviews_input: &str) -> String {
    format!(
        "You are a product review analyst. Based on the review summaries below, analyze \
         customer sentiment for each of the following features: {}.\n\n\
         Respond with ONLY a JSON array in a fenced code block. One element per feature, \
         in the order given above, shaped like:\n\
         ```json\n\
         [{{\"feature\": \"...\", \"sentiment\": \"Positive|Negative|Mixed\", \
         \"verdict\": \"one sentence\", \"key_points\": [\"...\"]}}]\n\
         ```\n\n\
         Review summaries:\n{}",
        features.join(", "),
        reviews_input
    )
}
