//! 评论分块摘要 - 业务能力层
//!
//! 大评论集无法一次性塞进提示词，这里把评论切成有界批次、
//! 逐批调用推理做增量摘要。摘要天然有损，
//! 换来的是提示词规模与评论数量解耦。

use std::sync::Arc;

use tracing::info;

use crate::error::AppResult;
use crate::models::ReviewRecord;
use crate::services::inference::Inference;
use crate::services::retry::RetryPolicy;

/// 把评论切成每批最多 `chunk_size` 条的连续批次
///
/// 保持输入顺序，所有批次拼接起来恰好覆盖每条评论一次
pub fn chunk(reviews: &[ReviewRecord], chunk_size: usize) -> Vec<&[ReviewRecord]> {
    if reviews.is_empty() {
        return Vec::new();
    }
    reviews.chunks(chunk_size.max(1)).collect()
}

/// 按批次顺序用空行拼接摘要，作为最终分析的输入
pub fn combine_summaries(summaries: &[String]) -> String {
    summaries.join("\n\n")
}

/// 评论摘要服务
pub struct ReviewSummarizer {
    inference: Arc<dyn Inference>,
    retry: RetryPolicy,
    chunk_size: usize,
}

impl ReviewSummarizer {
    pub fn new(inference: Arc<dyn Inference>, retry: RetryPolicy, chunk_size: usize) -> Self {
        Self {
            inference,
            retry,
            chunk_size,
        }
    }

    /// 分块摘要，返回按批次顺序排列的摘要列表
    pub async fn summarize_chunked(&self, reviews: &[ReviewRecord]) -> AppResult<Vec<String>> {
        let batches = chunk(reviews, self.chunk_size);
        let total = batches.len();
        let mut summaries = Vec::with_capacity(total);

        for (index, batch) in batches.iter().enumerate() {
            info!(
                "📝 正在摘要第 {}/{} 批评论 ({} 条)",
                index + 1,
                total,
                batch.len()
            );
            let prompt = build_summary_prompt(batch);
            let summary = self.retry.run(|| self.inference.complete(&prompt)).await?;
            summaries.push(summary);
        }

        Ok(summaries)
    }
}

fn build_summary_prompt(batch: &[ReviewRecord]) -> String {
    let mut lines = String::new();
    for review in batch {
        lines.push_str(&format!(
            "- [{:.1}/5] {}: {}\n",
            review.rating, review.title, review.text
        ));
    }
    format!(
        "Summarize the following customer reviews concisely. Focus on the overall tone, \
         frequently mentioned product features, and any strong positive or negative \
         sentiments.\n\nReviews:\n{}\nSummary:",
        lines
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(text: &str) -> ReviewRecord {
        ReviewRecord {
            product_name: "Shoes".to_string(),
            brand: "Asian".to_string(),
            rating: 4.0,
            title: "标题".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_chunk_covers_every_element_exactly_once_in_order() {
        let reviews: Vec<ReviewRecord> =
            (0..45).map(|i| review(&format!("review-{}", i))).collect();

        for chunk_size in [1usize, 7, 30, 45, 100] {
            let batches = chunk(&reviews, chunk_size);
            // 每批不超过 chunk_size
            assert!(batches.iter().all(|b| b.len() <= chunk_size));
            // 按序拼接后恰好还原原始序列
            let flattened: Vec<&ReviewRecord> =
                batches.iter().flat_map(|b| b.iter()).collect();
            assert_eq!(flattened.len(), reviews.len());
            for (original, flattened) in reviews.iter().zip(flattened) {
                assert_eq!(original.text, flattened.text);
            }
        }
    }

    #[test]
    fn test_chunk_sizes_for_45_reviews_of_30() {
        let reviews: Vec<ReviewRecord> = (0..45).map(|i| review(&i.to_string())).collect();
        let batches = chunk(&reviews, 30);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 30);
        assert_eq!(batches[1].len(), 15);
    }

    #[test]
    fn test_chunk_empty_input() {
        let batches = chunk(&[], 30);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_combine_summaries_blank_line_separated() {
        let combined = combine_summaries(&["第一批".to_string(), "第二批".to_string()]);
        assert_eq!(combined, "第一批\n\n第二批");
    }

    #[test]
    fn test_summary_prompt_mentions_tone_and_features() {
        let prompt = build_summary_prompt(&[review("great grip")]);
        assert!(prompt.contains("tone"));
        assert!(prompt.contains("great grip"));
    }
}
