//! 流水线集成测试
//!
//! 注入内存实现的推理和评论源，脱离网络跑通整条流水线

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use revify::config::Config;
use revify::error::{AppError, AppResult, ScrapeError};
use revify::models::{Phase, ProductIdentity, ReviewRecord};
use revify::orchestrator::Orchestrator;
use revify::scraper::ReviewSource;
use revify::services::{DelayFn, Inference, RetryPolicy};

/// 不真实等待的重试策略
fn instant_retry() -> RetryPolicy {
    let instant: DelayFn = Arc::new(|_| Box::pin(async {}));
    RetryPolicy::new().with_delay_fn(instant)
}

/// 按提示词内容分发响应的推理 mock
struct MockInference {
    fail_features: AtomicBool,
}

impl MockInference {
    fn new() -> Self {
        Self {
            fail_features: AtomicBool::new(false),
        }
    }

    fn failing_features() -> Self {
        Self {
            fail_features: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl Inference for MockInference {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        if prompt.contains("Summarize the following customer reviews") {
            return Ok("Customers praise the battery life and the grip.".to_string());
        }
        if prompt.contains("review analyst") {
            return Ok(concat!(
                "```json\n",
                "[{\"feature\": \"battery\", \"sentiment\": \"Mixed\", ",
                "\"verdict\": \"Lasts long but drains under load.\", ",
                "\"key_points\": [\"long standby\", \"drains fast while gaming\"]},\n",
                " {\"feature\": \"grip\", \"sentiment\": \"Positive\", ",
                "\"verdict\": \"Reliably non-slip.\", ",
                "\"key_points\": [\"non-slip\"]}]\n",
                "```"
            )
            .to_string());
        }
        // 其余情况视为特征提取请求
        if self.fail_features.load(Ordering::SeqCst) {
            return Err(AppError::Other("模型过载".to_string()));
        }
        Ok("```json\n{\"features\": [\"battery\", \"grip\"]}\n```".to_string())
    }
}

/// 固定返回 45 条评论的评论源 mock
struct MockSource {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ReviewSource for MockSource {
    async fn acquire(
        &self,
        identity: &ProductIdentity,
        target_reviews: usize,
    ) -> AppResult<Vec<ReviewRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Scrape(ScrapeError::Captcha));
        }
        Ok((0..45.min(target_reviews))
            .map(|i| ReviewRecord {
                product_name: identity.display_name().to_string(),
                brand: String::new(),
                rating: 4.0,
                title: format!("review {}", i),
                text: "battery lasts, grip is solid".to_string(),
            })
            .collect())
    }
}

fn test_config(output_dir: &std::path::Path) -> Config {
    Config {
        output_dir: output_dir.display().to_string(),
        ..Default::default()
    }
}

fn identity() -> ProductIdentity {
    ProductIdentity::new("https://www.amazon.in/dp/B01N54ZM9W", Some("Shoes".to_string()))
        .expect("合法的商品标识")
}

#[tokio::test]
async fn test_full_pipeline_completes_with_structured_result() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        test_config(dir.path()),
        Arc::new(MockInference::new()),
        Arc::new(MockSource::new()),
    )
    .with_retry_policy(instant_retry());

    orchestrator.start(identity(), None).unwrap();
    orchestrator.wait().await;

    let status = orchestrator.status();
    assert_eq!(status.phase, Phase::Done);
    assert_eq!(status.progress, 100);
    assert!(status.error.is_none());
    assert!(status.reviews_cached);
    assert_eq!(
        status.cached_product_url.as_deref(),
        Some("https://www.amazon.in/dp/B01N54ZM9W")
    );

    let result = status.result.expect("完成后应有结果");
    assert_eq!(result.total_reviews, 45);
    assert_eq!(result.analysis.len(), 2);
    assert_eq!(result.analysis[0].feature, "battery");
    assert_eq!(result.analysis[1].feature, "grip");
    assert!(std::path::Path::new(&result.output_file).exists());
}

#[tokio::test]
async fn test_feature_extraction_failure_fails_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        test_config(dir.path()),
        Arc::new(MockInference::failing_features()),
        Arc::new(MockSource::new()),
    )
    .with_retry_policy(instant_retry());

    orchestrator.start(identity(), None).unwrap();
    orchestrator.wait().await;

    let status = orchestrator.status();
    assert_eq!(status.phase, Phase::Failed);
    assert_eq!(status.progress, 0);
    assert!(status.error.unwrap().contains("特征提取"));
    assert!(status.result.is_none());
}

#[tokio::test]
async fn test_second_start_while_running_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(
        test_config(dir.path()),
        Arc::new(MockInference::new()),
        Arc::new(MockSource::new()),
    )
    .with_retry_policy(instant_retry());

    orchestrator.start(identity(), None).unwrap();
    let second = orchestrator.start(identity(), None);
    assert!(matches!(
        second,
        Err(AppError::Pipeline(
            revify::error::PipelineError::AlreadyRunning
        ))
    ));

    orchestrator.wait().await;
    assert_eq!(orchestrator.status().phase, Phase::Done);
}

#[tokio::test]
async fn test_selected_features_reuse_cached_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MockSource::new());
    let orchestrator = Orchestrator::new(
        test_config(dir.path()),
        Arc::new(MockInference::new()),
        source.clone(),
    )
    .with_retry_policy(instant_retry());

    let selected = Some(vec!["battery".to_string(), "grip".to_string()]);

    orchestrator.start(identity(), selected.clone()).unwrap();
    orchestrator.wait().await;
    assert_eq!(orchestrator.status().phase, Phase::Done);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    // 同一商品的第二次运行复用缓存评论，不再触达评论源
    orchestrator.start(identity(), selected).unwrap();
    orchestrator.wait().await;
    assert_eq!(orchestrator.status().phase, Phase::Done);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_review_failure_tolerated_when_cache_holds_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MockSource::new());
    let orchestrator = Orchestrator::new(
        test_config(dir.path()),
        Arc::new(MockInference::new()),
        source.clone(),
    )
    .with_retry_policy(instant_retry());

    // 第一轮正常跑完，缓存里留下评论
    orchestrator.start(identity(), None).unwrap();
    orchestrator.wait().await;
    assert_eq!(orchestrator.status().phase, Phase::Done);

    // 第二轮评论源挂了，降级使用缓存
    source.fail.store(true, Ordering::SeqCst);
    orchestrator.start(identity(), None).unwrap();
    orchestrator.wait().await;

    let status = orchestrator.status();
    assert_eq!(status.phase, Phase::Done);
    assert_eq!(status.result.unwrap().total_reviews, 45);
}
