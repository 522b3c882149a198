//! 分析流水线编排器
//!
//! 持有全部业务能力服务，把一次商品分析跑成后台任务：
//!
//! 1. 校验商品信息，重置状态（进度 10）
//! 2. 并行启动特征提取和评论获取（进度 20），特征先到先发布（进度 40）
//! 3. 评论就绪并写入缓存（进度 50）
//! 4. 分块摘要（进度 70）
//! 5. 最终分析（进度 80）
//! 6. 解析并持久化结果（进度 95），完成（进度 100）
//!
//! 任何环节失败都把状态置为 Failed、进度归零，错误信息对外可读。
//! 同一时刻只允许一条流水线在运行。

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, PipelineError};
use crate::models::{
    FeatureSet, Phase, PipelineStatus, ProductIdentity, ReviewRecord, WorkflowResult,
};
use crate::scraper::ReviewSource;
use crate::services::{
    parser, summarizer, FeatureExtractor, Inference, ReportWriter, RetryPolicy, ReviewAnalyst,
    ReviewCache, ReviewSummarizer,
};
use crate::workflow::{ParallelTaskRunner, TaskOutcome, TaskTag};

/// 流水线共享内部状态
struct PipelineInner {
    config: Config,
    status: Mutex<PipelineStatus>,
    cache: ReviewCache,
    inference: Arc<dyn Inference>,
    source: Arc<dyn ReviewSource>,
    retry: RetryPolicy,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PipelineInner {
    // 状态锁中毒时恢复内部值，状态字段都是整体赋值的
    fn lock_status(&self) -> MutexGuard<'_, PipelineStatus> {
        match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_progress(&self, phase: Phase, progress: u8) {
        let mut status = self.lock_status();
        status.phase = phase;
        status.progress = progress;
    }
}

/// 分析流水线编排器
pub struct Orchestrator {
    inner: Arc<PipelineInner>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        inference: Arc<dyn Inference>,
        source: Arc<dyn ReviewSource>,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                config,
                status: Mutex::new(PipelineStatus::default()),
                cache: ReviewCache::new(),
                inference,
                source,
                retry: RetryPolicy::new(),
                handle: Mutex::new(None),
            }),
        }
    }

    /// 替换重试策略（测试时注入不真实等待的延迟函数）
    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.retry = retry;
                inner
            }
            Err(shared) => PipelineInner {
                config: shared.config.clone(),
                status: Mutex::new(PipelineStatus::default()),
                cache: ReviewCache::new(),
                inference: shared.inference.clone(),
                source: shared.source.clone(),
                retry,
                handle: Mutex::new(None),
            },
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// 启动一次分析
    ///
    /// `selected_features` 非空时跳过特征提取，直接用调用方给出的特征；
    /// 已有流水线在运行时返回 [`PipelineError::AlreadyRunning`]
    pub fn start(
        &self,
        identity: ProductIdentity,
        selected_features: Option<Vec<String>>,
    ) -> AppResult<()> {
        {
            let mut status = self.inner.lock_status();
            if status.is_running() {
                return Err(AppError::Pipeline(PipelineError::AlreadyRunning));
            }
            status.reset();
            status.phase = Phase::Extracting;
            status.progress = 10;
            status.start_time = Some(Local::now());
        }

        info!("🚀 启动分析流水线: {}", identity.url());
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = run_workflow(&inner, identity, selected_features).await {
                error!("❌ 流水线失败: {}", e);
                let mut status = inner.lock_status();
                status.phase = Phase::Failed;
                status.progress = 0;
                status.error = Some(e.to_string());
            }
        });

        let mut slot = match self.inner.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(handle);
        Ok(())
    }

    /// 当前状态快照
    pub fn status(&self) -> PipelineStatus {
        self.inner.lock_status().clone()
    }

    /// 最近一次成功运行的结果
    pub fn result(&self) -> Option<WorkflowResult> {
        self.inner.lock_status().result.clone()
    }

    /// 等待后台流水线结束（没有运行中的流水线时立即返回）
    pub async fn wait(&self) {
        let handle = {
            let mut slot = match self.inner.handle.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// 流水线主体
async fn run_workflow(
    inner: &Arc<PipelineInner>,
    identity: ProductIdentity,
    selected_features: Option<Vec<String>>,
) -> AppResult<()> {
    let (features, reviews) = match selected_features {
        Some(selected) => acquire_with_selected(inner, &identity, selected).await?,
        None => acquire_parallel(inner, &identity).await?,
    };

    if reviews.is_empty() {
        return Err(AppError::Pipeline(PipelineError::NoReviews));
    }
    inner.set_progress(Phase::Scraping, 50);
    info!("📊 素材就绪: {} 个特征, {} 条评论", features.len(), reviews.len());

    // 分块摘要
    inner.set_progress(Phase::Summarizing, 70);
    let summarizer = ReviewSummarizer::new(
        inner.inference.clone(),
        inner.retry.clone(),
        inner.config.chunk_size,
    );
    let summaries = summarizer.summarize_chunked(&reviews).await?;
    let combined = summarizer::combine_summaries(&summaries);

    // 最终分析
    inner.set_progress(Phase::Analyzing, 80);
    let analyst = ReviewAnalyst::new(inner.inference.clone(), inner.retry.clone());
    let raw_analysis = analyst.analyze(&features, &combined).await?;

    // 解析并持久化
    inner.set_progress(Phase::Analyzing, 95);
    let outcome = parser::parse(&raw_analysis, &features);
    let writer = ReportWriter::new(&inner.config.output_dir);
    if outcome.used_fallback {
        // 原始输出留档，解析兜底不阻断流程
        if let Err(e) = writer.save_raw_output(&raw_analysis) {
            warn!("⚠️ 原始输出留档失败: {}", e);
        }
    }
    let output_file = writer.save_analysis(&outcome.records)?;

    let result = WorkflowResult {
        features,
        analysis: outcome.records,
        total_reviews: reviews.len(),
        output_file,
    };

    let mut status = inner.lock_status();
    status.phase = Phase::Done;
    status.progress = 100;
    status.result = Some(result);
    info!("🎉 分析流水线完成");
    Ok(())
}

/// 调用方已选定特征：跳过特征提取，评论优先走缓存
async fn acquire_with_selected(
    inner: &Arc<PipelineInner>,
    identity: &ProductIdentity,
    selected: Vec<String>,
) -> AppResult<(FeatureSet, Vec<ReviewRecord>)> {
    let features = FeatureSet::new(selected).capped(inner.config.max_features);
    {
        let mut status = inner.lock_status();
        status.features = Some(features.clone());
        status.phase = Phase::Scraping;
        status.progress = 40;
    }

    if let Some(entry) = inner.cache.get(identity) {
        info!("♻️ 复用缓存评论: {} 条", entry.reviews.len());
        mark_cached(inner, identity);
        return Ok((features, entry.reviews));
    }

    let reviews = acquire_reviews(inner, identity).await?;
    inner.cache.put(identity.clone(), reviews.clone());
    mark_cached(inner, identity);
    Ok((features, reviews))
}

/// 并行获取：特征提取和评论获取同时进行，按到达顺序消费
async fn acquire_parallel(
    inner: &Arc<PipelineInner>,
    identity: &ProductIdentity,
) -> AppResult<(FeatureSet, Vec<ReviewRecord>)> {
    inner.set_progress(Phase::Extracting, 20);

    let feature_task = {
        let inference = inner.inference.clone();
        let retry = inner.retry.clone();
        let max_features = inner.config.max_features;
        let identity = identity.clone();
        async move {
            FeatureExtractor::new(inference, retry, max_features)
                .extract(&identity)
                .await
        }
    };
    let review_task = {
        let inner = inner.clone();
        let identity = identity.clone();
        async move { acquire_reviews(&inner, &identity).await }
    };

    let mut runner = ParallelTaskRunner::launch(feature_task, review_task);
    let mut features: Option<FeatureSet> = None;
    let mut reviews: Option<Vec<ReviewRecord>> = None;

    while let Some(outcome) = runner.recv().await {
        match outcome {
            TaskOutcome::Features(set) => {
                // 特征先到先发布，评论还在爬取时外部已能读到
                let mut status = inner.lock_status();
                status.features = Some(set.clone());
                status.phase = Phase::Scraping;
                status.progress = status.progress.max(40);
                features = Some(set);
            }
            TaskOutcome::Reviews(list) => {
                inner.cache.put(identity.clone(), list.clone());
                mark_cached(inner, identity);
                reviews = Some(list);
            }
            TaskOutcome::Failed(TaskTag::FeatureExtraction, e) => {
                // 没有特征就没有分析对象，直接失败
                return Err(AppError::Pipeline(PipelineError::FeatureExtractionFailed {
                    source: Box::new(e),
                }));
            }
            TaskOutcome::Failed(TaskTag::ReviewAcquisition, e) => {
                // 有同一商品的缓存时降级使用，否则失败
                match inner.cache.get(identity) {
                    Some(entry) => {
                        warn!("⚠️ 评论获取失败，降级使用缓存评论: {}", e);
                        mark_cached(inner, identity);
                        reviews = Some(entry.reviews);
                    }
                    None => {
                        return Err(AppError::Pipeline(
                            PipelineError::ReviewAcquisitionFailed {
                                source: Box::new(e),
                            },
                        ));
                    }
                }
            }
        }
        if features.is_some() && reviews.is_some() {
            break;
        }
    }

    match (features, reviews) {
        (Some(features), Some(reviews)) => Ok((features, reviews)),
        // 通道提前关闭（worker panic）时走这里
        _ => Err(AppError::Other("并行任务未产出完整结果".to_string())),
    }
}

/// 重试包装的评论获取
async fn acquire_reviews(
    inner: &Arc<PipelineInner>,
    identity: &ProductIdentity,
) -> AppResult<Vec<ReviewRecord>> {
    let target = inner.config.target_reviews;
    inner
        .retry
        .run(|| inner.source.acquire(identity, target))
        .await
}

fn mark_cached(inner: &Arc<PipelineInner>, identity: &ProductIdentity) {
    let mut status = inner.lock_status();
    status.reviews_cached = true;
    status.cached_product_url = Some(identity.url().to_string());
}
