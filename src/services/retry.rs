//! 重试策略 - 业务能力层
//!
//! 把对外部服务（推理、爬取）的易失败调用包装成有界重试：
//! - 限流错误：指数退避，delay = min(max_delay, base * 2^attempt)，次数封顶
//! - 瞬时错误：短暂固定间隔，少量重试后传播
//! - 致命错误：立即传播，从不重试
//!
//! 延迟函数可注入，测试可以在不真实等待的情况下验证退避计划

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, PipelineError, RetryClass};

/// 可注入的异步延迟函数
pub type DelayFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// 重试策略
#[derive(Clone)]
pub struct RetryPolicy {
    /// 限流错误的最大尝试次数（含首次调用）
    max_attempts: usize,
    /// 瞬时错误的最大重试次数（不含首次调用）
    max_transient_retries: usize,
    /// 指数退避的基础延迟
    base_delay: Duration,
    /// 指数退避的延迟上限
    max_delay: Duration,
    /// 瞬时错误的固定延迟
    fixed_delay: Duration,
    delay_fn: DelayFn,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            max_transient_retries: 2,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            fixed_delay: Duration::from_secs(1),
            delay_fn: tokio_delay(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_transient_retries(mut self, retries: usize) -> Self {
        self.max_transient_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_fixed_delay(mut self, delay: Duration) -> Self {
        self.fixed_delay = delay;
        self
    }

    /// 注入自定义延迟函数（测试用）
    pub fn with_delay_fn(mut self, delay_fn: DelayFn) -> Self {
        self.delay_fn = delay_fn;
        self
    }

    /// 执行操作，按错误分类重试
    ///
    /// 次数耗尽时，最后一次的错误会被包装进
    /// [`PipelineError::RetryExhausted`]，并附带总尝试次数
    pub async fn run<T, F, Fut>(&self, op: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut rate_limited_failures = 0usize;
        let mut transient_failures = 0usize;
        let mut total_attempts = 0usize;

        loop {
            total_attempts += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match err.retry_class() {
                RetryClass::Fatal => {
                    debug!("致命错误，不重试: {}", err);
                    return Err(err);
                }
                RetryClass::RateLimited => {
                    rate_limited_failures += 1;
                    if rate_limited_failures >= self.max_attempts {
                        return Err(self.exhausted(total_attempts, err));
                    }
                    let delay = self.backoff_delay(rate_limited_failures - 1);
                    warn!(
                        "⚠️ 第 {} 次被限流，{:?} 后重试: {}",
                        rate_limited_failures, delay, err
                    );
                    (self.delay_fn)(delay).await;
                }
                RetryClass::Transient => {
                    transient_failures += 1;
                    if transient_failures > self.max_transient_retries {
                        return Err(self.exhausted(total_attempts, err));
                    }
                    warn!(
                        "⚠️ 第 {} 次瞬时失败，{:?} 后重试: {}",
                        transient_failures, self.fixed_delay, err
                    );
                    (self.delay_fn)(self.fixed_delay).await;
                }
            }
        }
    }

    /// 指数退避延迟：min(max_delay, base * 2^attempt)
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn exhausted(&self, attempts: usize, last: AppError) -> AppError {
        AppError::Pipeline(PipelineError::RetryExhausted {
            attempts,
            source: Box::new(last),
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn tokio_delay() -> DelayFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}
