//! 并行任务运行器 - 流程层
//!
//! 把特征提取和评论获取两个慢而易失败的操作放进独立的并发 worker，
//! 各自把带标签的结果投递到同一个有界通道：
//! - 每个 worker 至多投递一条消息
//! - 消费端按到达顺序（而非启动顺序）取结果
//! - worker 一旦启动就会跑到结束，没有取消机制（刻意的简化：
//!   特征提取失败不会中断还在进行的爬取）

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{FeatureSet, ReviewRecord};

/// worker 标签，用于在结果和错误中区分来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTag {
    FeatureExtraction,
    ReviewAcquisition,
}

impl fmt::Display for TaskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskTag::FeatureExtraction => write!(f, "特征提取"),
            TaskTag::ReviewAcquisition => write!(f, "评论获取"),
        }
    }
}

/// worker 投递的带标签结果
#[derive(Debug)]
pub enum TaskOutcome {
    /// 特征提取成功
    Features(FeatureSet),
    /// 评论获取成功
    Reviews(Vec<ReviewRecord>),
    /// 某个 worker 失败
    Failed(TaskTag, AppError),
}

/// 并行任务运行器
///
/// 持有通道消费端；两个生产者是已启动的 worker 任务
pub struct ParallelTaskRunner {
    rx: mpsc::Receiver<TaskOutcome>,
}

impl ParallelTaskRunner {
    /// 启动特征提取和评论获取两个 worker
    pub fn launch<FF, RF>(feature_task: FF, review_task: RF) -> Self
    where
        FF: Future<Output = AppResult<FeatureSet>> + Send + 'static,
        RF: Future<Output = AppResult<Vec<ReviewRecord>>> + Send + 'static,
    {
        // 容量 2：每个 worker 至多一条消息，发送永不阻塞
        let (tx, rx) = mpsc::channel(2);

        let feature_tx = tx.clone();
        tokio::spawn(async move {
            let outcome = match feature_task.await {
                Ok(features) => TaskOutcome::Features(features),
                Err(e) => TaskOutcome::Failed(TaskTag::FeatureExtraction, e),
            };
            debug!("特征提取 worker 结束");
            // 消费端提前退出时发送失败，忽略即可
            let _ = feature_tx.send(outcome).await;
        });

        tokio::spawn(async move {
            let outcome = match review_task.await {
                Ok(reviews) => TaskOutcome::Reviews(reviews),
                Err(e) => TaskOutcome::Failed(TaskTag::ReviewAcquisition, e),
            };
            debug!("评论获取 worker 结束");
            let _ = tx.send(outcome).await;
        });

        Self { rx }
    }

    /// 按到达顺序取下一条结果；两个 worker 都已投递后返回 None
    pub async fn recv(&mut self) -> Option<TaskOutcome> {
        self.rx.recv().await
    }

    /// 完全汇合：等两个 worker 都结束，按到达顺序返回全部结果
    pub async fn join_all(mut self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(2);
        while let Some(outcome) = self.rx.recv().await {
            outcomes.push(outcome);
            if outcomes.len() == 2 {
                break;
            }
        }
        outcomes
    }
}
