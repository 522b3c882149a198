//! 流程层（Workflow Layer）
//!
//! 定义"一次并行获取"的协作方式：
//! 特征提取和评论获取作为两个独立 worker 并发执行，
//! 结果通过带标签的通道汇聚到消费端

pub mod parallel;

pub use parallel::{ParallelTaskRunner, TaskOutcome, TaskTag};
