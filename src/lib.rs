//! Revify - 商品评论分析流水线
//!
//! 给定一个商品页面 URL，自动完成特征提取、评论爬取、分块摘要、
//! 逐特征情感分析，并把结构化结果写入输出目录。
//!
//! # 架构
//!
//! 采用四层架构，依赖方向自上而下：
//!
//! - **编排层** ([`orchestrator`]): 流水线入口，独占修改共享状态
//! - **流程层** ([`workflow`]): 并行任务的协作方式
//! - **业务能力层** ([`services`]): 特征提取、摘要、分析、解析、缓存、重试、写入
//! - **基础设施层** ([`scraper`] / [`config`] / [`logger`]): 浏览器、LLM、配置、日志
//!
//! 推理和评论来源都是 trait，测试时注入内存实现即可跑通整条流水线

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod scraper;
pub mod services;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::Orchestrator;
