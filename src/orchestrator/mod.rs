//! 编排层（Orchestrator Layer）
//!
//! 唯一允许修改流水线状态的地方。对外暴露 start / status / result
//! 三个入口，内部把各业务能力按固定里程碑串成一条后台流水线

pub mod pipeline;

pub use pipeline::Orchestrator;
