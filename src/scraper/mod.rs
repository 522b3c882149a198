//! 评论爬取 - 基础设施层
//!
//! 持有浏览器这类稀缺资源，对上只暴露 [`ReviewSource`] 能力。
//! 编排器不关心评论从哪里来，测试时注入内存实现即可。

pub mod amazon;
pub mod connection;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{ProductIdentity, ReviewRecord};

/// 评论获取能力
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// 为指定商品获取至多 `target_reviews` 条评论
    async fn acquire(
        &self,
        identity: &ProductIdentity,
        target_reviews: usize,
    ) -> AppResult<Vec<ReviewRecord>>;
}

pub use amazon::AmazonReviewSource;
pub use connection::connect_to_browser_and_page;
