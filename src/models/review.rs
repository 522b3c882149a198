//! 评论数据模型

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::ProductIdentity;

/// 单条用户评论
///
/// 创建后不可变，原样从爬取层流转到摘要层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// 商品名称
    pub product_name: String,
    /// 品牌
    pub brand: String,
    /// 评分（1.0 - 5.0）
    pub rating: f32,
    /// 评论标题
    pub title: String,
    /// 评论正文
    pub text: String,
}

/// 评论缓存条目
///
/// 同一时刻最多存在一条，换商品即整体失效
#[derive(Debug, Clone)]
pub struct ReviewCacheEntry {
    /// 评论所属的商品标识
    pub identity: ProductIdentity,
    /// 缓存的评论
    pub reviews: Vec<ReviewRecord>,
    /// 抓取时间
    pub fetched_at: DateTime<Local>,
}
