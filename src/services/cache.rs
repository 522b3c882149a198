//! 评论缓存 - 业务能力层
//!
//! 单槽缓存：只保留最近一次获取的评论集，以商品标识为键。
//! 换商品即整体替换（last-write-wins），同一商品内没有 TTL 或过期检查。

use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use tracing::{debug, info};

use crate::models::{ProductIdentity, ReviewCacheEntry, ReviewRecord};

/// 单槽评论缓存
pub struct ReviewCache {
    slot: Mutex<Option<ReviewCacheEntry>>,
}

impl ReviewCache {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// 查询缓存，仅在商品标识一致时命中
    pub fn get(&self, identity: &ProductIdentity) -> Option<ReviewCacheEntry> {
        let slot = self.lock_slot();
        match slot.as_ref() {
            Some(entry) if entry.identity == *identity => {
                debug!("缓存命中: {} ({} 条评论)", identity.url(), entry.reviews.len());
                Some(entry.clone())
            }
            _ => None,
        }
    }

    /// 写入缓存，不同商品的旧条目被整体丢弃
    pub fn put(&self, identity: ProductIdentity, reviews: Vec<ReviewRecord>) {
        let mut slot = self.lock_slot();
        if let Some(old) = slot.as_ref() {
            if old.identity != identity {
                info!("🔄 换商品，丢弃旧缓存: {}", old.identity.url());
            }
        }
        *slot = Some(ReviewCacheEntry {
            identity,
            reviews,
            fetched_at: Local::now(),
        });
    }

    /// 是否存在指定商品的有效缓存
    pub fn contains(&self, identity: &ProductIdentity) -> bool {
        self.lock_slot()
            .as_ref()
            .map(|entry| entry.identity == *identity)
            .unwrap_or(false)
    }

    // 锁中毒时恢复内部值，缓存内容始终是完整写入的
    fn lock_slot(&self) -> MutexGuard<'_, Option<ReviewCacheEntry>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ReviewCache {
    fn default() -> Self {
        Self::new()
    }
}
