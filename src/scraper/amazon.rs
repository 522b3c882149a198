//! Amazon 评论源
//!
//! 通过已登录的调试端口浏览器翻页提取评论。
//! 选择器基于 data-hook 属性做尽力提取，页面结构变化时
//! 表现为 NoReviewsFound 而不是崩溃。

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ScrapeError};
use crate::models::{ProductIdentity, ReviewRecord};
use crate::scraper::{connection, ReviewSource};

/// 每轮翻页之间的等待时间
const PAGE_DELAY: Duration = Duration::from_millis(1200);
/// 最多翻页次数
const MAX_PAGES: usize = 7;

/// 页面内提取脚本返回的单条评论
#[derive(Debug, Deserialize)]
struct RawReview {
    rating: f32,
    title: String,
    text: String,
}

/// 基于 chromiumoxide 的 Amazon 评论源
pub struct AmazonReviewSource {
    debug_port: u16,
}

impl AmazonReviewSource {
    pub fn new(config: &Config) -> Self {
        Self {
            debug_port: config.browser_debug_port,
        }
    }

    /// 当前页面是否被重定向到验证码或登录页
    fn check_blocked(url: &str) -> AppResult<()> {
        let lower = url.to_lowercase();
        if lower.contains("captcha") || lower.contains("/errors/validatecaptcha") {
            return Err(AppError::Scrape(ScrapeError::Captcha));
        }
        if lower.contains("/ap/signin") || lower.contains("/ap/mfa") {
            return Err(AppError::Scrape(ScrapeError::LoginFailed));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewSource for AmazonReviewSource {
    async fn acquire(
        &self,
        identity: &ProductIdentity,
        target_reviews: usize,
    ) -> AppResult<Vec<ReviewRecord>> {
        info!(
            "📚 开始爬取评论: {} (目标 {} 条)",
            identity.url(),
            target_reviews
        );

        let (_browser, page) =
            connection::connect_to_browser_and_page(self.debug_port, identity.url()).await?;

        let mut records: Vec<ReviewRecord> = Vec::new();

        for page_index in 0..MAX_PAGES {
            sleep(PAGE_DELAY).await;

            if let Ok(Some(current_url)) = page.url().await {
                Self::check_blocked(&current_url)?;
            }

            let raw: Vec<RawReview> = page
                .evaluate(EXTRACT_REVIEWS_JS)
                .await?
                .into_value()
                .unwrap_or_default();

            info!(
                "📄 第 {} 页提取到 {} 条评论 (累计 {})",
                page_index + 1,
                raw.len(),
                records.len() + raw.len()
            );

            for item in raw {
                records.push(ReviewRecord {
                    product_name: identity.display_name().to_string(),
                    brand: String::new(),
                    rating: item.rating,
                    title: item.title,
                    text: item.text,
                });
            }

            if records.len() >= target_reviews {
                break;
            }

            let has_next: bool = page
                .evaluate(CLICK_NEXT_PAGE_JS)
                .await?
                .into_value()
                .unwrap_or(false);
            if !has_next {
                break;
            }
        }

        if records.is_empty() {
            warn!("⚠️ 页面上没有提取到任何评论");
            return Err(AppError::Scrape(ScrapeError::NoReviewsFound));
        }

        records.truncate(target_reviews);
        info!("✅ 评论爬取完成: 共 {} 条", records.len());
        Ok(records)
    }
}

/// 从当前页面提取评论的脚本
///
/// data-hook 属性比 class 名稳定，评分从 "4.0 out of 5 stars" 文本里解析
const EXTRACT_REVIEWS_JS: &str = r#"
(() => {
    const reviews = [];
    for (const node of document.querySelectorAll('[data-hook="review"]')) {
        const title = node.querySelector('[data-hook="review-title"]');
        const body = node.querySelector('[data-hook="review-body"]');
        const rating = node.querySelector('[data-hook="review-star-rating"], i.a-icon-star');
        const ratingText = rating ? rating.textContent : '';
        const parsed = parseFloat(ratingText);
        reviews.push({
            rating: isNaN(parsed) ? 0.0 : parsed,
            title: title ? title.textContent.trim() : '',
            text: body ? body.textContent.trim() : '',
        });
    }
    return reviews;
})()
"#;

/// 点击评论列表的下一页，返回是否还有下一页
const CLICK_NEXT_PAGE_JS: &str = r#"
(() => {
    const next = document.querySelector('ul.a-pagination li.a-last a');
    if (next) {
        next.click();
        return true;
    }
    return false;
})()
"#;
