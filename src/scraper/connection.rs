//! 浏览器连接
//!
//! 复用用户已打开的调试端口浏览器，登录态和人机验证都由人工在
//! 浏览器里处理，程序只做导航和提取

use std::time::Duration;

use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, ScrapeError};

/// 单次导航的超时时间
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// 连接到调试端口上的浏览器并导航到目标页面
pub async fn connect_to_browser_and_page(port: u16, target_url: &str) -> AppResult<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::Scrape(ScrapeError::Browser {
            source: Box::new(e),
        })
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        AppError::Scrape(ScrapeError::Browser {
            source: Box::new(e),
        })
    })?;

    navigate(&page, target_url).await?;

    Ok((browser, page))
}

/// 带超时的页面导航
pub async fn navigate(page: &Page, url: &str) -> AppResult<()> {
    debug!("正在导航到: {}", url);
    let result = timeout(NAVIGATION_TIMEOUT, page.goto(url)).await;
    match result {
        Ok(Ok(_)) => {
            info!("已导航到: {}", url);
            Ok(())
        }
        Ok(Err(e)) => {
            error!("导航到 {} 失败: {}", url, e);
            Err(AppError::Scrape(ScrapeError::Browser {
                source: Box::new(e),
            }))
        }
        Err(_) => Err(AppError::Scrape(ScrapeError::NavigationTimeout {
            url: url.to_string(),
        })),
    }
}
