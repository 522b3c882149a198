//! 商品标识
//!
//! 整条流水线和评论缓存都以规范化后的商品 URL 作为唯一键

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// 商品标识
///
/// 规范化后的 URL 是缓存命中和流水线调用的唯一键，
/// 显示名称只用于日志和提示词，不参与相等性比较。
#[derive(Debug, Clone, Serialize)]
pub struct ProductIdentity {
    url: String,
    name: Option<String>,
}

impl ProductIdentity {
    /// 创建商品标识（URL 为空时返回校验错误）
    pub fn new(url: impl Into<String>, name: Option<String>) -> AppResult<Self> {
        let normalized = normalize_url(&url.into());
        if normalized.is_empty() {
            return Err(AppError::validation("商品 URL 不能为空"));
        }
        Ok(Self {
            url: normalized,
            name: name.filter(|n| !n.trim().is_empty()),
        })
    }

    /// 规范化后的商品 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 可选的显示名称
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 用于日志和提示词的显示名称
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Product")
    }
}

impl PartialEq for ProductIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for ProductIdentity {}

/// URL 规范化：去除首尾空白、锚点和末尾斜杠
fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = match trimmed.find('#') {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    };
    without_fragment.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_fragment_and_trailing_slash() {
        let a = ProductIdentity::new("https://www.amazon.in/dp/B01N54ZM9W/#reviews", None).unwrap();
        let b = ProductIdentity::new("  https://www.amazon.in/dp/B01N54ZM9W ", None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.url(), "https://www.amazon.in/dp/B01N54ZM9W");
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let result = ProductIdentity::new("   ", Some("Shoes".to_string()));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_name_does_not_affect_equality() {
        let a = ProductIdentity::new("https://a.example/p", Some("甲".to_string())).unwrap();
        let b = ProductIdentity::new("https://a.example/p", Some("乙".to_string())).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.display_name(), "甲");
    }

    #[test]
    fn test_blank_name_falls_back_to_default() {
        let a = ProductIdentity::new("https://a.example/p", Some("  ".to_string())).unwrap();
        assert_eq!(a.display_name(), "Product");
    }
}
