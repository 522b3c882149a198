use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 参数校验错误（如商品 URL 为空），不会被重试
    Validation(String),
    /// 评论爬取错误
    Scrape(ScrapeError),
    /// 推理服务错误
    Inference(InferenceError),
    /// 文件操作错误
    File(FileError),
    /// 流水线错误
    Pipeline(PipelineError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "参数校验失败: {}", msg),
            AppError::Scrape(e) => write!(f, "爬取错误: {}", e),
            AppError::Inference(e) => write!(f, "推理错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Pipeline(e) => write!(f, "流水线错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Scrape(e) => Some(e),
            AppError::Inference(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Pipeline(e) => Some(e),
            AppError::Validation(_) | AppError::Other(_) => None,
        }
    }
}

/// 评论爬取错误
///
/// 对应外部评论源可能出现的各种失败情况
#[derive(Debug)]
pub enum ScrapeError {
    /// 登录失败（需要人工介入，不自动重试）
    LoginFailed,
    /// 遇到验证码（需要人工介入，不自动重试）
    Captcha,
    /// 页面导航超时
    NavigationTimeout { url: String },
    /// 未找到任何评论
    NoReviewsFound,
    /// 浏览器底层错误
    Browser {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::LoginFailed => {
                write!(f, "登录失败，请在浏览器中手动完成登录后重试")
            }
            ScrapeError::Captcha => {
                write!(f, "遇到验证码，请在浏览器中手动完成验证后重试")
            }
            ScrapeError::NavigationTimeout { url } => {
                write!(f, "导航到 {} 超时", url)
            }
            ScrapeError::NoReviewsFound => write!(f, "未找到任何评论，请检查商品 URL"),
            ScrapeError::Browser { source } => write!(f, "浏览器错误: {}", source),
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScrapeError::Browser { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 推理服务错误
#[derive(Debug)]
pub enum InferenceError {
    /// 请求被限流（按指数退避重试）
    RateLimited { retry_after: Option<u64> },
    /// 请求超时
    Timeout,
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    EmptyContent { model: String },
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::RateLimited { retry_after } => {
                write!(f, "请求被限流, 建议等待: {:?}秒", retry_after)
            }
            InferenceError::Timeout => write!(f, "推理请求超时"),
            InferenceError::ApiCallFailed { model, source } => {
                write!(f, "推理 API 调用失败 (模型: {}): {}", model, source)
            }
            InferenceError::EmptyContent { model } => {
                write!(f, "推理返回内容为空 (模型: {})", model)
            }
        }
    }
}

impl std::error::Error for InferenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InferenceError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 创建目录失败
    CreateDirFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化失败
    SerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::CreateDirFailed { path, source } => {
                write!(f, "创建目录失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::SerializeFailed { source } => write!(f, "序列化失败: {}", source),
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::CreateDirFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::ReadFailed { source, .. }
            | FileError::SerializeFailed { source }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 流水线错误
#[derive(Debug)]
pub enum PipelineError {
    /// 已有分析流程在运行
    AlreadyRunning,
    /// 重试次数耗尽，携带最后一次的错误
    RetryExhausted {
        attempts: usize,
        source: Box<AppError>,
    },
    /// 特征提取失败（无特征则无法分析，致命）
    FeatureExtractionFailed { source: Box<AppError> },
    /// 评论获取失败且无可用缓存（致命）
    ReviewAcquisitionFailed { source: Box<AppError> },
    /// 没有可分析的评论
    NoReviews,
    /// 解析结果不是列表结构
    NotListShaped,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::AlreadyRunning => write!(f, "已有分析流程在运行"),
            PipelineError::RetryExhausted { attempts, source } => {
                write!(f, "重试 {} 次后仍然失败: {}", attempts, source)
            }
            PipelineError::FeatureExtractionFailed { source } => {
                write!(f, "特征提取失败: {}", source)
            }
            PipelineError::ReviewAcquisitionFailed { source } => {
                write!(f, "评论获取失败且无可用缓存: {}", source)
            }
            PipelineError::NoReviews => write!(f, "没有可分析的评论"),
            PipelineError::NotListShaped => write!(f, "解析结果不是列表结构"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::RetryExhausted { source, .. }
            | PipelineError::FeatureExtractionFailed { source }
            | PipelineError::ReviewAcquisitionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 重试分类
///
/// RetryPolicy 根据该分类决定退避策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// 被限流，指数退避重试
    RateLimited,
    /// 瞬时错误，短暂固定间隔重试
    Transient,
    /// 致命错误，立即传播，从不重试
    Fatal,
}

impl AppError {
    /// 错误的重试分类
    pub fn retry_class(&self) -> RetryClass {
        match self {
            AppError::Inference(InferenceError::RateLimited { .. }) => RetryClass::RateLimited,
            AppError::Inference(InferenceError::Timeout) => RetryClass::Transient,
            AppError::Scrape(ScrapeError::LoginFailed) | AppError::Scrape(ScrapeError::Captcha) => {
                RetryClass::Fatal
            }
            AppError::Validation(_) | AppError::Pipeline(_) => RetryClass::Fatal,
            _ => RetryClass::Transient,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Scrape(ScrapeError::Browser {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// 创建限流错误
    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        AppError::Inference(InferenceError::RateLimited { retry_after })
    }

    /// 创建推理 API 调用错误
    pub fn inference_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Inference(InferenceError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
