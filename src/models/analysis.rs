//! 分析结果数据模型
//!
//! LLM 返回的松散 JSON 在解析边界处绑定到这里的强类型结构，
//! 业务逻辑中不允许出现未类型化的 Map

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// 待分析的特征列表
///
/// 顺序从提取/选择一直保留到最终结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet(Vec<String>);

impl FeatureSet {
    pub fn new(features: Vec<String>) -> Self {
        Self(features)
    }

    /// 截断到最多 `max` 个特征（避免触发限流），保留原始顺序
    pub fn capped(mut self, max: usize) -> Self {
        self.0.truncate(max);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// 以 ", " 连接，用于构建提示词
    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }
}

impl From<Vec<String>> for FeatureSet {
    fn from(features: Vec<String>) -> Self {
        Self(features)
    }
}

/// 情感倾向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    #[default]
    Unknown,
}

impl Sentiment {
    /// 宽松解析：大小写不敏感，无法识别的标签归为 Unknown
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            "mixed" => Sentiment::Mixed,
            _ => Sentiment::Unknown,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Negative => write!(f, "Negative"),
            Sentiment::Mixed => write!(f, "Mixed"),
            Sentiment::Unknown => write!(f, "Unknown"),
        }
    }
}

// LLM 输出的情感标签形态不稳定，在反序列化边界做宽松归一
impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Sentiment::from_label(&label))
    }
}

/// 单个特征的分析结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// 特征名称
    pub feature: String,
    /// 情感倾向
    #[serde(default)]
    pub sentiment: Sentiment,
    /// 一句话结论
    #[serde(default)]
    pub verdict: String,
    /// 要点列表
    #[serde(default, alias = "keyPoints")]
    pub key_points: Vec<String>,
}

/// 完整分析结果：理想情况下每个请求特征一条记录，按请求顺序排列
pub type AnalysisResult = Vec<AnalysisRecord>;

/// 一次工作流运行的最终产出
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// 本次分析使用的特征
    pub features: FeatureSet,
    /// 按特征的分析结论
    pub analysis: AnalysisResult,
    /// 参与分析的评论总数
    pub total_reviews: usize,
    /// 结果文件路径
    pub output_file: String,
}
