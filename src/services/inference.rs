//! 推理服务 - 业务能力层
//!
//! 只负责"把提示词发给 LLM 拿回文本"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, InferenceError};

/// 推理能力
///
/// 编排器、特征提取、摘要、分析统一通过该 trait 调用 LLM，
/// 测试时注入 mock 实现即可脱离网络运行
#[async_trait]
pub trait Inference: Send + Sync {
    /// 发送提示词并返回完整文本响应
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

/// 基于 async-openai 的推理实现
pub struct OpenAiInference {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiInference {
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 把 async-openai 的错误归类到本地错误分类
    ///
    /// 限流和超时是可重试的瞬时错误，其余按 API 调用失败处理
    fn classify_error(&self, err: async_openai::error::OpenAIError) -> AppError {
        let text = err.to_string().to_lowercase();
        if text.contains("429") || text.contains("rate limit") || text.contains("rate_limit") {
            return AppError::rate_limited(None);
        }
        if text.contains("timeout") || text.contains("timed out") {
            return AppError::Inference(InferenceError::Timeout);
        }
        AppError::inference_failed(&self.model_name, err)
    }
}

#[async_trait]
impl Inference for OpenAiInference {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.len());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::inference_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.3)
            .max_tokens(2048u32)
            .build()
            .map_err(|e| AppError::inference_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            self.classify_error(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Inference(InferenceError::EmptyContent {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }
}
