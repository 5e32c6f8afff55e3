//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;
use crate::core::QuizError;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

/// DeepSeek 提供与 OpenAI 完全兼容的接口
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";

/// 根据 [llm] 配置创建客户端
///
/// - openai：`OPENAI_API_KEY`，可选 base_url（自建代理等）
/// - deepseek：优先 `DEEPSEEK_API_KEY`，其次 `OPENAI_API_KEY`；base_url 未设置时用官方地址
/// - mock：离线客户端，`quiz_count` 决定每次产出的题数
pub fn create_client(
    config: &LlmSection,
    quiz_count: usize,
) -> Result<Arc<dyn LlmClient>, QuizError> {
    match config.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(
            OpenAiClient::new(config.base_url.as_deref(), &config.model, None)
                .with_temperature(config.temperature)
                .with_request_timeout(config.timeouts.request),
        )),
        "deepseek" => {
            let api_key = std::env::var("DEEPSEEK_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
            let model = if config.model.starts_with("deepseek") {
                config.model.as_str()
            } else {
                DEEPSEEK_CHAT
            };
            Ok(Arc::new(
                OpenAiClient::new(
                    Some(config.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL)),
                    model,
                    api_key.as_deref(),
                )
                .with_temperature(config.temperature)
                .with_request_timeout(config.timeouts.request),
            ))
        }
        "mock" => Ok(Arc::new(MockLlmClient::new(quiz_count))),
        other => Err(QuizError::Config(format!("unknown llm provider: {other}"))),
    }
}

/// 程序结束前输出累计 token 用量
pub fn report_token_usage(client: &dyn LlmClient) -> (u64, u64, u64) {
    let (prompt, completion, total) = client.token_usage();
    tracing::info!(prompt, completion, total, "Token usage");
    (prompt, completion, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider() {
        let config = LlmSection {
            provider: "nope".into(),
            ..LlmSection::default()
        };
        assert!(matches!(
            create_client(&config, 3),
            Err(QuizError::Config(_))
        ));
    }

    #[test]
    fn test_mock_provider() {
        let config = LlmSection {
            provider: "Mock".into(),
            ..LlmSection::default()
        };
        let client = create_client(&config, 3).unwrap();
        assert_eq!(report_token_usage(client.as_ref()), (0, 0, 0));
    }
}
