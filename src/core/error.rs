//! 出题流程的错误类型
//!
//! - ExtractionError：回复解析失败，协商内部通过 Recreate 恢复并计入 error_count
//! - QuizError：需要中止当前协商的错误（传输、内部状态、配置、IO）
//!
//! 预算耗尽不是错误，而是 NegotiationOutcome::Failure。

use thiserror::Error;

use crate::llm::LlmError;

/// 从 LLM 回复中提取结构化数据失败
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// 回复中没有 ```json 代码块；保留原始回复
    #[error("No ```json block in response")]
    NoStructuredBlock { raw: String },

    /// 代码块内不是合法 JSON；保留捕获到的文本
    #[error("Malformed JSON: {source}")]
    MalformedJson {
        captured: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON 结构不符合目标 schema；保留解析出的值
    #[error("Schema violation: {reason}")]
    SchemaViolation {
        value: serde_json::Value,
        reason: String,
    },
}

/// 中止协商的错误
#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Transport error: {0}")]
    Transport(#[from] LlmError),

    /// last_command 不在定义集合内，说明状态机有逻辑缺陷
    #[error("Internal state error: {0}")]
    InternalState(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
