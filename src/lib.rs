//! QuizBee - 与 LLM 多轮协商生成选择题
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 会话消息与会话记录持久化
//! - **observability**: 日志初始化
//! - **quiz**: 出题协商（会话构建、回复解析、状态机、答案随机化、结果存取）

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod quiz;

pub use quiz::{NegotiationBudgets, NegotiationOutcome, QuizGenerator, QuizRequest};
