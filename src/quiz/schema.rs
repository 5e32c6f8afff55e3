//! 题组与审查报告的 JSON Schema（schemars 自动生成）
//!
//! 拼入 system prompt，告诉 LLM 两种输出的确切结构，减少格式错误。

use schemars::schema_for;

use crate::quiz::{QuizBatch, ValidationReport};

/// 两种提取目标的 schema 描述（已序列化的 JSON 文本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptions {
    pub quiz_batch: String,
    pub validation_report: String,
}

impl SchemaDescriptions {
    /// 由 Rust 类型生成；紧凑输出以节省 token
    pub fn generate() -> Self {
        Self {
            quiz_batch: serde_json::to_string(&schema_for!(QuizBatch)).unwrap_or_default(),
            validation_report: serde_json::to_string(&schema_for!(ValidationReport))
                .unwrap_or_default(),
        }
    }
}

impl Default for SchemaDescriptions {
    fn default() -> Self {
        Self::generate()
    }
}
