//! 出题数据模型：题目、题组、审查报告
//!
//! 同一份类型定义既用于 serde 解析 LLM 回复，也用于 schemars 生成注入 prompt 的 JSON Schema。

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 每道题固定的选项数
pub const CHOICE_COUNT: usize = 4;

/// 单道选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuizItem {
    /// 题干，尽量不超过 30 字
    #[schemars(length(max = 60))]
    pub question: String,
    /// 四个选项
    #[schemars(length(equal = 4))]
    pub choices: Vec<String>,
    /// 正确选项的序号（从 1 开始）
    #[schemars(range(min = 1, max = 4))]
    pub answer: u32,
    /// 解析
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizItem {
    /// 校验选项数与答案序号范围
    pub fn validate(&self) -> Result<(), String> {
        if self.choices.len() != CHOICE_COUNT {
            return Err(format!(
                "expected {} choices, got {}",
                CHOICE_COUNT,
                self.choices.len()
            ));
        }
        if self.answer < 1 || self.answer as usize > self.choices.len() {
            return Err(format!(
                "answer {} out of range 1..={}",
                self.answer,
                self.choices.len()
            ));
        }
        Ok(())
    }

    /// 去掉题干、选项、解析两端的空白
    pub fn trimmed(self) -> Self {
        Self {
            question: self.question.trim().to_string(),
            choices: self.choices.iter().map(|c| c.trim().to_string()).collect(),
            answer: self.answer,
            explanation: self.explanation.map(|e| e.trim().to_string()),
        }
    }

    pub fn correct_choice(&self) -> Option<&str> {
        self.choices
            .get((self.answer as usize).checked_sub(1)?)
            .map(String::as_str)
    }
}

/// 一次协商产出的一组题目（保持顺序）
pub type QuizBatch = Vec<QuizItem>;

/// 审查结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Evaluation {
    Adequate,
    Inadequate,
}

/// 单题审查维度，每项为简短文字评语
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewDetails {
    /// 是否符合主题
    pub topic_match: String,
    /// 难度是否适合目标人群
    pub difficulty: String,
    /// 与已用题目是否重复
    pub duplication: String,
    /// 相似题目
    pub similar_questions: String,
    /// 表述是否自然
    pub naturalness: String,
    /// 是否遵守出题规则
    pub rule_compliance: String,
}

/// 单题审查记录：回显题目并附带评语与结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub question: String,
    pub choices: Vec<String>,
    pub answer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub details: ReviewDetails,
    pub evaluation: Evaluation,
    /// 不合格时的综合理由
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// 审查报告：仅在 CheckQuantity 指令后由 LLM 产出，用后即弃
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub overall_evaluation: Evaluation,
    /// 不合格题目的序号（从 1 开始）
    pub invalid_indices: BTreeSet<u32>,
}

impl ValidationReport {
    pub fn is_adequate(&self) -> bool {
        self.overall_evaluation == Evaluation::Adequate
    }
}
