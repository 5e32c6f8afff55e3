//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - MockLlmClient：看最后一条 User 指令，Create/Recreate 返回固定题组，CheckQuantity 返回「合格」审查；
//!   题干生成会话返回固定题干
//! - ScriptedLlmClient：按顺序回放预设回复，并记录每次收到的会话，便于断言协商过程

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};
use crate::quiz::command::CHECK_QUANTITY;
use crate::quiz::extractor::fence_json;
use crate::quiz::titles::TITLE_ROLE_LINE;
use crate::quiz::{
    Evaluation, QuizBatch, QuizItem, ReviewDetails, ValidationIssue, ValidationReport,
};

/// 离线客户端：总是产出 count 道题，并总是判定合格
#[derive(Debug)]
pub struct MockLlmClient {
    count: usize,
}

impl MockLlmClient {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new(crate::quiz::DEFAULT_QUIZ_COUNT)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let titles_only = messages
            .first()
            .is_some_and(|m| m.content.starts_with(TITLE_ROLE_LINE));
        if titles_only {
            return Ok(sample_batch(self.count)
                .into_iter()
                .map(|q| q.question)
                .collect::<Vec<_>>()
                .join("\n"));
        }

        let batch = sample_batch(self.count);
        if last_user.ends_with(CHECK_QUANTITY) {
            Ok(format!(
                "Review from Mock:\n{}",
                fence_json(&adequate_report(&batch))
            ))
        } else {
            Ok(format!("Quizzes from Mock:\n{}", fence_json(&batch)))
        }
    }
}

/// 固定的示例题组（答案都在第 1 项）
pub fn sample_batch(count: usize) -> QuizBatch {
    (1..=count)
        .map(|n| QuizItem {
            question: format!("Mock question {}?", n),
            choices: (1..=4).map(|c| format!("Choice {}-{}", n, c)).collect(),
            answer: 1,
            explanation: Some(format!("Mock explanation {}", n)),
        })
        .collect()
}

/// 对给定题组逐题给出「合格」的审查报告
pub fn adequate_report(batch: &QuizBatch) -> ValidationReport {
    ValidationReport {
        issues: batch
            .iter()
            .map(|q| ValidationIssue {
                question: q.question.clone(),
                choices: q.choices.clone(),
                answer: q.answer,
                explanation: q.explanation.clone(),
                details: ReviewDetails {
                    topic_match: "ok".into(),
                    difficulty: "ok".into(),
                    duplication: "none".into(),
                    similar_questions: "none".into(),
                    naturalness: "ok".into(),
                    rule_compliance: "ok".into(),
                },
                evaluation: Evaluation::Adequate,
                rejection_reason: None,
            })
            .collect(),
        overall_evaluation: Evaluation::Adequate,
        invalid_indices: Default::default(),
    }
}

/// 回放客户端：依次返回预设回复；repeat_last 为真时用尽后一直重复最后一条，否则返回错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    repeat_last: bool,
    received: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// 已收到的请求次数
    pub fn calls(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 每次请求收到的完整会话
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(messages.to_vec());
        }

        let next = self
            .replies
            .lock()
            .map_err(|e| LlmError::Request(e.to_string()))?
            .pop_front();
        let mut last = self
            .last
            .lock()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                Ok(reply)
            }
            None if self.repeat_last => last.clone().ok_or(LlmError::EmptyResponse),
            None => Err(LlmError::Request("script exhausted".to_string())),
        }
    }
}
