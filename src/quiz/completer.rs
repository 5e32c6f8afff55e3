//! 题目补全：给定题干，一次调用补齐选项、答案与解析

use std::sync::Arc;

use crate::core::QuizError;
use crate::llm::LlmClient;
use crate::memory::{Message, NoopTranscriptStore, Session, TranscriptStore};
use crate::quiz::{FencedJsonExtractor, QuizBatch, ResponseExtractor, SchemaDescriptions};

pub struct QuizCompleter {
    llm: Arc<dyn LlmClient>,
    extractor: Arc<dyn ResponseExtractor>,
    store: Arc<dyn TranscriptStore>,
    schemas: SchemaDescriptions,
}

impl QuizCompleter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            extractor: Arc::new(FencedJsonExtractor),
            store: Arc::new(NoopTranscriptStore),
            schemas: SchemaDescriptions::generate(),
        }
    }

    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.store = store;
        self
    }

    fn session(&self, questions: &[String]) -> Session {
        vec![
            Message::system(
                [
                    "```json",
                    self.schemas.quiz_batch.as_str(),
                    "```",
                    "",
                    "- 收到题干后，按上述格式为每道题生成合适的选项、正确答案序号与解析。必须以数组形式输出，尽量减少空白。",
                    "- 题目数组必须用 ```json 代码块包裹。",
                    "- 题目长度按 schema 中的描述限制。",
                ]
                .join("\n"),
            ),
            Message::user(
                questions
                    .iter()
                    .map(|q| format!("- {}", q))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        ]
    }

    /// 单轮补全；解析失败直接返回错误（不重试）
    pub async fn complete(
        &self,
        session_id: &str,
        questions: &[String],
    ) -> Result<QuizBatch, QuizError> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let mut session = self.session(questions);
        let reply = self.llm.complete(&session).await?;
        session.push(Message::assistant(reply.clone()));
        if let Err(e) = self.store.persist(session_id, &session) {
            tracing::warn!(session_id, error = %e, "Failed to persist transcript");
        }

        let batch = self.extractor.extract_batch(&reply)?;
        tracing::info!(session_id, items = batch.len(), "Quizzes completed");
        Ok(batch)
    }
}
