//! 出题入口：构建会话 -> 协商 -> 打乱答案位置

use std::sync::Arc;

use uuid::Uuid;

use crate::core::QuizError;
use crate::llm::LlmClient;
use crate::memory::{NoopTranscriptStore, TranscriptStore};
use crate::quiz::randomizer::randomize_answers;
use crate::quiz::{
    ConversationBuilder, NegotiationBudgets, NegotiationOutcome, Negotiator, QuizRequest,
    SchemaDescriptions,
};

/// 生成会话 ID：`<毫秒时间戳>_<uuid>`
pub fn new_session_id() -> String {
    format!("{}_{}", chrono::Utc::now().timestamp_millis(), Uuid::new_v4())
}

pub struct QuizGenerator {
    llm: Arc<dyn LlmClient>,
    builder: ConversationBuilder,
    store: Arc<dyn TranscriptStore>,
}

impl QuizGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            builder: ConversationBuilder::new(SchemaDescriptions::generate()),
            store: Arc::new(NoopTranscriptStore),
        }
    }

    pub fn with_builder(mut self, builder: ConversationBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.store = store;
        self
    }

    /// 完整出题流程；成功时题组已做答案位置去重
    pub async fn negotiate(
        &self,
        request: &QuizRequest,
        budgets: NegotiationBudgets,
    ) -> Result<NegotiationOutcome, QuizError> {
        let session = self.builder.build(request)?;
        let session_id = new_session_id();
        tracing::info!(
            session_id = %session_id,
            target = %request.target,
            topic = request.topic.as_deref().unwrap_or("-"),
            count = request.count,
            "Generating quizzes"
        );

        let report = Negotiator::new(self.llm.clone(), budgets)
            .with_transcript_store(self.store.clone())
            .run(&session_id, session)
            .await?;

        Ok(match report.outcome {
            NegotiationOutcome::Success { quizzes } => NegotiationOutcome::Success {
                quizzes: randomize_answers(quizzes),
            },
            failure => failure,
        })
    }
}
