//! 出题协商状态机
//!
//! Create -> (LLM 回复题组) -> CheckQuantity -> (LLM 回复审查) -> 合格则再审或接受，不合格则 Recreate。
//! 需要连续 min_correction_count 次「合格」才接受；任何一次不合格都会清零进度并整组重出。
//! 严格串行：每轮等 LLM 回复处理完才发下一轮；唯一的 await 点是 LLM 调用。

use std::sync::Arc;

use crate::core::QuizError;
use crate::llm::LlmClient;
use crate::memory::{Message, NoopTranscriptStore, Session, TranscriptStore};
use crate::quiz::{Command, FencedJsonExtractor, QuizBatch, ResponseExtractor};

pub const REASON_UNKNOWN: &str = "unknown generation failure";
pub const REASON_ERROR_BUDGET: &str = "exceeded error budget";
pub const REASON_RETRY_BUDGET: &str = "exceeded retry budget";

/// 协商预算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationBudgets {
    /// Recreate 次数上限
    pub max_retry_count: u32,
    /// 解析失败次数上限
    pub max_error_count: u32,
    /// 接受前需要的连续合格审查次数
    pub min_correction_count: u32,
}

impl Default for NegotiationBudgets {
    fn default() -> Self {
        Self {
            max_retry_count: 10,
            max_error_count: 3,
            min_correction_count: 3,
        }
    }
}

impl NegotiationBudgets {
    /// 最坏情况下的 LLM 调用次数
    pub fn max_turns(&self) -> u32 {
        self.max_retry_count + self.min_correction_count * (self.max_retry_count + 1)
    }
}

/// 单次协商的可变状态；不在协商之间共享
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationState {
    pub retry_count: u32,
    pub correction_count: u32,
    pub error_count: u32,
    pub last_command: Option<Command>,
    /// 最近一次成功提取的题组；每次 Recreate 都会清空
    pub current_batch: Option<QuizBatch>,
}

/// 协商结果：预算耗尽属于正常结局，不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    Success { quizzes: QuizBatch },
    Failure { reason: String },
}

impl NegotiationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NegotiationOutcome::Success { .. })
    }
}

/// 协商报告：结果 + 最终状态 + 完整会话
#[derive(Debug, Clone)]
pub struct NegotiationReport {
    pub outcome: NegotiationOutcome,
    pub state: NegotiationState,
    pub session: Session,
}

/// 协商器：持有 LLM、回复解析器、会话记录存储与预算
pub struct Negotiator {
    llm: Arc<dyn LlmClient>,
    extractor: Arc<dyn ResponseExtractor>,
    store: Arc<dyn TranscriptStore>,
    budgets: NegotiationBudgets,
}

impl Negotiator {
    pub fn new(llm: Arc<dyn LlmClient>, budgets: NegotiationBudgets) -> Self {
        Self {
            llm,
            extractor: Arc::new(FencedJsonExtractor),
            store: Arc::new(NoopTranscriptStore),
            budgets,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ResponseExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.store = store;
        self
    }

    /// 驱动一次完整协商。传输错误与内部状态错误直接返回 Err，其余结局都在 outcome 中
    pub async fn run(
        &self,
        session_id: &str,
        session: Session,
    ) -> Result<NegotiationReport, QuizError> {
        let mut session = session;
        let mut state = NegotiationState::default();

        tracing::info!(session_id, budgets = ?self.budgets, "Negotiation started");
        self.send_command(session_id, &mut session, &mut state, Command::Create);

        while state.error_count < self.budgets.max_error_count
            && state.retry_count < self.budgets.max_retry_count
        {
            let reply = self.llm.complete(&session).await?;
            tracing::debug!(session_id, reply = %reply, "LLM reply");
            self.append(session_id, &mut session, Message::assistant(reply.clone()));

            match state.last_command {
                Some(Command::Create) | Some(Command::Recreate) => {
                    match self.extractor.extract_batch(&reply) {
                        Ok(batch) => {
                            tracing::info!(session_id, items = batch.len(), "Quiz batch extracted");
                            state.current_batch = Some(batch);
                            let depth = state.correction_count;
                            self.send_command(
                                session_id,
                                &mut session,
                                &mut state,
                                Command::CheckQuantity { depth },
                            );
                        }
                        Err(e) => {
                            tracing::warn!(session_id, error = %e, "Failed to extract quiz batch");
                            state.error_count += 1;
                            self.send_command(
                                session_id,
                                &mut session,
                                &mut state,
                                Command::Recreate,
                            );
                        }
                    }
                }
                Some(Command::CheckQuantity { .. }) => match self.extractor.extract_report(&reply) {
                    Ok(report) if report.is_adequate() => {
                        if state.correction_count + 1 >= self.budgets.min_correction_count {
                            tracing::info!(
                                session_id,
                                rounds = state.correction_count + 1,
                                "Quiz batch accepted"
                            );
                            break;
                        }
                        state.correction_count += 1;
                        let depth = state.correction_count;
                        self.send_command(
                            session_id,
                            &mut session,
                            &mut state,
                            Command::CheckQuantity { depth },
                        );
                    }
                    Ok(report) => {
                        tracing::info!(
                            session_id,
                            invalid = ?report.invalid_indices,
                            "Review found the batch inadequate"
                        );
                        self.send_command(session_id, &mut session, &mut state, Command::Recreate);
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id,
                            error = %e,
                            "Failed to extract validation report"
                        );
                        state.error_count += 1;
                        self.send_command(session_id, &mut session, &mut state, Command::Recreate);
                    }
                },
                None => {
                    return Err(QuizError::InternalState(
                        "no command was sent before the reply".to_string(),
                    ));
                }
            }
        }

        let outcome = conclude(&state, &self.budgets);
        match &outcome {
            NegotiationOutcome::Success { .. } => tracing::info!(
                session_id,
                retries = state.retry_count,
                "Negotiation succeeded"
            ),
            NegotiationOutcome::Failure { reason } => tracing::warn!(
                session_id,
                retries = state.retry_count,
                errors = state.error_count,
                "Negotiation failed: {}",
                reason
            ),
        }

        Ok(NegotiationReport {
            outcome,
            state,
            session,
        })
    }

    /// 追加指令消息并更新计数：Recreate 会增加 retry_count、清零 correction_count 并丢弃旧题组
    fn send_command(
        &self,
        session_id: &str,
        session: &mut Session,
        state: &mut NegotiationState,
        command: Command,
    ) {
        tracing::info!(session_id, command = %command, "Sending command");
        self.append(session_id, session, Message::user(command.to_prompt()));

        if command == Command::Recreate {
            state.retry_count += 1;
            state.correction_count = 0;
            state.current_batch = None;
        }
        state.last_command = Some(command);
    }

    /// 追加消息后整体落盘；落盘失败只记日志
    fn append(&self, session_id: &str, session: &mut Session, message: Message) {
        session.push(message);
        if let Err(e) = self.store.persist(session_id, session) {
            tracing::warn!(session_id, error = %e, "Failed to persist transcript");
        }
    }
}

/// 循环结束后的判定：先看预算，再看是否拿到过题组
fn conclude(state: &NegotiationState, budgets: &NegotiationBudgets) -> NegotiationOutcome {
    let failure = |reason: &str| NegotiationOutcome::Failure {
        reason: reason.to_string(),
    };

    if state.error_count >= budgets.max_error_count {
        return failure(REASON_ERROR_BUDGET);
    }
    if state.retry_count >= budgets.max_retry_count {
        return failure(REASON_RETRY_BUDGET);
    }
    match &state.current_batch {
        Some(batch) => NegotiationOutcome::Success {
            quizzes: batch.clone(),
        },
        None => failure(REASON_UNKNOWN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{adequate_report, sample_batch};
    use crate::llm::ScriptedLlmClient;
    use crate::memory::Role;
    use crate::quiz::extractor::fence_json;
    use crate::quiz::{Evaluation, ValidationReport};

    fn batch_reply() -> String {
        format!("Here you go\n{}", fence_json(&sample_batch(3)))
    }

    fn adequate_reply() -> String {
        fence_json(&adequate_report(&sample_batch(3)))
    }

    fn inadequate_reply() -> String {
        let mut report: ValidationReport = adequate_report(&sample_batch(3));
        report.overall_evaluation = Evaluation::Inadequate;
        report.invalid_indices.insert(2);
        fence_json(&report)
    }

    fn user_turns(session: &Session) -> Vec<String> {
        session
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect()
    }

    fn budgets(retry: u32, error: u32, correction: u32) -> NegotiationBudgets {
        NegotiationBudgets {
            max_retry_count: retry,
            max_error_count: error,
            min_correction_count: correction,
        }
    }

    #[tokio::test]
    async fn test_escalating_reviews_until_accepted() {
        let llm = Arc::new(ScriptedLlmClient::new([
            batch_reply(),
            adequate_reply(),
            adequate_reply(),
            adequate_reply(),
        ]));
        let report = Negotiator::new(llm.clone(), budgets(10, 3, 3))
            .run("s", vec![Message::system("rules")])
            .await
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(llm.calls(), 4);
        assert_eq!(
            user_turns(&report.session),
            vec![
                "Create",
                "CheckQuantity",
                "超严格 CheckQuantity",
                "超超严格 CheckQuantity"
            ]
        );
        assert_eq!(report.state.correction_count, 2);
        assert_eq!(report.session.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_inadequate_resets_correction_progress() {
        let llm = Arc::new(ScriptedLlmClient::new([
            batch_reply(),
            adequate_reply(),
            inadequate_reply(),
            batch_reply(),
            adequate_reply(),
            adequate_reply(),
        ]));
        let report = Negotiator::new(llm, budgets(10, 3, 2))
            .run("s", Vec::new())
            .await
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(report.state.retry_count, 1);
        assert_eq!(
            user_turns(&report.session),
            vec![
                "Create",
                "CheckQuantity",
                "超严格 CheckQuantity",
                "Recreate",
                "CheckQuantity",
                "超严格 CheckQuantity"
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_review_counts_as_error() {
        let llm = Arc::new(ScriptedLlmClient::new([
            batch_reply(),
            "looks fine to me".to_string(),
            batch_reply(),
            adequate_reply(),
        ]));
        let report = Negotiator::new(llm, budgets(10, 3, 1))
            .run("s", Vec::new())
            .await
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(report.state.error_count, 1);
        assert_eq!(report.state.retry_count, 1);
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let llm = Arc::new(ScriptedLlmClient::new([batch_reply()]));
        let err = Negotiator::new(llm, budgets(10, 3, 2))
            .run("s", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::Transport(_)));
    }

    #[tokio::test]
    async fn test_zero_budget_never_calls_llm() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let report = Negotiator::new(llm.clone(), budgets(0, 3, 1))
            .run("s", Vec::new())
            .await
            .unwrap();
        assert_eq!(llm.calls(), 0);
        assert_eq!(
            report.outcome,
            NegotiationOutcome::Failure {
                reason: REASON_RETRY_BUDGET.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_transcript_persisted_after_every_turn() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct CountingStore {
            lengths: Mutex<Vec<usize>>,
        }

        impl TranscriptStore for CountingStore {
            fn persist(&self, _session_id: &str, turns: &[Message]) -> anyhow::Result<()> {
                self.lengths.lock().unwrap().push(turns.len());
                anyhow::bail!("disk full")
            }
        }

        let store = Arc::new(CountingStore::default());
        let llm = Arc::new(ScriptedLlmClient::new([batch_reply(), adequate_reply()]));
        let report = Negotiator::new(llm, budgets(10, 3, 1))
            .with_transcript_store(store.clone())
            .run("s", vec![Message::system("rules")])
            .await
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(*store.lengths.lock().unwrap(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_conclude_prefers_budgets() {
        let b = budgets(3, 2, 1);
        let mut state = NegotiationState {
            error_count: 2,
            retry_count: 3,
            ..Default::default()
        };
        assert_eq!(
            conclude(&state, &b),
            NegotiationOutcome::Failure {
                reason: REASON_ERROR_BUDGET.into()
            }
        );
        state.error_count = 0;
        assert_eq!(
            conclude(&state, &b),
            NegotiationOutcome::Failure {
                reason: REASON_RETRY_BUDGET.into()
            }
        );
        state.retry_count = 0;
        assert_eq!(
            conclude(&state, &b),
            NegotiationOutcome::Failure {
                reason: REASON_UNKNOWN.into()
            }
        );
        state.current_batch = Some(sample_batch(1));
        assert!(conclude(&state, &b).is_success());
    }

    #[test]
    fn test_max_turns() {
        assert_eq!(budgets(3, 2, 2).max_turns(), 3 + 2 * 4);
    }
}
