//! 协商状态机集成测试：典型场景与预算上限

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use quizbee::llm::mock::{adequate_report, sample_batch};
    use quizbee::llm::{LlmClient, LlmError, ScriptedLlmClient};
    use quizbee::memory::{Message, Role};
    use quizbee::quiz::extractor::fence_json;
    use quizbee::quiz::negotiation::{REASON_ERROR_BUDGET, REASON_RETRY_BUDGET};
    use quizbee::quiz::{
        ConversationBuilder, Evaluation, NegotiationBudgets, NegotiationOutcome, Negotiator,
        QuizRequest, SchemaDescriptions, CHOICE_COUNT,
    };
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn batch_reply() -> String {
        format!("새 문제입니다.\n{}", fence_json(&sample_batch(3)))
    }

    fn review_reply(evaluation: Evaluation) -> String {
        let mut report = adequate_report(&sample_batch(3));
        report.overall_evaluation = evaluation;
        format!("검토 결과:\n{}", fence_json(&report))
    }

    fn budgets(retry: u32, error: u32, correction: u32) -> NegotiationBudgets {
        NegotiationBudgets {
            max_retry_count: retry,
            max_error_count: error,
            min_correction_count: correction,
        }
    }

    fn initial_session() -> Vec<Message> {
        ConversationBuilder::new(SchemaDescriptions::generate())
            .build(&QuizRequest::new("평범한 고등학교를 졸업한 사람"))
            .unwrap()
    }

    fn count_user(session: &[Message], pred: impl Fn(&str) -> bool) -> usize {
        session
            .iter()
            .filter(|m| m.role == Role::User && pred(&m.content))
            .count()
    }

    /// 按最后一条指令回复：出题时给题组，审查时一律判定不合格
    struct AlwaysInadequate;

    #[async_trait]
    impl LlmClient for AlwaysInadequate {
        async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            if last.ends_with("CheckQuantity") {
                Ok(review_reply(Evaluation::Inadequate))
            } else {
                Ok(batch_reply())
            }
        }
    }

    /// 随机回复：题组 / 合格 / 不合格 / 乱码
    struct RandomReplies(Mutex<StdRng>);

    #[async_trait]
    impl LlmClient for RandomReplies {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            let pick = self.0.lock().unwrap().gen_range(0..4);
            Ok(match pick {
                0 => batch_reply(),
                1 => review_reply(Evaluation::Adequate),
                2 => review_reply(Evaluation::Inadequate),
                _ => "```json\n[oops\n```".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_scenario_a_two_adequate_rounds() {
        let llm = Arc::new(
            ScriptedLlmClient::new([batch_reply(), review_reply(Evaluation::Adequate)])
                .repeat_last(),
        );
        let report = Negotiator::new(llm.clone(), budgets(10, 3, 2))
            .run("scenario-a", initial_session())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            NegotiationOutcome::Success {
                quizzes: sample_batch(3)
            }
        );
        assert_eq!(count_user(&report.session, |c| c.ends_with("CheckQuantity")), 2);
        assert_eq!(llm.calls(), 3);
        assert_eq!(report.state.retry_count, 0);
    }

    #[tokio::test]
    async fn test_scenario_b_recover_from_malformed_json() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "```json\n[{\"question\": \"broken\"\n```".to_string(),
            batch_reply(),
            review_reply(Evaluation::Adequate),
        ]));
        let report = Negotiator::new(llm, budgets(10, 3, 1))
            .run("scenario-b", initial_session())
            .await
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(report.state.error_count, 1);
        assert_eq!(report.state.retry_count, 1);
        assert_eq!(count_user(&report.session, |c| c == "Recreate"), 1);
    }

    #[tokio::test]
    async fn test_scenario_c_error_budget() {
        let llm = Arc::new(ScriptedLlmClient::new(["I cannot do that."]).repeat_last());
        let report = Negotiator::new(llm.clone(), budgets(10, 2, 3))
            .run("scenario-c", initial_session())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            NegotiationOutcome::Failure {
                reason: REASON_ERROR_BUDGET.to_string()
            }
        );
        assert_eq!(report.state.error_count, 2);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_scenario_d_retry_budget() {
        let report = Negotiator::new(Arc::new(AlwaysInadequate), budgets(3, 3, 2))
            .run("scenario-d", initial_session())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            NegotiationOutcome::Failure {
                reason: REASON_RETRY_BUDGET.to_string()
            }
        );
        assert_eq!(count_user(&report.session, |c| c == "Recreate"), 3);
        assert_eq!(report.state.retry_count, 3);
        assert!(report.state.current_batch.is_none());
    }

    #[tokio::test]
    async fn test_accepts_the_regenerated_batch() {
        let first = sample_batch(3);
        let mut second = sample_batch(3);
        for q in &mut second {
            q.question = q.question.replace("Mock", "Fresh");
        }
        assert_ne!(first, second);

        let llm = Arc::new(ScriptedLlmClient::new([
            format!("첫 번째 문제입니다.\n{}", fence_json(&first)),
            review_reply(Evaluation::Adequate),
            review_reply(Evaluation::Inadequate),
            format!("다시 만든 문제입니다.\n{}", fence_json(&second)),
            review_reply(Evaluation::Adequate),
            review_reply(Evaluation::Adequate),
        ]));
        let report = Negotiator::new(llm.clone(), budgets(10, 3, 2))
            .run("regenerated", initial_session())
            .await
            .unwrap();

        assert_eq!(llm.calls(), 6);
        assert_eq!(report.state.retry_count, 1);
        assert_eq!(report.outcome, NegotiationOutcome::Success { quizzes: second });
    }

    #[tokio::test]
    async fn test_budgets_never_exceeded() {
        for seed in 0..40 {
            let llm = Arc::new(RandomReplies(Mutex::new(StdRng::seed_from_u64(seed))));
            let b = budgets(4, 3, 2);
            let report = Negotiator::new(llm, b)
                .run("random", initial_session())
                .await
                .unwrap();

            let recreates = count_user(&report.session, |c| c == "Recreate") as u32;
            assert!(recreates <= b.max_retry_count, "seed {seed}");
            assert!(report.state.error_count <= b.max_error_count, "seed {seed}");

            let turns = count_user(&report.session, |_| true) as u32;
            assert!(turns <= b.max_turns() + 1, "seed {seed}");

            if let NegotiationOutcome::Success { quizzes } = report.outcome {
                for q in &quizzes {
                    assert_eq!(q.choices.len(), CHOICE_COUNT);
                    assert!((1..=4).contains(&q.answer));
                }
            }
        }
    }
}
