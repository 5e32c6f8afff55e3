//! 只生成题干：一次调用，回复按行拆分
//!
//! 产出的题干进入题干池，之后按结果编号抽取，再由 QuizCompleter 补齐选项与解析。

use std::sync::Arc;

use crate::core::QuizError;
use crate::llm::LlmClient;
use crate::memory::{Message, NoopTranscriptStore, Session, TranscriptStore};
use crate::quiz::{QuizRequest, DEFAULT_LANGUAGE};

/// 题干生成会话的开头，Mock 客户端据此识别
pub const TITLE_ROLE_LINE: &str = "你是题目生成程序，只输出题干，每行一道。";

pub struct QuizTitleGenerator {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn TranscriptStore>,
    language: String,
}

impl QuizTitleGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            store: Arc::new(NoopTranscriptStore),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.store = store;
        self
    }

    fn session(&self, request: &QuizRequest) -> Session {
        let rules = [
            TITLE_ROLE_LINE.to_string(),
            String::new(),
            format!("- 题干使用{}编写，尽量不要夹杂英文单词。", self.language),
            "- 必须有客观且唯一的正确答案，不能出主观题或存在多个正确答案的题。".to_string(),
            "- 答案不能随时间改变，排除流行趋势、排行、统计数据等会变化的内容。".to_string(),
            "- 不得与「已用题目」「低质量题目」重复或相似，也不要出过于基础、一眼就能猜到答案的题。"
                .to_string(),
            "- 表述清楚具体，避免模糊或容易混淆的说法。".to_string(),
            "- 第一题要能引发兴趣与好奇心；整组题目覆盖多样的领域，让观众学到新知识。".to_string(),
            "- 题干尽量不超过 30 字。".to_string(),
            "- 准确输出所要求的题数，每行一道，不要编号，不要输出其他内容。".to_string(),
        ];

        let mut ask = vec!["已用题目：".to_string()];
        ask.extend(request.prior_items.iter().map(|t| format!("- {}", t)));
        ask.push(String::new());
        ask.push("低质量题目：".to_string());
        ask.extend(request.excluded_items.iter().map(|t| format!("- {}", t)));
        ask.push(String::new());
        let mut last = format!(
            "参考以上列表，出 {} 道新题。目标人群：「{}」。",
            request.count, request.target
        );
        if let Some(topic) = &request.topic {
            last.push_str(&format!("主题：「{}」。", topic));
        }
        ask.push(last);

        vec![Message::system(rules.join("\n")), Message::user(ask.join("\n"))]
    }

    /// 单轮生成；回复按行拆分，去掉两端空白与空行
    pub async fn generate(
        &self,
        session_id: &str,
        request: &QuizRequest,
    ) -> Result<Vec<String>, QuizError> {
        let mut session = self.session(request);
        let reply = self.llm.complete(&session).await?;
        session.push(Message::assistant(reply.clone()));
        if let Err(e) = self.store.persist(session_id, &session) {
            tracing::warn!(session_id, error = %e, "Failed to persist transcript");
        }

        let titles: Vec<String> = reply
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        tracing::info!(session_id, titles = titles.len(), "Quiz titles generated");
        Ok(titles)
    }
}
