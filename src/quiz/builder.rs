//! 会话初始化：拼装出题规则、排除列表、已用题目与输出格式说明
//!
//! 纯数据拼装，不发起任何网络请求。

use crate::core::QuizError;
use crate::memory::{Message, Session};
use crate::quiz::command::{CHECK_QUANTITY, CREATE, RECREATE};
use crate::quiz::SchemaDescriptions;

/// 每次默认出题数
pub const DEFAULT_QUIZ_COUNT: usize = 3;
/// 默认出题语言
pub const DEFAULT_LANGUAGE: &str = "한국어";

/// 一次出题请求
#[derive(Debug, Clone)]
pub struct QuizRequest {
    /// 目标人群描述
    pub target: String,
    pub topic: Option<String>,
    pub count: usize,
    /// 此前已使用过的题干
    pub prior_items: Vec<String>,
    /// 明确排除的低质量题干
    pub excluded_items: Vec<String>,
}

impl QuizRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            topic: None,
            count: DEFAULT_QUIZ_COUNT,
            prior_items: Vec::new(),
            excluded_items: Vec::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        self.topic = if topic.trim().is_empty() {
            None
        } else {
            Some(topic)
        };
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_prior_items(mut self, items: Vec<String>) -> Self {
        self.prior_items = items;
        self
    }

    pub fn with_excluded_items(mut self, items: Vec<String>) -> Self {
        self.excluded_items = items;
        self
    }
}

/// 会话构建器：持有 schema 描述与出题语言
#[derive(Debug, Clone)]
pub struct ConversationBuilder {
    schemas: SchemaDescriptions,
    language: String,
}

impl ConversationBuilder {
    pub fn new(schemas: SchemaDescriptions) -> Self {
        Self {
            schemas,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// 生成初始会话：规则 ->（排除列表）->（已用题目）-> 格式与指令说明
    pub fn build(&self, request: &QuizRequest) -> Result<Session, QuizError> {
        if self.schemas.quiz_batch.trim().is_empty() {
            return Err(QuizError::Config("missing quiz batch schema".to_string()));
        }
        if self.schemas.validation_report.trim().is_empty() {
            return Err(QuizError::Config(
                "missing validation report schema".to_string(),
            ));
        }

        let mut session = vec![Message::system(self.rules(request))];

        if !request.excluded_items.is_empty() {
            session.push(Message::system(bullet_list(
                &request.excluded_items,
                "以上题目低于预期水准，不要出与之类似的题目。",
            )));
        }

        if !request.prior_items.is_empty() {
            session.push(Message::system(bullet_list(
                &request.prior_items,
                "以上题目已经使用过，不要出重复的题目。",
            )));
        }

        session.push(Message::system(self.protocol(request.count)));
        Ok(session)
    }

    fn rules(&self, request: &QuizRequest) -> String {
        let mut lines = vec![
            "你是知识问答视频频道的专业出题人。出题时考虑目标人群与主题，但要记得任何人都可能看到这些题目；频道希望观众借此学到更多知识。".to_string(),
            String::new(),
            "出题必须遵守以下规则：".to_string(),
            format!(
                "- 题目、选项与解析使用{}编写，尽量不要夹杂英文单词。",
                self.language
            ),
            "- 不得与此前用过的题目重复；同一组题目的正确答案序号也不得重复。出现重复时自动换一道新题。".to_string(),
            format!(
                "- 以常识为基础，难度适合「{}」，稍难一些也可以。",
                request.target
            ),
        ];
        if let Some(topic) = &request.topic {
            lines.push(format!("- 题目主题：{}", topic));
        }
        lines.extend([
            "- 必须有客观且唯一的正确答案，不能出主观题或存在多个正确答案的题。".to_string(),
            "- 答案不能随时间改变：只出科学事实、历史事实、数学原理等永久有效的内容，排除排行、统计数据、流行趋势。".to_string(),
            "- 题干尽量不超过 30 字，选项简短明确。".to_string(),
            "- 第一题要能引发观众的兴趣与好奇心，避免过于基础或只属于特定文化的常识；整组题目覆盖多样的领域。".to_string(),
            "- 审查时从主题是否一致、难度、重复性、相似题目、表述是否自然、是否遵守规则几个方面严格检查。".to_string(),
        ]);
        lines.join("\n")
    }

    fn protocol(&self, count: usize) -> String {
        [
            "```json".to_string(),
            self.schemas.quiz_batch.clone(),
            "```".to_string(),
            String::new(),
            format!(
                "- 只有在用户说「{}」时才按上述格式出 {} 道题。必须以数组形式输出，尽量减少空白。",
                CREATE, count
            ),
            "- 题目数组必须用 ```json 代码块包裹。".to_string(),
            "- 题目长度按 schema 中的描述限制。".to_string(),
            format!(
                "- 用户说「{}」时，保留此前判定为合格的题目，只替换不合格的题目，然后输出完整的一组。",
                RECREATE
            ),
            String::new(),
            "```json".to_string(),
            self.schemas.validation_report.clone(),
            "```".to_string(),
            format!(
                "- 用户说「{}」（前面可能带有「超…严格」这样的加严前缀，前缀越长审得越严）时，按上述格式输出审查结果，同样用 ```json 代码块包裹。",
                CHECK_QUANTITY
            ),
            format!(
                "- 只有「{}」「{}」会产出题目数组，只有「{}」会产出审查结果。",
                CREATE, RECREATE, CHECK_QUANTITY
            ),
        ]
        .join("\n")
    }
}

fn bullet_list(items: &[String], footer: &str) -> String {
    let mut lines: Vec<String> = items.iter().map(|t| format!("- {}", t)).collect();
    lines.push(String::new());
    lines.push(footer.to_string());
    lines.join("\n")
}
