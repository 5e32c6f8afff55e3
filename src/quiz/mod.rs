//! 出题层：数据模型、回复解析、会话构建、协商状态机、答案随机化、题干生成与结果存取

pub mod builder;
pub mod command;
pub mod completer;
pub mod extractor;
pub mod generator;
pub mod negotiation;
pub mod randomizer;
pub mod schema;
pub mod sources;
pub mod titles;
pub mod types;

pub use builder::{ConversationBuilder, QuizRequest, DEFAULT_LANGUAGE, DEFAULT_QUIZ_COUNT};
pub use command::{escalation_prefix, Command};
pub use completer::QuizCompleter;
pub use extractor::{FencedJsonExtractor, ResponseExtractor};
pub use generator::{new_session_id, QuizGenerator};
pub use negotiation::{
    NegotiationBudgets, NegotiationOutcome, NegotiationReport, NegotiationState, Negotiator,
};
pub use randomizer::{make_answers_unique, randomize_answers};
pub use schema::SchemaDescriptions;
pub use sources::{
    append_to_pool, load_excluded_items, load_lines, load_previous_items, pick_from_pool,
    ResultStore, QUESTIONS_FILE,
};
pub use titles::QuizTitleGenerator;
pub use types::{
    Evaluation, QuizBatch, QuizItem, ReviewDetails, ValidationIssue, ValidationReport,
    CHOICE_COUNT,
};
