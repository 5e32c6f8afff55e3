//! 会话层：消息模型与会话记录持久化

pub mod conversation;
pub mod persistence;

pub use conversation::{Message, Role, Session};
pub use persistence::{JsonTranscriptStore, NoopTranscriptStore, TranscriptStore};
