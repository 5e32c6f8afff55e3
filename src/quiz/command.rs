//! 协商指令词与逐级加严前缀

use std::fmt;

pub const CREATE: &str = "Create";
pub const RECREATE: &str = "Recreate";
pub const CHECK_QUANTITY: &str = "CheckQuantity";

/// 加严强度词，每多一轮审查重复一次
const INTENSIFIER: &str = "超";
const RIGOR: &str = "严格";

/// 发给 LLM 的指令；CheckQuantity 携带已通过的审查轮数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create,
    Recreate,
    CheckQuantity { depth: u32 },
}

impl Command {
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Create => CREATE,
            Command::Recreate => RECREATE,
            Command::CheckQuantity { .. } => CHECK_QUANTITY,
        }
    }

    /// 作为 User 消息发送的文本
    pub fn to_prompt(&self) -> String {
        match self {
            Command::CheckQuantity { depth } => {
                format!("{}{}", escalation_prefix(*depth), CHECK_QUANTITY)
            }
            other => other.keyword().to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CheckQuantity { depth } => write!(f, "{}({})", CHECK_QUANTITY, depth),
            other => f.write_str(other.keyword()),
        }
    }
}

/// 第 0 轮为空；之后为 n 个强度词 + "严格 "，提示 LLM 一轮比一轮审得更严
pub fn escalation_prefix(correction_count: u32) -> String {
    if correction_count == 0 {
        return String::new();
    }
    format!("{}{} ", INTENSIFIER.repeat(correction_count as usize), RIGOR)
}
