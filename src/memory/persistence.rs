//! 对话持久化
//!
//! 每次协商的完整对话覆盖写入 `<dir>/<session_id>.json`，仅用于审计与调试，协商过程中从不回读。

use std::path::{Path, PathBuf};

use crate::memory::Message;

/// 会话记录存储：尽力而为，失败由调用方记录日志后忽略
pub trait TranscriptStore: Send + Sync {
    fn persist(&self, session_id: &str, turns: &[Message]) -> anyhow::Result<()>;
}

/// 简单的文件持久化：每个会话一个 JSON 文件，每条消息含 role + content
#[derive(Debug)]
pub struct JsonTranscriptStore {
    dir: PathBuf,
}

impl JsonTranscriptStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// 读取某个会话的记录；文件不存在时返回空 Vec
    #[cfg(test)]
    pub fn load(&self, session_id: &str) -> anyhow::Result<Vec<Message>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl TranscriptStore for JsonTranscriptStore {
    /// 覆盖写入；目录不存在时自动创建
    fn persist(&self, session_id: &str, turns: &[Message]) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(session_id), serde_json::to_string_pretty(turns)?)?;
        Ok(())
    }
}

/// 不落盘（测试与未配置存储路径时使用）
#[derive(Debug, Default)]
pub struct NoopTranscriptStore;

impl TranscriptStore for NoopTranscriptStore {
    fn persist(&self, _session_id: &str, _turns: &[Message]) -> anyhow::Result<()> {
        Ok(())
    }
}
