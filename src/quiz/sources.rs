//! 协商前的输入与协商后的产出
//!
//! - 已用题目：扫描结果目录下的 `*/quizzes.json`
//! - 排除题目 / 待补全题干：每行一题的文本文件
//! - 题干池：`<store_path>/questions.txt`，按结果编号不放回抽取
//! - 结果保存：`<result_path>/<result_no>/quizzes.json`

use std::path::{Path, PathBuf};

use rand::Rng;

use crate::core::QuizError;
use crate::quiz::{FencedJsonExtractor, QuizBatch};

/// 题干文件名：题干池与每组结果目录下的待补全题干共用
pub const QUESTIONS_FILE: &str = "questions.txt";

/// 读取非空行（去掉两端空白）；文件不存在时返回空列表
pub fn load_lines(path: impl AsRef<Path>) -> Result<Vec<String>, QuizError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(std::fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// 低质量题目列表
pub fn load_excluded_items(path: impl AsRef<Path>) -> Result<Vec<String>, QuizError> {
    load_lines(path)
}

/// 收集此前各组结果中的题干；`skip` 中的结果编号不计入（如本次正在覆盖的编号）
pub fn load_previous_items(
    result_path: impl AsRef<Path>,
    skip: &[String],
) -> Result<Vec<String>, QuizError> {
    let store = ResultStore::new(result_path.as_ref());
    let root = glob::Pattern::escape(&result_path.as_ref().to_string_lossy());
    let pattern = Path::new(&root).join("*").join("quizzes.json");
    let paths = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| QuizError::Config(format!("invalid result path pattern: {e}")))?;

    let mut items = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    path = %e.path().display(),
                    error = %e.error(),
                    "Skipping unreadable result entry"
                );
                continue;
            }
        };
        let Some(no) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        else {
            continue;
        };
        if skip.iter().any(|s| s == no) {
            continue;
        }
        let batch = store.load(no)?;
        items.extend(batch.into_iter().map(|q| q.question));
    }
    tracing::info!("Loaded {} previously used questions", items.len());
    Ok(items)
}

/// 把题干追加到题干池末尾，返回追加后的池大小
pub fn append_to_pool(
    pool_path: impl AsRef<Path>,
    questions: &[String],
) -> Result<usize, QuizError> {
    let pool_path = pool_path.as_ref();
    let mut pool = load_lines(pool_path)?;
    pool.extend(
        questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(String::from),
    );
    write_lines(pool_path, &pool)?;
    Ok(pool.len())
}

/// 从题干池不放回地随机抽取 `count` 道题，写入 `<result_path>/<result_no>/questions.txt`，
/// 并把抽中的题从池中移除。
///
/// 结果目录已存在时跳过并返回 `None`；池中题数不足时返回 Config 错误，池保持不变。
pub fn pick_from_pool<R: Rng + ?Sized>(
    pool_path: impl AsRef<Path>,
    results: &ResultStore,
    result_no: &str,
    count: usize,
    rng: &mut R,
) -> Result<Option<Vec<String>>, QuizError> {
    let dir = results.dir_for(result_no);
    if dir.exists() {
        tracing::info!("{} already exists, skipping", dir.display());
        return Ok(None);
    }

    let pool_path = pool_path.as_ref();
    if !pool_path.exists() {
        return Err(QuizError::Config(format!(
            "{} does not exist",
            pool_path.display()
        )));
    }
    let pool = load_lines(pool_path)?;
    if pool.len() < count {
        return Err(QuizError::Config(format!(
            "question pool has {} questions, {} needed",
            pool.len(),
            count
        )));
    }

    let indices = rand::seq::index::sample(rng, pool.len(), count).into_vec();
    let picked: Vec<String> = indices.iter().map(|&i| pool[i].clone()).collect();
    let remaining: Vec<String> = pool
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !indices.contains(i))
        .map(|(_, q)| q)
        .collect();

    let path = results.questions_path(result_no);
    tracing::info!("Writing {} questions to {}", picked.len(), path.display());
    write_lines(&path, &picked)?;
    write_lines(pool_path, &remaining)?;
    Ok(Some(picked))
}

/// 每行一条写入；父目录不存在时自动创建
fn write_lines(path: &Path, lines: &[String]) -> Result<(), QuizError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// 出题结果存储
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn dir_for(&self, result_no: &str) -> PathBuf {
        self.root.join(result_no)
    }

    pub fn path_for(&self, result_no: &str) -> PathBuf {
        self.dir_for(result_no).join("quizzes.json")
    }

    /// 待补全题干
    pub fn questions_path(&self, result_no: &str) -> PathBuf {
        self.dir_for(result_no).join(QUESTIONS_FILE)
    }

    /// 写入 pretty JSON；目录不存在时自动创建
    pub fn save(&self, result_no: &str, batch: &QuizBatch) -> Result<PathBuf, QuizError> {
        std::fs::create_dir_all(self.dir_for(result_no))?;
        let path = self.path_for(result_no);
        let json = serde_json::to_string_pretty(batch)
            .map_err(|e| QuizError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(&path, json + "\n")?;
        Ok(path)
    }

    /// 读取并校验某组结果（与解析 LLM 回复使用同样的校验）
    pub fn load(&self, result_no: &str) -> Result<QuizBatch, QuizError> {
        let text = std::fs::read_to_string(self.path_for(result_no))?;
        let batch = FencedJsonExtractor::parse_batch(&text)?;
        Ok(batch)
    }
}
