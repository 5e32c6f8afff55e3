//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `QUIZBEE__*` 覆盖（双下划线表示嵌套，如 `QUIZBEE__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::quiz::{NegotiationBudgets, DEFAULT_LANGUAGE, DEFAULT_QUIZ_COUNT};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub quiz: QuizSection,
}

/// [app] 段：存储路径与本次结果编号
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话记录根目录（记录写在 `<store_path>/chat-messages`）
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// 出题结果根目录（每组结果写在 `<result_path>/<result_no>/quizzes.json`）
    #[serde(default = "default_result_path")]
    pub result_path: PathBuf,
    /// 本次结果编号；未设置时按时间戳生成
    pub result_no: Option<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            store_path: default_store_path(),
            result_path: default_result_path(),
            result_no: None,
        }
    }
}

impl AppSection {
    pub fn transcript_dir(&self) -> PathBuf {
        self.store_path.join("chat-messages")
    }

    /// 待出题的题干池
    pub fn question_pool(&self) -> PathBuf {
        self.store_path.join(crate::quiz::sources::QUESTIONS_FILE)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("store")
}

fn default_result_path() -> PathBuf {
    PathBuf::from("results")
}

/// [llm] 段：后端选择、采样温度与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [quiz] 段：出题对象、主题、数量、语言、排除列表与协商预算
#[derive(Debug, Clone, Deserialize)]
pub struct QuizSection {
    #[serde(default = "default_target")]
    pub target: String,
    pub topic: Option<String>,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_language")]
    pub language: String,
    /// 低质量题目列表文件（每行一题）
    pub exclude_file: Option<PathBuf>,
    #[serde(default)]
    pub budgets: BudgetSection,
}

impl Default for QuizSection {
    fn default() -> Self {
        Self {
            target: default_target(),
            topic: None,
            count: default_count(),
            language: default_language(),
            exclude_file: None,
            budgets: BudgetSection::default(),
        }
    }
}

fn default_target() -> String {
    "평범한 고등학교를 졸업한 사람".to_string()
}

fn default_count() -> usize {
    DEFAULT_QUIZ_COUNT
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// [quiz.budgets] 段：重试、错误与最少连续合格审查次数
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetSection {
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
    #[serde(default = "default_max_error_count")]
    pub max_error_count: u32,
    #[serde(default = "default_min_correction_count")]
    pub min_correction_count: u32,
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            max_error_count: default_max_error_count(),
            min_correction_count: default_min_correction_count(),
        }
    }
}

impl From<&BudgetSection> for NegotiationBudgets {
    fn from(section: &BudgetSection) -> Self {
        NegotiationBudgets {
            max_retry_count: section.max_retry_count,
            max_error_count: section.max_error_count,
            min_correction_count: section.min_correction_count,
        }
    }
}

fn default_max_retry_count() -> u32 {
    10
}

fn default_max_error_count() -> u32 {
    3
}

fn default_min_correction_count() -> u32 {
    3
}

/// 从 config 目录加载配置，环境变量 QUIZBEE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 QUIZBEE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("QUIZBEE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
