//! QuizBee 出题主程序
//!
//! 入口：初始化日志、加载配置、读取已用/排除题目，协商出一组题目并写入结果目录。
//! 用法：`quizbee [config.toml]`，其余参数通过 config/default.toml 与 QUIZBEE__* 环境变量设置。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use quizbee::config::load_config;
use quizbee::memory::JsonTranscriptStore;
use quizbee::quiz::{
    load_excluded_items, load_previous_items, ConversationBuilder, ResultStore,
    SchemaDescriptions,
};
use quizbee::{
    llm, observability, NegotiationBudgets, NegotiationOutcome, QuizGenerator, QuizRequest,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let client =
        llm::create_client(&cfg.llm, cfg.quiz.count).context("Failed to create LLM client")?;
    let result_no = cfg
        .app
        .result_no
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d%H%M%S").to_string());

    let prior_items = load_previous_items(&cfg.app.result_path, &[result_no.clone()])
        .context("Failed to load previous quizzes")?;
    let excluded_items = match &cfg.quiz.exclude_file {
        Some(path) => load_excluded_items(path).context("Failed to load excluded quizzes")?,
        None => Vec::new(),
    };

    let mut request = QuizRequest::new(cfg.quiz.target.clone())
        .with_count(cfg.quiz.count)
        .with_prior_items(prior_items)
        .with_excluded_items(excluded_items);
    if let Some(topic) = &cfg.quiz.topic {
        request = request.with_topic(topic.clone());
    }

    let generator = QuizGenerator::new(client.clone())
        .with_builder(
            ConversationBuilder::new(SchemaDescriptions::generate())
                .with_language(cfg.quiz.language.clone()),
        )
        .with_transcript_store(Arc::new(JsonTranscriptStore::new(cfg.app.transcript_dir())));

    let outcome = generator
        .negotiate(&request, NegotiationBudgets::from(&cfg.quiz.budgets))
        .await
        .context("Quiz negotiation aborted")?;
    llm::report_token_usage(client.as_ref());

    match outcome {
        NegotiationOutcome::Success { quizzes } => {
            let path = ResultStore::new(&cfg.app.result_path)
                .save(&result_no, &quizzes)
                .context("Failed to save quizzes")?;
            tracing::info!("Saved {} quizzes to {}", quizzes.len(), path.display());
            println!("{}", serde_json::to_string_pretty(&quizzes)?);
            Ok(())
        }
        NegotiationOutcome::Failure { reason } => {
            anyhow::bail!("Quiz generation failed: {}", reason)
        }
    }
}
