//! 题干生成：按配置的目标人群与主题生成一批题干，追加到 `<store_path>/questions.txt` 题干池

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use quizbee::config::load_config;
use quizbee::memory::JsonTranscriptStore;
use quizbee::quiz::{
    append_to_pool, load_excluded_items, load_lines, load_previous_items, new_session_id,
    QuizRequest, QuizTitleGenerator,
};
use quizbee::{llm, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let pool_path = cfg.app.question_pool();
    let mut prior_items =
        load_previous_items(&cfg.app.result_path, &[]).context("Failed to load previous quizzes")?;
    prior_items.extend(load_lines(&pool_path).context("Failed to read question pool")?);
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

    let client =
        llm::create_client(&cfg.llm, cfg.quiz.count).context("Failed to create LLM client")?;
    let generator = QuizTitleGenerator::new(client.clone())
        .with_language(cfg.quiz.language.clone())
        .with_transcript_store(Arc::new(JsonTranscriptStore::new(cfg.app.transcript_dir())));

    let session_id = new_session_id();
    let titles = generator
        .generate(&session_id, &request)
        .await
        .context("Failed to generate quiz titles")?;
    llm::report_token_usage(client.as_ref());

    let size = append_to_pool(&pool_path, &titles).context("Failed to update question pool")?;
    for title in &titles {
        println!("{}", title);
    }
    tracing::info!(
        "Added {} titles to {} ({} in pool)",
        titles.len(),
        pool_path.display(),
        size
    );
    Ok(())
}
