//! 题目补全：读取 `<result_path>/<result_no>/questions.txt` 中的题干，补齐选项与解析后写入 quizzes.json

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use quizbee::config::load_config;
use quizbee::memory::JsonTranscriptStore;
use quizbee::quiz::{load_lines, new_session_id, randomize_answers, QuizCompleter, ResultStore};
use quizbee::{llm, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let result_no = cfg
        .app
        .result_no
        .clone()
        .context("app.result_no is required (QUIZBEE__APP__RESULT_NO)")?;
    let results = ResultStore::new(&cfg.app.result_path);
    let questions_path = results.questions_path(&result_no);
    if !questions_path.exists() {
        anyhow::bail!("{} does not exist", questions_path.display());
    }
    let questions = load_lines(&questions_path).context("Failed to read questions")?;

    let client =
        llm::create_client(&cfg.llm, questions.len()).context("Failed to create LLM client")?;
    let completer = QuizCompleter::new(client.clone())
        .with_transcript_store(Arc::new(JsonTranscriptStore::new(cfg.app.transcript_dir())));

    let session_id = new_session_id();
    tracing::info!(session_id = %session_id, "Completing {} questions", questions.len());
    let quizzes = completer
        .complete(&session_id, &questions)
        .await
        .context("Failed to complete quizzes")?;
    llm::report_token_usage(client.as_ref());

    let path = results
        .save(&result_no, &randomize_answers(quizzes))
        .context("Failed to save quizzes")?;
    println!("Saved quizzes to {}", path.display());
    Ok(())
}
