//! 题干抽取：为编号 `<from>..=<to>` 的每组结果从题干池不放回地抽取 quiz.count 道题
//!
//! 用法：`quizbee-pick <from> <to> [config.toml]`；已存在的结果目录会被跳过。

use std::path::PathBuf;

use anyhow::Context;
use quizbee::config::load_config;
use quizbee::observability;
use quizbee::quiz::{pick_from_pool, ResultStore};

fn parse_no(arg: Option<String>, name: &str) -> anyhow::Result<u32> {
    arg.with_context(|| format!("missing <{name}>; usage: quizbee-pick <from> <to> [config]"))?
        .parse()
        .with_context(|| format!("<{name}> must be a number"))
}

fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let from = parse_no(args.next(), "from")?;
    let to = parse_no(args.next(), "to")?;
    let cfg = load_config(args.next().map(PathBuf::from)).context("Failed to load config")?;

    let pool_path = cfg.app.question_pool();
    let results = ResultStore::new(&cfg.app.result_path);
    let mut rng = rand::thread_rng();

    for no in from..=to {
        let result_no = no.to_string();
        let picked = pick_from_pool(&pool_path, &results, &result_no, cfg.quiz.count, &mut rng)
            .with_context(|| format!("Failed to pick questions for {result_no}"))?;
        if let Some(picked) = picked {
            println!("{}: {}", result_no, picked.join(" | "));
        }
    }
    Ok(())
}
