use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobscrape::collectors::jsearch::JSearch;
use jobscrape::config::Config;
use jobscrape::models::query::default_combinations;
use jobscrape::{CheckpointWriter, CollectionEngine, TokioPacer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscrape=info")),
        )
        .init();

    let config = Config::parse();

    if let Some(dir) = config.save_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let fetcher = JSearch::new(&config.base_url, &config.api_key, &config.api_host)?;
    let pacer = TokioPacer;
    let engine = CollectionEngine::new(
        &fetcher,
        &pacer,
        CheckpointWriter::new(&config.save_path),
        config.engine_settings(),
    );

    let combos = default_combinations();
    tracing::info!(
        "Collecting up to {} jobs across {} combinations",
        config.target_count,
        combos.len()
    );
    let outcome = engine.run(&combos).await;

    tracing::info!(
        "Run finished: {} resumed, {} new, {} duplicates, {} pages fetched, target reached: {}",
        outcome.resumed,
        outcome.new_records,
        outcome.duplicates,
        outcome.pages_fetched,
        outcome.target_reached
    );
    println!("Total jobs: {}", outcome.records.len());
    let final_path = outcome
        .written_to
        .unwrap_or_else(|| config.save_path.clone());
    println!("Final CSV at: {}", final_path.display());

    Ok(())
}
