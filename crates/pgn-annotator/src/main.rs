//! PGN annotator
//!
//! Replays PGN games and annotates every position with a Stockfish evaluation
//! from a remote HTTP service.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pgn_annotator::config::{AnnotatorConfig, Cli};
use pgn_annotator::engine_api::{RetryingAnalyzer, StockfishApiClient};
use pgn_annotator::output::open_sink;
use pgn_annotator::pacing::FixedIntervalPacer;
use pgn_annotator::shutdown;
use pgn_annotator::Annotator;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AnnotatorConfig::from_cli(Cli::parse())?;
    info!(
        input = ?config.input,
        output = %config.output.display(),
        format = ?config.format,
        depth = config.depth,
        api = %config.api_url,
        "Starting annotation run"
    );

    let client = StockfishApiClient::new(config.api_url.clone(), config.request_timeout)?;
    let analyzer = RetryingAnalyzer::new(client, config.max_retries, config.retry_backoff);
    let pacer = FixedIntervalPacer::new(config.pace_every, config.pace_interval);

    let mut source = config.open_source()?;
    let mut sink = open_sink(config.format, &config.output)?;

    let (trigger, shutdown) = shutdown::channel();
    shutdown::install_signal_handlers(trigger)?;

    let mut annotator = Annotator::new(analyzer, pacer)
        .with_depth(config.depth)
        .with_placeholders(config.placeholders);
    let summary = annotator
        .run(source.as_mut(), sink.as_mut(), shutdown)
        .await?;

    if !summary.skipped.is_empty() {
        info!(games = ?summary.skipped, "Skipped games");
    }
    if !summary.aborted.is_empty() {
        info!(games = ?summary.aborted, "Aborted games");
    }
    info!(
        complete = summary.complete,
        skipped = summary.skipped.len(),
        aborted = summary.aborted.len(),
        cancelled = summary.cancelled,
        "Done"
    );

    Ok(ExitCode::from(summary.exit_code()))
}
