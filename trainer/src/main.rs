use std::path::PathBuf;

use anyhow::Context;
use chess::pgn::split_games;
use clap::Parser;
use engine::UciEvaluator;
use tokio_stream::StreamExt;
use trainer::{Orchestrator, TrainerConfig};

/// Find the critical positions in a player's games and print them as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "critical-positions", version)]
struct Cli {
    /// Player whose moves are analyzed (matched against White/Black headers)
    #[arg(long)]
    user: String,

    /// Engine search depth per position
    #[arg(long)]
    depth: Option<u32>,

    /// Minimum eval loss, in pawns, for a mistake
    #[arg(long)]
    threshold: Option<f64>,

    /// Full moves at the start of each game to leave out
    #[arg(long = "skip-opening")]
    skip_opening: Option<u32>,

    /// Path to a UCI engine binary (defaults to a Stockfish found on this machine)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// PGN file with one or more games
    pgn_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only JSON
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = TrainerConfig::from_env().context("Invalid environment configuration")?;
    if let Some(depth) = cli.depth {
        config.depth = depth;
    }
    if let Some(threshold) = cli.threshold {
        config.eval_threshold = threshold;
    }
    if let Some(skip) = cli.skip_opening {
        config.skip_opening_moves = skip;
    }
    if let Some(path) = cli.engine {
        config.engine.path = Some(path);
    }
    config.validate().context("Invalid command-line options")?;

    let text = tokio::fs::read_to_string(&cli.pgn_file)
        .await
        .with_context(|| format!("Failed to read {}", cli.pgn_file.display()))?;
    let games = split_games(&text);
    tracing::info!(games = games.len(), file = %cli.pgn_file.display(), "Loaded PGN");

    let evaluator = UciEvaluator::spawn(
        config.engine.path.as_deref(),
        config.engine.evaluator_config(),
    )
    .context("Failed to start the chess engine")?;

    let (mut events, handle) = Orchestrator::new(evaluator, config).spawn(cli.user, games);

    while let Some(event) = events.next().await {
        let line = serde_json::to_string(&event).context("Failed to serialize event")?;
        println!("{line}");
    }

    let report = handle.await.context("Analysis task panicked")??;
    tracing::info!(
        games = report.total_games_analyzed,
        skipped = report.skipped_games.len(),
        blunders = report.blunders,
        mistakes = report.mistakes,
        reinforcements = report.reinforcements.len(),
        "Done"
    );
    Ok(())
}
