//! Premove Arena - plays one premove-only match between two UCI engines.

use anyhow::Context;
use clap::Parser;
use premove_arena::board::side_name;
use premove_arena::config::{EngineConfig, MatchConfig};
use premove_arena::game_runner::PremoveMatch;
use premove_arena::pgn::{self, PgnHeaders};
use premove_arena::uci_client::UciClient;
use shakmaty::Color;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "premove-arena")]
#[command(about = "Premove-only match between two UCI chess engines")]
struct Cli {
    /// Config file (defaults to premove.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// White engine executable
    #[arg(long)]
    white: Option<PathBuf>,
    /// Black engine executable
    #[arg(long)]
    black: Option<PathBuf>,
    /// White player name for the PGN
    #[arg(long)]
    white_name: Option<String>,
    /// Black player name for the PGN
    #[arg(long)]
    black_name: Option<String>,
    /// Search depth for premoves
    #[arg(long)]
    premove_depth: Option<u32>,
    /// Search depth when a premove is illegal
    #[arg(long)]
    fallback_depth: Option<u32>,
    /// Maximum number of plies
    #[arg(long)]
    max_moves: Option<usize>,
    /// PGN output file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Starting position in FEN
    #[arg(long)]
    fen: Option<String>,
    /// Query both engines for premoves at the same time
    #[arg(long)]
    concurrent_premoves: bool,
}

impl Cli {
    /// Overrides file settings with the ones given on the command line.
    fn apply(&self, config: &mut MatchConfig) {
        if let Some(path) = &self.white {
            config.white.path = Some(path.clone());
        }
        if let Some(path) = &self.black {
            config.black.path = Some(path.clone());
        }
        if let Some(name) = &self.white_name {
            config.white.name = Some(name.clone());
        }
        if let Some(name) = &self.black_name {
            config.black.name = Some(name.clone());
        }
        if let Some(depth) = self.premove_depth {
            config.premove_depth = depth;
        }
        if let Some(depth) = self.fallback_depth {
            config.fallback_depth = depth;
        }
        if let Some(max) = self.max_moves {
            config.max_moves = max;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(fen) = &self.fen {
            config.start_fen = Some(fen.clone());
        }
        if self.concurrent_premoves {
            config.concurrent_premoves = true;
        }
    }
}

/// Spawns and prepares the engine for one side.
fn launch(config: &EngineConfig, path: &Path, color: Color) -> anyhow::Result<UciClient> {
    let side = side_name(color);
    let mut client = UciClient::spawn(path)?;
    client
        .init()
        .with_context(|| format!("{} engine failed the UCI handshake", side))?;

    for (name, value) in &config.options {
        client
            .set_option(name, &value.to_string())
            .with_context(|| format!("Failed to set {} option {}", side, name))?;
    }
    client.new_game()?;

    if let Some(name) = &config.name {
        client.name = name.clone();
    } else if client.name.is_empty() {
        client.name = "?".to_string();
    }

    tracing::info!("{} engine: {} ({})", side, client.name, path.display());
    Ok(client)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config =
        MatchConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate()?;
    let board = config.board()?;

    let start = Instant::now();
    let white = launch(
        &config.white,
        config.engine_path(Color::White)?,
        Color::White,
    )?;
    let black = launch(
        &config.black,
        config.engine_path(Color::Black)?,
        Color::Black,
    )?;

    tracing::info!(
        "Starting premove match: {} (White) vs {} (Black)",
        white.name,
        black.name
    );

    let mut runner = PremoveMatch::new(white, black, board, config.settings());
    let record = runner.play();

    let (mut white, mut black) = runner.into_engines();
    for (color, client) in [(Color::White, &mut white), (Color::Black, &mut black)] {
        if let Err(e) = client.quit() {
            tracing::warn!("{} engine did not shut down cleanly: {}", side_name(color), e);
        }
    }

    let headers = PgnHeaders::new(&config.event, &config.site);
    pgn::write_pgn(&config.output, &record, &headers)
        .with_context(|| format!("Failed to write PGN to {}", config.output.display()))?;

    let elapsed = start.elapsed();
    let saved = std::path::absolute(&config.output).unwrap_or_else(|_| config.output.clone());
    println!(
        "Game finished in {:.1}s. PGN saved to {}",
        elapsed.as_secs_f64(),
        saved.display()
    );
    println!("Result: {} ({})", record.result, record.end);
    for color in [Color::White, Color::Black] {
        let stats = record.stats(color);
        println!(
            "{}: {} premoves, {} fallbacks",
            side_name(color),
            stats.premoves,
            stats.fallbacks
        );
    }

    Ok(())
}
