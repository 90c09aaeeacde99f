//! Command-line front end: search one position and print the chosen move.
//!
//! ```text
//! gambit [FEN...] [--depth N] [--time SECS] [--difficulty NAME] [--threads N]
//! ```
//!
//! The FEN may be given unquoted; its fields are joined back together. Without a FEN the starting position is searched.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gambit_core::{DeadDrawTablebase, Position, STARTING_FEN};
use gambit_engine::{Difficulty, SearchConfig, SearchReport, Searcher, mate_in};

#[derive(Debug, Parser)]
#[command(name = "gambit", version, about = "Search a chess position and print the best move")]
struct Args {
    /// Position to search, quoted or as separate fields.
    #[arg(value_name = "FEN")]
    fen: Vec<String>,

    /// Maximum search depth in plies.
    #[arg(long)]
    depth: Option<u32>,

    /// Time budget in seconds; zero or less searches to depth.
    #[arg(long, allow_negative_numbers = true)]
    time: Option<f64>,

    /// Depth and time preset: beginner, intermediate, advanced or expert.
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Root-parallel worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

impl Args {
    fn fen(&self) -> Option<String> {
        (!self.fen.is_empty()).then(|| self.fen.join(" "))
    }

    fn config(&self) -> SearchConfig {
        let mut config = SearchConfig::default();
        if let Some(difficulty) = self.difficulty {
            config = config.with_difficulty(difficulty);
        }
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        if let Some(time) = self.time {
            config.time_limit_secs = time;
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

fn summary(report: &SearchReport) -> String {
    let score = match mate_in(report.score) {
        Some(moves) => format!("mate {moves}"),
        None => format!("cp {}", report.score),
    };
    format!(
        "depth {} score {} nodes {} nps {} time {}ms tthit {:.1}% hashfull {} pv {}",
        report.depth,
        score,
        report.nodes,
        report.nps(),
        report.elapsed.as_millis(),
        report.tt_hit_rate * 100.0,
        report.hashfull,
        report.pv_string(),
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let fen = args.fen().unwrap_or_else(|| STARTING_FEN.to_string());
    let pos: Position = fen.parse().with_context(|| format!("could not load position {fen:?}"))?;
    let config = args.config();

    info!(
        %fen,
        depth = config.max_depth,
        time = config.time_limit_secs,
        threads = config.threads,
        "gambit starting"
    );

    let mut searcher = Searcher::new(config).with_tablebase(Arc::new(DeadDrawTablebase));
    let report = searcher.search(&pos);

    match report.best_move {
        Some(mv) => println!("bestmove {mv}"),
        None => println!("bestmove (none)"),
    }
    println!("info {}", summary(&report));
    Ok(())
}
