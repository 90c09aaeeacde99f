//! Search: iterative deepening over the negamax core, sessions and reports.

pub mod config;
pub mod control;
pub mod correction;
pub mod heuristics;
pub mod negamax;
pub mod ordering;
pub mod pool;
pub mod see;
pub mod tt;

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chess::ChessMove;
use gambit_core::{OpeningBook, Position, Tablebase};
use tracing::{debug, info};

use crate::eval::evaluate;
use config::SearchConfig;
use control::SearchControl;
use negamax::{MATE_SCORE, MAX_PLY, SearchContext, SearchStats, SearchTables, aspiration_search, is_mate_score};

/// Best line after one completed iterative-deepening depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Iteration {
    pub depth: u32,
    pub score: i32,
    pub best_move: Option<ChessMove>,
    pub pv: Vec<ChessMove>,
}

/// Outcome of one [`Searcher::search`] call.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// `None` only when the side to move has no legal move.
    pub best_move: Option<ChessMove>,
    /// Centipawns from the side to move's point of view.
    pub score: i32,
    /// Deepest completed iteration; 0 for book moves and forced replies.
    pub depth: u32,
    pub nodes: u64,
    pub pv: Vec<ChessMove>,
    pub tt_hit_rate: f64,
    /// Transposition table fill in per mille.
    pub hashfull: usize,
    pub elapsed: Duration,
    pub stats: SearchStats,
    pub from_book: bool,
}

impl SearchReport {
    fn immediate(best_move: Option<ChessMove>, score: i32, elapsed: Duration) -> Self {
        Self {
            best_move,
            score,
            depth: 0,
            nodes: 0,
            pv: best_move.into_iter().collect(),
            tt_hit_rate: 0.0,
            hashfull: 0,
            elapsed,
            stats: SearchStats::default(),
            from_book: false,
        }
    }

    /// Nodes per second.
    pub fn nps(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { (self.nodes as f64 / secs) as u64 } else { 0 }
    }

    /// The principal variation in UCI notation.
    pub fn pv_string(&self) -> String {
        format_pv(&self.pv)
    }
}

fn format_pv(pv: &[ChessMove]) -> String {
    let mut out = String::new();
    for (i, mv) in pv.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{mv}");
    }
    out
}

/// Run iterative deepening from depth 1 to `max_depth` on `ctx`.
///
/// An iteration interrupted by the stop flag is discarded, so the result
/// always describes the deepest fully completed depth. Deepening stops early
/// once a mate score is found or the soft time limit has passed.
pub(crate) fn iterative_deepening<F>(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    max_depth: u32,
    mut on_iter: F,
) -> Iteration
where
    F: FnMut(&Iteration, &SearchContext<'_>),
{
    let mut completed = Iteration::default();
    let mut prev_score = 0;

    for depth in 1..=max_depth.min(MAX_PLY as u32 - 1) {
        let out_of_time = if depth == 1 {
            ctx.control.is_stopped()
        } else {
            ctx.control.should_stop_iterating()
        };
        if out_of_time {
            break;
        }

        let score = aspiration_search(pos, ctx, depth as i32, prev_score);
        if ctx.control.is_stopped() {
            break;
        }

        let pv = ctx.pv.root_pv();
        let Some(&best) = pv.first() else {
            break;
        };
        completed = Iteration {
            depth,
            score,
            best_move: Some(best),
            pv,
        };
        prev_score = score;
        on_iter(&completed, ctx);

        if ctx.config.correction_history && depth % 3 == 0 {
            ctx.tables.correction.apply_gravity(7, 8);
        }
        if is_mate_score(score) {
            break;
        }
    }

    completed
}

/// A search session: configuration plus the tables that may persist
/// between searches.
pub struct Searcher {
    config: SearchConfig,
    tables: SearchTables,
    book: Option<Arc<dyn OpeningBook>>,
    tablebase: Option<Arc<dyn Tablebase>>,
    stopped: Arc<AtomicBool>,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        let tables = SearchTables::new(config.tt_size_mb);
        Self {
            config,
            tables,
            book: None,
            tablebase: None,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Consult `book` before every search.
    pub fn with_book(mut self, book: Arc<dyn OpeningBook>) -> Self {
        self.book = Some(book);
        self
    }

    /// Let the evaluation consult `tablebase` in small endgames.
    pub fn with_tablebase(mut self, tablebase: Arc<dyn Tablebase>) -> Self {
        self.tablebase = Some(tablebase);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Flag that stops the running search when raised from another thread.
    /// It is lowered again when the next search starts.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    /// Reset every table.
    pub fn clear(&mut self) {
        self.tables.clear();
        debug!("search tables cleared");
    }

    /// Search with the configured depth and time limit.
    pub fn search(&mut self, pos: &Position) -> SearchReport {
        let (depth, secs) = (self.config.max_depth, self.config.time_limit_secs);
        self.search_with(pos, depth, secs, |_| {})
    }

    /// Best move only, under explicit limits.
    pub fn get_best_move(
        &mut self,
        pos: &Position,
        max_depth: u32,
        time_limit_secs: f64,
    ) -> Option<ChessMove> {
        self.search_with(pos, max_depth, time_limit_secs, |_| {}).best_move
    }

    /// Search under explicit limits, calling `on_iter` after every completed
    /// depth. With more than one thread `on_iter` sees only the merged result.
    pub fn search_with<F>(
        &mut self,
        pos: &Position,
        max_depth: u32,
        time_limit_secs: f64,
        mut on_iter: F,
    ) -> SearchReport
    where
        F: FnMut(&Iteration),
    {
        let start = Instant::now();
        self.stopped.store(false, Ordering::Release);

        let legal = pos.legal_moves();
        let Some(&first_legal) = legal.first() else {
            let score = if pos.in_check() { -MATE_SCORE } else { 0 };
            return SearchReport::immediate(None, score, start.elapsed());
        };

        let tablebase = self.tablebase.as_deref();

        let book_move = self
            .book
            .as_ref()
            .and_then(|book| book.lookup(pos))
            .filter(|&mv| pos.is_legal(mv));
        if let Some(mv) = book_move {
            debug!(%mv, "book move");
            let mut report = SearchReport::immediate(Some(mv), 0, start.elapsed());
            report.from_book = true;
            return report;
        }

        if legal.len() == 1 {
            debug!(mv = %first_legal, "single legal move");
            let score = evaluate(pos, tablebase);
            return SearchReport::immediate(Some(first_legal), score, start.elapsed());
        }

        if !self.config.persist_tables {
            self.tables.clear();
            debug!("search tables cleared");
        }
        self.tables.tt.new_search();

        let control = SearchControl::from_secs(Arc::clone(&self.stopped), time_limit_secs);
        let max_depth = max_depth.max(1);

        let (outcome, stats, tt_hit_rate, hashfull) = if self.config.threads > 1 {
            let merged = pool::search_root_parallel(pos, &self.config, &control, tablebase, max_depth);
            on_iter(&merged.iteration);
            (merged.iteration, merged.stats, merged.tt.hit_rate(), merged.hashfull)
        } else {
            let mut root = pos.clone();
            let mut ctx = SearchContext::new(&self.config, &control, &mut self.tables, tablebase);
            let outcome = iterative_deepening(&mut root, &mut ctx, max_depth, |it, ctx| {
                info!(
                    depth = it.depth,
                    score = it.score,
                    nodes = ctx.stats.nodes,
                    tt_hit = %format!("{:.1}%", ctx.tables.tt.hit_rate() * 100.0),
                    hashfull = ctx.tables.tt.hashfull(),
                    elapsed_ms = ctx.control.elapsed().as_millis() as u64,
                    pv = %format_pv(&it.pv),
                    "depth complete"
                );
                on_iter(it);
            });
            (outcome, ctx.stats, ctx.tables.tt.hit_rate(), ctx.tables.tt.hashfull())
        };

        let best_move = outcome.best_move.unwrap_or(first_legal);
        let pv = if outcome.pv.is_empty() { vec![best_move] } else { outcome.pv };

        SearchReport {
            best_move: Some(best_move),
            score: outcome.score,
            depth: outcome.depth,
            nodes: stats.nodes,
            pv,
            tt_hit_rate,
            hashfull,
            elapsed: start.elapsed(),
            stats,
            from_book: false,
        }
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("config", &self.config)
            .field("tt_capacity", &self.tables.tt.capacity())
            .field("book", &self.book.is_some())
            .field("tablebase", &self.tablebase.is_some())
            .finish()
    }
}

/// Best move for `pos` from a fresh default session.
///
/// `time_limit_secs <= 0` or non-finite searches to `max_depth` without a
/// clock. `None` only when there is no legal move.
pub fn get_best_move(pos: &Position, max_depth: u32, time_limit_secs: f64) -> Option<ChessMove> {
    Searcher::default().get_best_move(pos, max_depth, time_limit_secs)
}
