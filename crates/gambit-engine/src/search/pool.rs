//! Root-parallel search.
//!
//! The root moves are ordered once and dealt out round-robin to workers.
//! Each worker clones the position, builds its own tables and runs a full
//! iterative deepening restricted to its share. Nothing mutable is shared
//! except the stop flag inside [`SearchControl`]; results are merged after
//! every worker has joined.

use std::cmp::Reverse;
use std::thread;

use chess::ChessMove;
use gambit_core::{Position, Tablebase};
use tracing::{debug, trace, warn};

use crate::search::Iteration;
use crate::search::config::SearchConfig;
use crate::search::control::SearchControl;
use crate::search::heuristics::Heuristics;
use crate::search::iterative_deepening;
use crate::search::negamax::{MATE_THRESHOLD, SearchContext, SearchStats, SearchTables};
use crate::search::ordering::order_moves;
use crate::search::tt::TtStats;

/// What one worker brings back.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkerResult {
    pub iteration: Iteration,
    pub stats: SearchStats,
    pub tt: TtStats,
    /// Table fill in per mille.
    pub hashfull: usize,
}

/// Merged outcome of all workers. Counters are summed; `hashfull` is the
/// fullest worker table.
pub(crate) type ParallelOutcome = WorkerResult;

/// Deal `moves` out to at most `workers` shares, preserving their order
/// within each share.
pub(crate) fn split_round_robin(moves: &[ChessMove], workers: usize) -> Vec<Vec<ChessMove>> {
    let n = workers.clamp(1, moves.len().max(1));
    let mut shares = vec![Vec::new(); n];
    for (i, &mv) in moves.iter().enumerate() {
        shares[i % n].push(mv);
    }
    shares.retain(|share| !share.is_empty());
    shares
}

/// Merge priority: a forced win outranks everything, then the deeper
/// completed depth, then the higher score, then the earlier root move.
fn merge_key(it: &Iteration, root_order: &[ChessMove]) -> (bool, u32, i32, Reverse<usize>) {
    let winning = it.score > MATE_THRESHOLD;
    let index = it
        .best_move
        .and_then(|mv| root_order.iter().position(|&m| m == mv))
        .unwrap_or(usize::MAX);
    let depth = if winning { 0 } else { it.depth };
    (winning, depth, it.score, Reverse(index))
}

pub(crate) fn merge(results: Vec<WorkerResult>, root_order: &[ChessMove]) -> ParallelOutcome {
    let mut merged = ParallelOutcome::default();
    let mut best: Option<Iteration> = None;

    for result in results {
        merged.stats += result.stats;
        merged.tt += result.tt;
        merged.hashfull = merged.hashfull.max(result.hashfull);
        if result.iteration.best_move.is_none() {
            continue;
        }
        let better = best.as_ref().is_none_or(|b| {
            merge_key(&result.iteration, root_order) > merge_key(b, root_order)
        });
        if better {
            best = Some(result.iteration);
        }
    }

    merged.iteration = best.unwrap_or_default();
    debug!(
        depth = merged.iteration.depth,
        score = merged.iteration.score,
        nodes = merged.stats.nodes,
        "worker results merged"
    );
    merged
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    id: usize,
    pos: &Position,
    share: &[ChessMove],
    config: &SearchConfig,
    control: &SearchControl,
    tablebase: Option<&dyn Tablebase>,
    tt_mb: usize,
    max_depth: u32,
) -> WorkerResult {
    trace!(worker = id, moves = share.len(), "worker started");
    let mut root = pos.clone();
    let mut tables = SearchTables::new(tt_mb);
    let mut ctx = SearchContext::new(config, control, &mut tables, tablebase).with_root_moves(share);
    let iteration = iterative_deepening(&mut root, &mut ctx, max_depth, |_, _| {});
    let stats = ctx.stats;
    WorkerResult {
        iteration,
        stats,
        tt: tables.tt.stats(),
        hashfull: tables.tt.hashfull(),
    }
}

/// Search `pos` with `config.threads` root-parallel workers.
///
/// The transposition table budget is split evenly between workers.
pub(crate) fn search_root_parallel(
    pos: &Position,
    config: &SearchConfig,
    control: &SearchControl,
    tablebase: Option<&dyn Tablebase>,
    max_depth: u32,
) -> ParallelOutcome {
    let mut root_moves = pos.legal_moves();
    order_moves(pos, &mut root_moves, 0, None, &Heuristics::new());

    let shares = split_round_robin(&root_moves, config.threads);
    let tt_mb = (config.tt_size_mb / shares.len().max(1)).max(1);

    let results: Vec<WorkerResult> = thread::scope(|s| {
        let handles: Vec<_> = shares
            .iter()
            .enumerate()
            .map(|(id, share)| {
                s.spawn(move || {
                    run_worker(id, pos, share, config, control, tablebase, tt_mb, max_depth)
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .filter_map(|(id, handle)| match handle.join() {
                Ok(result) => Some(result),
                Err(_) => {
                    warn!(worker = id, "search worker panicked");
                    None
                }
            })
            .collect()
    });

    merge(results, &root_moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use chess::Square;

    use crate::search::negamax::MATE_SCORE;

    fn mv(from: Square, to: Square) -> ChessMove {
        ChessMove::new(from, to, None)
    }

    fn iteration(best: ChessMove, depth: u32, score: i32) -> WorkerResult {
        WorkerResult {
            iteration: Iteration {
                depth,
                score,
                best_move: Some(best),
                pv: vec![best],
            },
            stats: SearchStats { nodes: 100, ..SearchStats::default() },
            tt: TtStats::default(),
            hashfull: 0,
        }
    }

    #[test]
    fn round_robin_split() {
        let moves: Vec<ChessMove> = Position::default().legal_moves();
        let shares = split_round_robin(&moves, 3);
        assert_eq!(shares.len(), 3);
        assert_eq!(shares.iter().map(Vec::len).sum::<usize>(), moves.len());
        assert_eq!(shares[0][0], moves[0]);
        assert_eq!(shares[1][0], moves[1]);
        assert_eq!(shares[0][1], moves[3]);
    }

    #[test]
    fn never_more_workers_than_moves() {
        let moves = vec![mv(Square::A1, Square::B2), mv(Square::A1, Square::A2)];
        assert_eq!(split_round_robin(&moves, 8).len(), 2);
        assert!(split_round_robin(&[], 4).is_empty());
    }

    #[test]
    fn merge_prefers_depth_then_score_then_order() {
        let a = mv(Square::E2, Square::E4);
        let b = mv(Square::D2, Square::D4);
        let c = mv(Square::G1, Square::F3);
        let order = [a, b, c];

        let merged = merge(vec![iteration(a, 5, 10), iteration(b, 6, -20)], &order);
        assert_eq!(merged.iteration.best_move, Some(b));
        assert_eq!(merged.stats.nodes, 200);

        let merged = merge(vec![iteration(a, 6, 10), iteration(b, 6, 30)], &order);
        assert_eq!(merged.iteration.best_move, Some(b));

        let merged = merge(vec![iteration(c, 6, 30), iteration(b, 6, 30)], &order);
        assert_eq!(merged.iteration.best_move, Some(b));
    }

    #[test]
    fn forced_win_beats_deeper_result() {
        let a = mv(Square::E2, Square::E4);
        let b = mv(Square::D2, Square::D4);
        let merged = merge(vec![iteration(a, 8, 90), iteration(b, 1, MATE_SCORE - 1)], &[a, b]);
        assert_eq!(merged.iteration.best_move, Some(b));
    }

    #[test]
    fn parallel_search_finds_mate() {
        let p: Position = "6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1".parse().unwrap();
        let config = SearchConfig { threads: 3, tt_size_mb: 4, ..SearchConfig::default() };
        let control = SearchControl::new_infinite(Arc::new(AtomicBool::new(false)));
        let outcome = search_root_parallel(&p, &config, &control, None, 3);
        assert_eq!(outcome.iteration.best_move, Some(mv(Square::E1, Square::E8)));
        assert!(outcome.iteration.score > MATE_THRESHOLD);
        assert!(outcome.stats.nodes > 0);
    }
}
