//! Move ordering and late-move-reduction amounts.

use std::cmp::Reverse;
use std::sync::OnceLock;

use chess::ChessMove;
use gambit_core::Position;

use crate::eval::material::piece_value;
use crate::search::heuristics::{HISTORY_MAX, Heuristics, piece_to, previous_piece_to};
use crate::search::see::{see, see_ge};

// Score bands, highest first. Losing captures still sit above every quiet
// move; quiet moves never exceed QUIET_MAX.
const HASH_MOVE: i32 = 10_000_000;
const CAPTURE_BASE: i32 = 1_000_000;
const WINNING_CAPTURE: i32 = 100_000;
const LOSING_CAPTURE: i32 = -950_000;
const PROMOTION_BASE: i32 = 800_000;
const FIRST_KILLER: i32 = 700_000;
const SECOND_KILLER: i32 = 690_000;
const COUNTER_MOVE: i32 = 680_000;
const HISTORY_RANGE: i32 = 5_000;
const CONTINUATION_RANGE: i32 = 6_000;
const CHECK_BONUS: i32 = 500;
const CASTLING_BONUS: i32 = 300;

/// Map a history value in `[-HISTORY_MAX, HISTORY_MAX]` onto `[0, range]`.
#[inline]
fn scale_history(value: i32, range: i32) -> i32 {
    ((value + HISTORY_MAX) * range / (2 * HISTORY_MAX)).clamp(0, range)
}

/// Ordering score of one move. Higher is searched earlier.
pub fn score_move(
    pos: &Position,
    mv: ChessMove,
    ply: usize,
    hash_move: Option<ChessMove>,
    heuristics: &Heuristics,
) -> i32 {
    let mut score = if hash_move == Some(mv) {
        HASH_MOVE
    } else if let Some(victim) = pos.captured_piece(mv) {
        let attacker = pos.moved_piece(mv).map_or(0, piece_value);
        let mvv_lva = CAPTURE_BASE + 10 * piece_value(victim) - attacker;
        if see_ge(pos, mv, 0) {
            mvv_lva + WINNING_CAPTURE
        } else {
            mvv_lva + LOSING_CAPTURE
        }
    } else if let Some(promotion) = mv.get_promotion() {
        PROMOTION_BASE + piece_value(promotion)
    } else {
        match heuristics.killers.rank(ply, mv) {
            Some(0) => FIRST_KILLER,
            Some(_) => SECOND_KILLER,
            None if is_countermove(pos, mv, heuristics) => COUNTER_MOVE,
            None => quiet_score(pos, mv, heuristics),
        }
    };

    if pos.gives_check(mv) {
        score += CHECK_BONUS;
    }
    if pos.is_castling(mv) {
        score += CASTLING_BONUS;
    }
    score
}

/// Whether `mv` is the recorded refutation of the move that led to `pos`.
pub fn is_countermove(pos: &Position, mv: ChessMove, heuristics: &Heuristics) -> bool {
    pos.last_move()
        .and_then(|prev| heuristics.counters.get(prev))
        .is_some_and(|counter| counter == mv)
}

fn quiet_score(pos: &Position, mv: ChessMove, heuristics: &Heuristics) -> i32 {
    let history = scale_history(heuristics.history.score(mv), HISTORY_RANGE);
    let continuation = previous_piece_to(pos)
        .zip(piece_to(pos, mv))
        .map_or(0, |(prev, cur)| {
            scale_history(heuristics.continuation.score(prev, cur), CONTINUATION_RANGE)
        });
    history + continuation
}

/// Sort `moves` best first. The sort is stable, so equal scores keep
/// generation order.
pub fn order_moves(
    pos: &Position,
    moves: &mut [ChessMove],
    ply: usize,
    hash_move: Option<ChessMove>,
    heuristics: &Heuristics,
) {
    moves.sort_by_cached_key(|&mv| Reverse(score_move(pos, mv, ply, hash_move, heuristics)));
}

/// Noisy moves for quiescence, paired with their exchange value and
/// sorted by it, best first.
pub fn order_noisy(pos: &Position, moves: Vec<ChessMove>) -> Vec<(ChessMove, i32)> {
    let mut scored: Vec<(ChessMove, i32)> = moves.into_iter().map(|mv| (mv, see(pos, mv))).collect();
    scored.sort_by_key(|&(_, value)| Reverse(value));
    scored
}

// ── LMR table ───────────────────────────────────────────────────────────────

const LMR_SIZE: usize = 64;

static LMR_TABLE: OnceLock<[[i32; LMR_SIZE]; LMR_SIZE]> = OnceLock::new();

fn lmr_table() -> &'static [[i32; LMR_SIZE]; LMR_SIZE] {
    LMR_TABLE.get_or_init(|| {
        let mut t = [[0i32; LMR_SIZE]; LMR_SIZE];
        for (depth, row) in t.iter_mut().enumerate().skip(1) {
            for (move_number, cell) in row.iter_mut().enumerate() {
                let r = (depth as f64).ln() * ((move_number + 1) as f64).ln() / 2.5;
                *cell = r.floor() as i32;
            }
        }
        t
    })
}

/// Plies to reduce the `move_number`-th move (0-based) at `depth`:
/// `floor(ln(depth) * ln(move_number + 1) / 2.5)`.
pub fn lmr_reduction(depth: i32, move_number: usize) -> i32 {
    let depth = depth.clamp(0, LMR_SIZE as i32 - 1) as usize;
    lmr_table()[depth][move_number.min(LMR_SIZE - 1)]
}
