//! Correction history: a learned adjustment to the static evaluation.
//!
//! After a node is searched, the gap between its search score and its static
//! evaluation is fed back into four small tables keyed by coarse features of
//! the position. Later nodes sharing those features read the blended
//! correction and add it to their static evaluation.
//!
//! Every entry is a pair of values, one per side to move.

use chess::{ChessMove, Color, Piece};
use gambit_core::Position;

/// Bound on a single entry and on the blended read-out.
pub const MAX_CORRECTION: i32 = 2048;

/// Bound on the per-update bonus.
const MAX_BONUS: i32 = 256;

/// Minimum |error| worth learning from.
pub const MIN_ERROR: i32 = 10;

const PAWN_BUCKETS: usize = 16_384;
/// Four piece counts, each clamped to 0..=3.
const COUNT_BUCKETS: usize = 256;
const CONT_BUCKETS: usize = 6 * 64;

/// Per-table update weights in 128ths.
const MINOR_WEIGHT: i32 = 145;
const NON_PAWN_WEIGHT: i32 = 165;
const CONT_WEIGHT: i32 = 137;

/// Per-table read-out weights in 128ths.
const PAWN_BLEND: i32 = 100;
const MINOR_BLEND: i32 = 80;
const NON_PAWN_BLEND: i32 = 100;
const CONT_BLEND: i32 = 70;

type Entry = [i32; 2];

/// Entry update with gravity toward zero: `v += b - v·|b|/512`.
#[inline]
fn update_entry(value: &mut i32, bonus: i32) {
    let v = *value;
    *value = (v + bonus - v * bonus.abs() / 512).clamp(-MAX_CORRECTION, MAX_CORRECTION);
}

#[inline]
fn clamp3(n: u32) -> usize {
    n.min(3) as usize
}

/// Pack four 0..=3 counts into one index.
#[inline]
fn pack_counts(a: u32, b: u32, c: u32, d: u32) -> usize {
    clamp3(a) << 6 | clamp3(b) << 4 | clamp3(c) << 2 | clamp3(d)
}

/// Feature keys of one position, computed once per read or update.
struct Keys {
    side: usize,
    pawn: usize,
    minor: usize,
    non_pawn: [usize; 2],
    cont: Option<usize>,
}

impl Keys {
    fn of(pos: &Position, prev: Option<ChessMove>) -> Self {
        let count = |piece, color| pos.pieces(piece, color).popcnt();
        let non_pawn = |color| {
            pack_counts(
                count(Piece::Queen, color),
                count(Piece::Rook, color),
                count(Piece::Knight, color),
                count(Piece::Bishop, color),
            )
        };

        // The piece now standing on the previous move's destination.
        let cont = prev.and_then(|mv| {
            let to = mv.get_dest();
            pos.piece_at(to)
                .map(|(piece, _)| piece.to_index() * 64 + to.to_index())
        });

        Self {
            side: pos.side_to_move().to_index(),
            pawn: (pos.pawn_key() % PAWN_BUCKETS as u64) as usize,
            minor: pack_counts(
                count(Piece::Knight, Color::White),
                count(Piece::Bishop, Color::White),
                count(Piece::Knight, Color::Black),
                count(Piece::Bishop, Color::Black),
            ),
            non_pawn: [non_pawn(Color::White), non_pawn(Color::Black)],
            cont,
        }
    }
}

/// The four correction tables.
pub struct CorrectionHistory {
    pawn: Vec<Entry>,
    minor: Vec<Entry>,
    non_pawn: Vec<Entry>,
    cont: Vec<Entry>,
}

impl CorrectionHistory {
    pub fn new() -> Self {
        Self {
            pawn: vec![[0; 2]; PAWN_BUCKETS],
            minor: vec![[0; 2]; COUNT_BUCKETS],
            non_pawn: vec![[0; 2]; COUNT_BUCKETS],
            cont: vec![[0; 2]; CONT_BUCKETS],
        }
    }

    /// Centipawn adjustment for `pos`, reached by `prev`.
    pub fn get_correction(&self, pos: &Position, prev: Option<ChessMove>) -> i32 {
        let k = Keys::of(pos, prev);
        let s = k.side;

        let cont = k.cont.map_or(0, |c| self.cont[c][s]);
        let total = PAWN_BLEND * self.pawn[k.pawn][s]
            + MINOR_BLEND * self.minor[k.minor][s]
            + NON_PAWN_BLEND * (self.non_pawn[k.non_pawn[0]][s] + self.non_pawn[k.non_pawn[1]][s])
            + CONT_BLEND * cont;

        (total / 128).clamp(-MAX_CORRECTION, MAX_CORRECTION)
    }

    /// Learn from `error = search score - static eval` observed at `depth`.
    pub fn update(&mut self, pos: &Position, error: i32, prev: Option<ChessMove>, depth: i32) {
        let k = Keys::of(pos, prev);
        let s = k.side;
        let bonus = (error * depth.clamp(0, 8) / 4).clamp(-MAX_BONUS, MAX_BONUS);

        update_entry(&mut self.pawn[k.pawn][s], bonus);
        update_entry(&mut self.minor[k.minor][s], bonus * MINOR_WEIGHT / 128);

        let np_bonus = bonus * NON_PAWN_WEIGHT / 128;
        update_entry(&mut self.non_pawn[k.non_pawn[0]][s], np_bonus);
        update_entry(&mut self.non_pawn[k.non_pawn[1]][s], np_bonus);

        if let Some(c) = k.cont {
            update_entry(&mut self.cont[c][s], bonus * CONT_WEIGHT / 128);
        }
    }

    /// Scale every stored value by `num / den`.
    pub fn apply_gravity(&mut self, num: i32, den: i32) {
        for table in [&mut self.pawn, &mut self.minor, &mut self.non_pawn, &mut self.cont] {
            for v in table.iter_mut().flatten() {
                *v = *v * num / den;
            }
        }
    }

    pub fn clear(&mut self) {
        for table in [&mut self.pawn, &mut self.minor, &mut self.non_pawn, &mut self.cont] {
            table.fill([0; 2]);
        }
    }
}

impl Default for CorrectionHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;

    const MIDDLEGAME: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p3/4P3/2N2N2/PPPP1PPP/R1BQKB1R w KQkq - 4 4";

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    #[test]
    fn fresh_table_reads_zero() {
        let ch = CorrectionHistory::new();
        assert_eq!(ch.get_correction(&Position::default(), None), 0);
    }

    #[test]
    fn positive_error_raises_correction() {
        let mut ch = CorrectionHistory::new();
        let p = pos(MIDDLEGAME);
        ch.update(&p, 200, None, 8);
        // bonus 256: pawn 256, minor 290. Both sides share one non-pawn
        // key here, so that entry takes 330 twice: 330 + 330 - 212 = 448.
        // (100*256 + 80*290 + 100*(448+448)) / 128 = 1081
        assert_eq!(ch.get_correction(&p, None), 1081);
    }

    #[test]
    fn correction_is_per_side_to_move() {
        let mut ch = CorrectionHistory::new();
        let white = pos(MIDDLEGAME);
        let black = pos(&MIDDLEGAME.replace(" w ", " b "));
        ch.update(&white, -300, None, 6);
        assert!(ch.get_correction(&white, None) < 0);
        assert_eq!(ch.get_correction(&black, None), 0);
    }

    #[test]
    fn continuation_key_uses_previous_destination() {
        let mut ch = CorrectionHistory::new();
        let mut p = Position::default();
        let e4 = ChessMove::new(Square::E2, Square::E4, None);
        p.push(e4);
        let without = {
            let mut fresh = CorrectionHistory::new();
            fresh.update(&p, 100, None, 4);
            fresh.get_correction(&p, None)
        };
        ch.update(&p, 100, Some(e4), 4);
        assert!(ch.get_correction(&p, Some(e4)) > without);
    }

    #[test]
    fn entries_stay_bounded() {
        let mut ch = CorrectionHistory::new();
        let p = pos(MIDDLEGAME);
        for _ in 0..500 {
            ch.update(&p, 10_000, None, 20);
        }
        let c = ch.get_correction(&p, None);
        assert!(c > 0 && c <= MAX_CORRECTION);
        assert!(ch.pawn.iter().flatten().all(|v| v.abs() <= MAX_CORRECTION));
    }

    #[test]
    fn gravity_and_clear() {
        let mut ch = CorrectionHistory::new();
        let p = pos(MIDDLEGAME);
        ch.update(&p, 200, None, 8);
        let before = ch.pawn[Keys::of(&p, None).pawn][0];
        ch.apply_gravity(7, 8);
        assert_eq!(ch.pawn[Keys::of(&p, None).pawn][0], before * 7 / 8);
        ch.clear();
        assert_eq!(ch.get_correction(&p, None), 0);
    }

    #[test]
    fn count_keys_saturate() {
        assert_eq!(pack_counts(9, 0, 0, 0), pack_counts(3, 0, 0, 0));
        assert_ne!(pack_counts(1, 2, 0, 0), pack_counts(2, 1, 0, 0));
    }
}
