//! Pawn structure: isolated, doubled and passed pawns.
//!
//! Scores are from White's perspective (positive = White advantage).

use chess::{BitBoard, Board, Color, EMPTY, Piece, Square};

use crate::eval::score::{Score, flat};

// ── Masks ───────────────────────────────────────────────────────────────────

const FILE_A: u64 = 0x0101_0101_0101_0101;

const fn file_bits(file: usize) -> u64 {
    FILE_A << file
}

/// Files either side of each file index.
const ADJACENT_FILES: [u64; 8] = {
    let mut table = [0u64; 8];
    let mut f = 0;
    while f < 8 {
        if f > 0 {
            table[f] |= file_bits(f - 1);
        }
        if f < 7 {
            table[f] |= file_bits(f + 1);
        }
        f += 1;
    }
    table
};

/// `[color][square]`: squares strictly ahead of the pawn on its own and the
/// adjacent files. Empty of enemy pawns means the pawn is passed.
const PASSED_SPAN: [[u64; 64]; 2] = {
    let mut table = [[0u64; 64]; 2];
    let mut sq = 0;
    while sq < 64 {
        let rank = sq / 8;
        let file = sq % 8;
        let span = file_bits(file) | ADJACENT_FILES[file];

        let mut ahead_white = 0u64;
        let mut r = rank + 1;
        while r < 8 {
            ahead_white |= 0xFF << (r * 8);
            r += 1;
        }
        let mut ahead_black = 0u64;
        let mut r = 0;
        while r < rank {
            ahead_black |= 0xFF << (r * 8);
            r += 1;
        }

        table[0][sq] = span & ahead_white;
        table[1][sq] = span & ahead_black;
        sq += 1;
    }
    table
};

// ── Weights ─────────────────────────────────────────────────────────────────

const ISOLATED_PAWN: Score = flat(-15);

/// Charged to every pawn on a file holding more than one friendly pawn.
const DOUBLED_PAWN: Score = flat(-10);

const PASSED_PAWN_BASE: i16 = 20;
const PASSED_PAWN_PER_RANK: i16 = 10;

/// Rank of `sq` counted from `color`'s own back rank (0..=7).
#[inline]
pub(crate) fn relative_rank(sq: Square, color: Color) -> usize {
    let rank = sq.get_rank().to_index();
    match color {
        Color::White => rank,
        Color::Black => 7 - rank,
    }
}

/// Whether a `color` pawn on `sq` has no enemy pawn ahead of it on its own
/// or an adjacent file.
pub fn is_passed(sq: Square, color: Color, enemy_pawns: BitBoard) -> bool {
    BitBoard(PASSED_SPAN[color.to_index()][sq.to_index()]) & enemy_pawns == EMPTY
}

/// Evaluate pawn structure from White's perspective.
pub fn evaluate_pawns(board: &Board) -> Score {
    let pawns = *board.pieces(Piece::Pawn);
    let white = pawns & *board.color_combined(Color::White);
    let black = pawns & *board.color_combined(Color::Black);

    evaluate_side(white, black, Color::White) - evaluate_side(black, white, Color::Black)
}

fn evaluate_side(own: BitBoard, enemy: BitBoard, color: Color) -> Score {
    let mut score = Score::ZERO;

    for sq in own {
        let file = sq.get_file().to_index();

        if BitBoard(ADJACENT_FILES[file]) & own == EMPTY {
            score += ISOLATED_PAWN;
        }
        if (BitBoard(file_bits(file)) & own).popcnt() > 1 {
            score += DOUBLED_PAWN;
        }
        if is_passed(sq, color, enemy) {
            let bonus = PASSED_PAWN_BASE + PASSED_PAWN_PER_RANK * relative_rank(sq, color) as i16;
            score += flat(bonus);
        }
    }

    score
}
