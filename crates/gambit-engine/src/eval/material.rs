//! Material balance and the bishop pair.
//!
//! Scores are from White's perspective (positive = White ahead).

use chess::{Board, Color, Piece};

use crate::eval::score::{Score, flat};

/// Centipawn value of each piece, indexed by `Piece::to_index()`.
/// The king is 0 because both sides always have one.
pub const PIECE_VALUE: [i32; 6] = [100, 320, 330, 500, 900, 0];

const BISHOP_PAIR_BONUS: Score = flat(30);

/// Centipawn value of `piece`.
#[inline]
pub fn piece_value(piece: Piece) -> i32 {
    PIECE_VALUE[piece.to_index()]
}

/// Material difference plus a bonus for each side owning two or more bishops.
pub fn material(board: &Board) -> Score {
    let mut score = Score::ZERO;
    let white = *board.color_combined(Color::White);
    let black = *board.color_combined(Color::Black);

    for piece in chess::ALL_PIECES {
        let bb = *board.pieces(piece);
        let diff = (bb & white).popcnt() as i16 - (bb & black).popcnt() as i16;
        score += flat(PIECE_VALUE[piece.to_index()] as i16) * diff;
    }

    let bishops = *board.pieces(Piece::Bishop);
    if (bishops & white).popcnt() >= 2 {
        score += BISHOP_PAIR_BONUS;
    }
    if (bishops & black).popcnt() >= 2 {
        score -= BISHOP_PAIR_BONUS;
    }

    score
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chess::Board;

    use super::material;
    use crate::eval::score::{Score, flat};

    fn material_of(fen: &str) -> Score {
        material(&Board::from_str(fen).unwrap())
    }

    #[test]
    fn starting_position_is_zero() {
        assert_eq!(material(&Board::default()), Score::ZERO);
    }

    #[test]
    fn missing_black_queen() {
        let score = material_of("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(score, flat(900));
    }

    #[test]
    fn black_ahead_is_negative() {
        let score = material_of("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/1NBQKBNR w Kkq - 0 1");
        assert_eq!(score, flat(-500));
    }

    #[test]
    fn bishop_pair_counts_once() {
        // Black lost both bishops: White is up two bishops plus the pair bonus.
        let score = material_of("rn1qk1nr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(score, flat(2 * 330 + 30));
    }
}
