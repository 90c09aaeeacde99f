//! Rook placement: open and semi-open files, seventh rank.

use chess::{Board, Color, EMPTY, Piece};

use crate::eval::pawns::relative_rank;
use crate::eval::score::{Score, flat};

const ROOK_OPEN_FILE: Score = flat(20);
const ROOK_SEMI_OPEN_FILE: Score = flat(10);
const ROOK_ON_SEVENTH: Score = flat(20);

fn evaluate_side(board: &Board, color: Color) -> Score {
    let rooks = *board.pieces(Piece::Rook) & *board.color_combined(color);
    let pawns = *board.pieces(Piece::Pawn);
    let own_pawns = pawns & *board.color_combined(color);

    let mut score = Score::ZERO;
    for sq in rooks {
        let file = chess::get_file(sq.get_file());
        if file & pawns == EMPTY {
            score += ROOK_OPEN_FILE;
        } else if file & own_pawns == EMPTY {
            score += ROOK_SEMI_OPEN_FILE;
        }
        if relative_rank(sq, color) == 6 {
            score += ROOK_ON_SEVENTH;
        }
    }
    score
}

/// Rook bonuses, White minus Black.
pub fn evaluate_rooks(board: &Board) -> Score {
    evaluate_side(board, Color::White) - evaluate_side(board, Color::Black)
}
