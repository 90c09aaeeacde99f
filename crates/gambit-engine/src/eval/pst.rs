//! Piece-square tables.
//!
//! Tables are laid out rank 1 first (index 0 = A1, 63 = H8) from White's
//! side. Black pieces read the vertically mirrored square. Knights, bishops,
//! rooks and queens share one table across both phases; pawns and the king
//! have distinct endgame halves.

use chess::{Board, Color, Piece, Square};

use crate::eval::score::{S, Score};

#[rustfmt::skip]
const PAWN: [Score; 64] = [
    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0), // 1
    S(5,10),   S(10,10),  S(10,10),  S(-20,10), S(-20,10), S(10,10),  S(10,10),  S(5,10), // 2
    S(5,10),   S(-5,10),  S(-10,10), S(0,10),   S(0,10),   S(-10,10), S(-5,10),  S(5,10), // 3
    S(0,20),   S(0,20),   S(0,20),   S(20,20),  S(20,20),  S(0,20),   S(0,20),   S(0,20), // 4
    S(5,30),   S(5,30),   S(10,30),  S(25,30),  S(25,30),  S(10,30),  S(5,30),   S(5,30), // 5
    S(10,50),  S(10,50),  S(20,50),  S(30,50),  S(30,50),  S(20,50),  S(10,50),  S(10,50), // 6
    S(50,80),  S(50,80),  S(50,80),  S(50,80),  S(50,80),  S(50,80),  S(50,80),  S(50,80), // 7
    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0), // 8
];

#[rustfmt::skip]
const KNIGHT: [Score; 64] = [
    S(-50,-50),S(-40,-40),S(-30,-30),S(-30,-30),S(-30,-30),S(-30,-30),S(-40,-40),S(-50,-50), // 1
    S(-40,-40),S(-20,-20),S(0,0),    S(5,5),    S(5,5),    S(0,0),    S(-20,-20),S(-40,-40), // 2
    S(-30,-30),S(5,5),    S(10,10),  S(15,15),  S(15,15),  S(10,10),  S(5,5),    S(-30,-30), // 3
    S(-30,-30),S(0,0),    S(15,15),  S(20,20),  S(20,20),  S(15,15),  S(0,0),    S(-30,-30), // 4
    S(-30,-30),S(5,5),    S(15,15),  S(20,20),  S(20,20),  S(15,15),  S(5,5),    S(-30,-30), // 5
    S(-30,-30),S(0,0),    S(10,10),  S(15,15),  S(15,15),  S(10,10),  S(0,0),    S(-30,-30), // 6
    S(-40,-40),S(-20,-20),S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-20,-20),S(-40,-40), // 7
    S(-50,-50),S(-40,-40),S(-30,-30),S(-30,-30),S(-30,-30),S(-30,-30),S(-40,-40),S(-50,-50), // 8
];

#[rustfmt::skip]
const BISHOP: [Score; 64] = [
    S(-20,-20),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-20,-20), // 1
    S(-10,-10),S(5,5),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(5,5),    S(-10,-10), // 2
    S(-10,-10),S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(-10,-10), // 3
    S(-10,-10),S(0,0),    S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(0,0),    S(-10,-10), // 4
    S(-10,-10),S(5,5),    S(5,5),    S(10,10),  S(10,10),  S(5,5),    S(5,5),    S(-10,-10), // 5
    S(-10,-10),S(0,0),    S(5,5),    S(10,10),  S(10,10),  S(5,5),    S(0,0),    S(-10,-10), // 6
    S(-10,-10),S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-10,-10), // 7
    S(-20,-20),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-20,-20), // 8
];

#[rustfmt::skip]
const ROOK: [Score; 64] = [
    S(0,0),    S(0,0),    S(0,0),    S(5,5),    S(5,5),    S(0,0),    S(0,0),    S(0,0), // 1
    S(-5,-5),  S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-5,-5), // 2
    S(-5,-5),  S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-5,-5), // 3
    S(-5,-5),  S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-5,-5), // 4
    S(-5,-5),  S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-5,-5), // 5
    S(-5,-5),  S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(-5,-5), // 6
    S(5,5),    S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(10,10),  S(5,5), // 7
    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(0,0), // 8
];

#[rustfmt::skip]
const QUEEN: [Score; 64] = [
    S(-20,-20),S(-10,-10),S(-10,-10),S(-5,-5),  S(-5,-5),  S(-10,-10),S(-10,-10),S(-20,-20), // 1
    S(-10,-10),S(-20,-20),S(-20,-20),S(-20,-20),S(-20,-20),S(-20,-20),S(-20,-20),S(-10,-10), // 2
    S(-10,-10),S(-20,-20),S(-10,-10),S(-10,-10),S(-10,-10),S(-10,-10),S(-20,-20),S(-10,-10), // 3
    S(-5,-5),  S(-10,-10),S(-5,-5),  S(0,0),    S(0,0),    S(-5,-5),  S(-10,-10),S(-5,-5), // 4
    S(0,0),    S(-5,-5),  S(0,0),    S(5,5),    S(5,5),    S(0,0),    S(-5,-5),  S(0,0), // 5
    S(-10,-10),S(-5,-5),  S(0,0),    S(5,5),    S(5,5),    S(0,0),    S(-5,-5),  S(-10,-10), // 6
    S(-10,-10),S(-10,-10),S(-5,-5),  S(0,0),    S(0,0),    S(-5,-5),  S(-10,-10),S(-10,-10), // 7
    S(-20,-20),S(-10,-10),S(-10,-10),S(-5,-5),  S(-5,-5),  S(-10,-10),S(-10,-10),S(-20,-20), // 8
];

#[rustfmt::skip]
const KING: [Score; 64] = [
    S(20,-50), S(30,-30), S(10,-30), S(0,-30),  S(0,-30),  S(10,-30), S(30,-30), S(20,-50), // 1
    S(20,-30), S(20,-30), S(0,0),    S(0,0),    S(0,0),    S(0,0),    S(20,-30), S(20,-30), // 2
    S(-10,-30),S(-20,-10),S(-20,20), S(-20,30), S(-20,30), S(-20,20), S(-20,-10),S(-10,-30), // 3
    S(-20,-30),S(-30,-10),S(-30,30), S(-40,40), S(-40,40), S(-30,30), S(-30,-10),S(-20,-30), // 4
    S(-30,-30),S(-40,-10),S(-40,30), S(-50,40), S(-50,40), S(-40,30), S(-40,-10),S(-30,-30), // 5
    S(-30,-30),S(-40,-10),S(-40,20), S(-50,30), S(-50,30), S(-40,20), S(-40,-10),S(-30,-30), // 6
    S(-30,-30),S(-40,-20),S(-40,-10),S(-50,0),  S(-50,0),  S(-40,-10),S(-40,-20),S(-30,-30), // 7
    S(-30,-50),S(-40,-40),S(-40,-30),S(-50,-20),S(-50,-20),S(-40,-30),S(-40,-40),S(-30,-50), // 8
];

const TABLES: [[Score; 64]; 6] = [PAWN, KNIGHT, BISHOP, ROOK, QUEEN, KING];

/// Table bonus for `piece` of `color` standing on `sq`.
#[inline]
pub fn pst_value(piece: Piece, color: Color, sq: Square) -> Score {
    let idx = match color {
        Color::White => sq.to_index(),
        Color::Black => sq.to_index() ^ 56,
    };
    TABLES[piece.to_index()][idx]
}

/// Sum of table bonuses, White minus Black.
pub fn evaluate_pst(board: &Board) -> Score {
    let mut score = Score::ZERO;
    for sq in *board.combined() {
        if let (Some(piece), Some(color)) = (board.piece_on(sq), board.color_on(sq)) {
            match color {
                Color::White => score += pst_value(piece, color, sq),
                Color::Black => score -= pst_value(piece, color, sq),
            }
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use chess::{Board, Color, Piece, Square};

    use super::{evaluate_pst, pst_value};
    use crate::eval::score::{S, Score};

    #[test]
    fn starting_position_is_balanced() {
        assert_eq!(evaluate_pst(&Board::default()), Score::ZERO);
    }

    #[test]
    fn black_mirrors_white() {
        for piece in chess::ALL_PIECES {
            assert_eq!(
                pst_value(piece, Color::White, Square::E4),
                pst_value(piece, Color::Black, Square::E5),
                "{piece:?}"
            );
        }
    }

    #[test]
    fn central_pawns_are_rewarded() {
        assert_eq!(pst_value(Piece::Pawn, Color::White, Square::E4), S(20, 20));
        assert_eq!(pst_value(Piece::Pawn, Color::White, Square::E2), S(-20, 10));
        assert_eq!(pst_value(Piece::Pawn, Color::White, Square::A7), S(50, 80));
    }

    #[test]
    fn king_prefers_castled_square_in_middlegame() {
        let castled = pst_value(Piece::King, Color::White, Square::G1);
        let exposed = pst_value(Piece::King, Color::White, Square::E4);
        assert!(castled.mg() > exposed.mg());
        assert!(castled.eg() < exposed.eg());
    }

    #[test]
    fn queen_penalised_off_back_rank_early() {
        let home = pst_value(Piece::Queen, Color::White, Square::D1);
        let sortie = pst_value(Piece::Queen, Color::White, Square::D2);
        assert!(home.mg() > sortie.mg());
    }
}
