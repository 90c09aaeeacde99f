//! Static Exchange Evaluation.
//!
//! Plays out every capture on the destination square, each side always
//! recapturing with its least valuable attacker and free to stop when
//! continuing would lose material.

use chess::{ALL_PIECES, BitBoard, ChessMove, Piece, Square};
use gambit_core::Position;

use crate::eval::material::PIECE_VALUE;

/// Exchange values; the king is priced so that losing it is never worth it.
const SEE_VALUE: [i32; 6] = [
    PIECE_VALUE[0],
    PIECE_VALUE[1],
    PIECE_VALUE[2],
    PIECE_VALUE[3],
    PIECE_VALUE[4],
    20_000,
];

/// Longest exchange sequence considered.
const MAX_EXCHANGES: usize = 32;

#[inline]
fn value(piece: Piece) -> i32 {
    SEE_VALUE[piece.to_index()]
}

/// Net material won by the side to move if `mv` starts an exchange.
///
/// Quiet moves score 0 unless the moved piece can be taken for free,
/// in which case the score is negative.
pub fn see(pos: &Position, mv: ChessMove) -> i32 {
    let board = pos.board();
    let src = mv.get_source();
    let dst = mv.get_dest();
    let Some(attacker) = pos.moved_piece(mv) else {
        return 0;
    };

    let mut occupied = *board.combined() ^ BitBoard::from_square(src);
    if pos.is_en_passant(mv) {
        occupied ^= BitBoard::from_square(Square::make_square(src.get_rank(), dst.get_file()));
    }

    let mut gain = [0i32; MAX_EXCHANGES];
    gain[0] = pos.captured_piece(mv).map_or(0, value);
    // A promoting pawn stands on the square as the new piece.
    let mut on_square = mv.get_promotion().map_or(value(attacker), value);

    let mut side = !board.side_to_move();
    let mut depth = 0;

    while depth + 1 < MAX_EXCHANGES {
        let attackers = pos.attackers_with(occupied, dst) & *board.color_combined(side);
        let Some((sq, piece)) = least_valuable(board, attackers) else {
            break;
        };

        depth += 1;
        gain[depth] = on_square - gain[depth - 1];
        on_square = value(piece);
        occupied ^= BitBoard::from_square(sq);
        side = !side;
    }

    // Each side keeps capturing only while it pays.
    while depth > 0 {
        depth -= 1;
        gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
    }

    gain[0]
}

/// Whether `see(pos, mv) >= threshold`.
pub fn see_ge(pos: &Position, mv: ChessMove, threshold: i32) -> bool {
    see(pos, mv) >= threshold
}

fn least_valuable(board: &chess::Board, attackers: BitBoard) -> Option<(Square, Piece)> {
    ALL_PIECES.into_iter().find_map(|piece| {
        let candidates = attackers & *board.pieces(piece);
        candidates.into_iter().next().map(|sq| (sq, piece))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn see_of(fen: &str, from: Square, to: Square) -> i32 {
        let pos: Position = fen.parse().unwrap();
        let mv = ChessMove::new(from, to, None);
        assert!(pos.is_legal(mv), "{mv} not legal in {fen}");
        see(&pos, mv)
    }

    #[test]
    fn pawn_takes_undefended_knight() {
        assert_eq!(see_of("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1", Square::E4, Square::D5), 320);
    }

    #[test]
    fn pawn_takes_defended_knight() {
        // PxN, pxP
        assert_eq!(see_of("4k3/8/4p3/3n4/4P3/8/8/4K3 w - - 0 1", Square::E4, Square::D5), 220);
    }

    #[test]
    fn queen_takes_defended_pawn_loses() {
        assert_eq!(see_of("4k3/8/3p4/2p5/8/4Q3/8/4K3 w - - 0 1", Square::E3, Square::C5), -800);
    }

    #[test]
    fn xray_rook_behind_rook() {
        // RxR on d5 backed by the d1 rook; black recaptures with its rook
        // from d8, then white's second rook takes back.
        assert_eq!(
            see_of("3rk3/8/8/3r4/8/8/3R4/3RK3 w - - 0 1", Square::D2, Square::D5),
            500
        );
    }

    #[test]
    fn en_passant_wins_a_pawn() {
        assert_eq!(see_of("4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1", Square::D5, Square::E6), 100);
    }

    #[test]
    fn quiet_move_to_attacked_square_is_negative() {
        // Knight steps onto a square a pawn covers.
        assert_eq!(see_of("4k3/8/2p5/8/4N3/8/8/4K3 w - - 0 1", Square::E4, Square::D6), 0);
        assert_eq!(see_of("4k3/4p3/8/8/4N3/8/8/4K3 w - - 0 1", Square::E4, Square::D6), -320);
    }

    #[test]
    fn threshold() {
        let pos: Position = "4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        let mv = ChessMove::new(Square::E4, Square::D5, None);
        assert!(see_ge(&pos, mv, 0));
        assert!(see_ge(&pos, mv, 300));
        assert!(!see_ge(&pos, mv, 400));
    }
}
