//! King safety: pawn shield and attackers of the king square.

use chess::{BitBoard, Color, EMPTY, File, Piece, Rank, Square};
use gambit_core::Position;

use crate::eval::score::{Score, flat};

const SHIELD_PAWN: Score = flat(10);
const KING_ATTACKER: Score = flat(-20);

/// Own pawns on the king's file or an adjacent file, one or two ranks in
/// front of the king.
fn shield_pawns(pos: &Position, king: Square, color: Color) -> u32 {
    let own_pawns = pos.pieces(Piece::Pawn, color);
    let file = king.get_file().to_index() as i32;
    let rank = king.get_rank().to_index() as i32;
    let forward = match color {
        Color::White => 1,
        Color::Black => -1,
    };

    let mut count = 0;
    for df in -1..=1 {
        for step in 1..=2 {
            let (f, r) = (file + df, rank + forward * step);
            if !(0..8).contains(&f) || !(0..8).contains(&r) {
                continue;
            }
            let sq = Square::make_square(Rank::from_index(r as usize), File::from_index(f as usize));
            if own_pawns & BitBoard::from_square(sq) != EMPTY {
                count += 1;
            }
        }
    }
    count
}

fn evaluate_side(pos: &Position, color: Color) -> Score {
    let king = pos.board().king_square(color);
    let attackers = pos.attackers(!color, king).popcnt();
    SHIELD_PAWN * shield_pawns(pos, king, color) as i16 + KING_ATTACKER * attackers as i16
}

/// King safety, White minus Black.
pub fn evaluate_king_safety(pos: &Position) -> Score {
    evaluate_side(pos, Color::White) - evaluate_side(pos, Color::Black)
}
