//! Mobility: difference in legal move counts.

use chess::{Board, Color, MoveGen};

use crate::eval::score::{Score, flat};

const MOBILITY_PER_MOVE: i16 = 1;

/// Legal-move count of White minus that of Black.
///
/// The side not to move is counted by handing it the turn. When the side to
/// move is in check the turn cannot be passed and the term is zero.
pub fn evaluate_mobility(board: &Board) -> Score {
    let Some(passed) = board.null_move() else {
        return Score::ZERO;
    };

    let to_move = MoveGen::new_legal(board).len() as i16;
    let other = MoveGen::new_legal(&passed).len() as i16;
    let diff = match board.side_to_move() {
        Color::White => to_move - other,
        Color::Black => other - to_move,
    };
    flat(diff * MOBILITY_PER_MOVE)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chess::Board;

    use super::evaluate_mobility;
    use crate::eval::score::{Score, flat};

    #[test]
    fn starting_position_is_zero() {
        assert_eq!(evaluate_mobility(&Board::default()), Score::ZERO);
    }

    #[test]
    fn extra_queen_adds_mobility() {
        // Queen on d1 with kings only: 14 queen moves on top of king moves.
        let with_queen = Board::from_str("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        assert!(evaluate_mobility(&with_queen).mg() > 10);
    }

    #[test]
    fn side_to_move_does_not_matter() {
        let w = Board::from_str("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let b = Board::from_str("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
        assert_eq!(evaluate_mobility(&w), evaluate_mobility(&b));
    }

    #[test]
    fn in_check_is_zero() {
        let board = Board::from_str("4r1k1/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(evaluate_mobility(&board), flat(0));
    }
}
