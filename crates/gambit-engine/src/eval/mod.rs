//! Static evaluation.
//!
//! Every term reports a packed [`Score`](score::Score) from White's side; the
//! sum is tapered by game phase and finally flipped to the side to move.

pub mod king_safety;
pub mod material;
pub mod mobility;
pub mod opening;
pub mod pawns;
pub mod phase;
pub mod pst;
pub mod rooks;
pub mod score;

use chess::Color;
use gambit_core::{MAX_TABLEBASE_MEN, Position, Tablebase, Wdl};

use self::score::Score;

/// Magnitude returned for a tablebase win or loss.
pub const TABLEBASE_SCORE: i32 = 10_000;

/// Evaluate `pos` in centipawns from the side to move's perspective.
///
/// A tablebase, when given, is consulted first for positions with at most
/// [`MAX_TABLEBASE_MEN`] pieces and no castling rights; a definite answer
/// short-circuits the rest. Never mutates the position.
pub fn evaluate(pos: &Position, tablebase: Option<&dyn Tablebase>) -> i32 {
    let probe = tablebase
        .filter(|_| pos.piece_count() <= MAX_TABLEBASE_MEN && !pos.has_castling_rights())
        .and_then(|tb| tb.probe(pos));
    if let Some(wdl) = probe {
        return match wdl {
            Wdl::Win => TABLEBASE_SCORE,
            Wdl::Draw => 0,
            Wdl::Loss => -TABLEBASE_SCORE,
        };
    }

    let white = evaluate_white(pos);
    match pos.side_to_move() {
        Color::White => white,
        Color::Black => -white,
    }
}

/// Hand-crafted evaluation from White's perspective, without tablebase.
pub fn evaluate_white(pos: &Position) -> i32 {
    let board = pos.board();
    let phase = phase::game_phase(board);

    let mut total = Score::ZERO;
    total += material::material(board);
    total += pst::evaluate_pst(board);
    total += mobility::evaluate_mobility(board);
    total += king_safety::evaluate_king_safety(pos);
    total += pawns::evaluate_pawns(board);
    total += rooks::evaluate_rooks(board);
    total += opening::evaluate_opening(pos);

    total.taper(phase)
}

#[cfg(test)]
mod tests {
    use gambit_core::{DeadDrawTablebase, Position, Tablebase, Wdl};

    use super::{TABLEBASE_SCORE, evaluate};

    struct AlwaysWin;

    impl Tablebase for AlwaysWin {
        fn probe(&self, _: &Position) -> Option<Wdl> {
            Some(Wdl::Win)
        }
    }

    #[test]
    fn starting_position_is_zero() {
        assert_eq!(evaluate(&Position::default(), None), 0);
    }

    #[test]
    fn side_to_move_flips_sign() {
        let w: Position = "4k3/8/8/8/8/8/8/3QK3 w - - 0 20".parse().unwrap();
        let b: Position = "4k3/8/8/8/8/8/8/3QK3 b - - 0 20".parse().unwrap();
        let white_view = evaluate(&w, None);
        assert!(white_view > 800);
        assert_eq!(evaluate(&b, None), -white_view);
    }

    #[test]
    fn tablebase_short_circuits_small_positions() {
        let pos: Position = "4k3/8/8/8/8/8/8/3QK3 w - - 0 20".parse().unwrap();
        assert_eq!(evaluate(&pos, Some(&AlwaysWin)), TABLEBASE_SCORE);

        let bare: Position = "4k3/8/8/8/8/8/8/4K3 w - - 0 20".parse().unwrap();
        assert_eq!(evaluate(&bare, Some(&DeadDrawTablebase)), 0);
    }

    #[test]
    fn tablebase_skipped_with_castling_rights() {
        let pos: Position = "4k3/8/8/8/8/8/8/4K2R w K - 0 20".parse().unwrap();
        assert_ne!(evaluate(&pos, Some(&AlwaysWin)), TABLEBASE_SCORE);
    }

    #[test]
    fn evaluation_does_not_mutate() {
        let pos: Position = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4"
            .parse()
            .unwrap();
        let key = pos.key();
        let first = evaluate(&pos, None);
        assert_eq!(evaluate(&pos.clone(), None), first);
        assert_eq!(pos.key(), key);
    }
}
