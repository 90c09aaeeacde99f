//! Game phase from remaining non-pawn material.

use chess::{Board, Piece};

/// Material weight of a full starting set: 4 minors ×1, 4 rooks ×2, 2 queens ×4.
pub const MAX_PHASE_MATERIAL: i32 = 24;

/// Phase of the starting position. Pure pawn endings are 0.
pub const PHASE_SCALE: i32 = 256;

/// Game phase in `0..=256`.
///
/// Knights and bishops weigh 1, rooks 2, queens 4. The material sum is
/// clamped to 24 so promotions cannot push the phase past the opening.
pub fn game_phase(board: &Board) -> i32 {
    let count = |piece| board.pieces(piece).popcnt() as i32;
    let material = count(Piece::Knight) + count(Piece::Bishop) + 2 * count(Piece::Rook) + 4 * count(Piece::Queen);
    material.min(MAX_PHASE_MATERIAL) * PHASE_SCALE / MAX_PHASE_MATERIAL
}
