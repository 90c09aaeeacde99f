//! Opening principles, applied only during the first moves of the game:
//! central pawns and control, minor piece development, castling.

use chess::{CastleRights, Color, Piece, Square};
use gambit_core::Position;

use crate::eval::score::{Score, flat};

/// Last fullmove number at which the opening terms apply.
pub const OPENING_LAST_MOVE: u32 = 15;

const CENTER: [Square; 4] = [Square::E4, Square::D4, Square::E5, Square::D5];
const CENTER_PAWN: i16 = 20;
const CENTER_CONTROL: i16 = 5;
const CENTER_WEIGHT: i16 = 2;

const DEVELOPED_MINOR: i16 = 15;
const EARLY_QUEEN: i16 = -20;
const DEVELOPMENT_WEIGHT: i16 = 2;

const CASTLING_RIGHTS: i16 = 20;
const CASTLED_KING: i16 = 30;

#[inline]
fn sign(color: Color) -> i16 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Central pawns plus attacker count difference on d4/e4/d5/e5.
fn center(pos: &Position) -> i16 {
    let mut score = 0;
    for sq in CENTER {
        if let Some((Piece::Pawn, color)) = pos.piece_at(sq) {
            score += CENTER_PAWN * sign(color);
        }
        let white = pos.attackers(Color::White, sq).popcnt() as i16;
        let black = pos.attackers(Color::Black, sq).popcnt() as i16;
        score += (white - black) * CENTER_CONTROL;
    }
    score
}

fn development_side(pos: &Position, color: Color) -> i16 {
    let (knights_home, bishops_home, queen_home) = match color {
        Color::White => ([Square::B1, Square::G1], [Square::C1, Square::F1], Square::D1),
        Color::Black => ([Square::B8, Square::G8], [Square::C8, Square::F8], Square::D8),
    };

    let mut score = 0;
    for sq in pos.pieces(Piece::Knight, color) {
        if !knights_home.contains(&sq) {
            score += DEVELOPED_MINOR;
        }
    }
    for sq in pos.pieces(Piece::Bishop, color) {
        if !bishops_home.contains(&sq) {
            score += DEVELOPED_MINOR;
        }
    }
    for sq in pos.pieces(Piece::Queen, color) {
        if sq != queen_home {
            score += EARLY_QUEEN;
        }
    }
    score
}

fn castling_side(pos: &Position, color: Color) -> i16 {
    let board = pos.board();
    let mut score = 0;
    if board.castle_rights(color) != CastleRights::NoRights {
        score += CASTLING_RIGHTS;
    }
    let castled = match color {
        Color::White => [Square::G1, Square::C1],
        Color::Black => [Square::G8, Square::C8],
    };
    if castled.contains(&board.king_square(color)) {
        score += CASTLED_KING;
    }
    score
}

/// Opening terms from White's perspective, zero after move
/// [`OPENING_LAST_MOVE`].
pub fn evaluate_opening(pos: &Position) -> Score {
    if pos.fullmove_number() > OPENING_LAST_MOVE {
        return Score::ZERO;
    }

    let development = development_side(pos, Color::White) - development_side(pos, Color::Black);
    let castling = castling_side(pos, Color::White) - castling_side(pos, Color::Black);

    flat(center(pos) * CENTER_WEIGHT + development * DEVELOPMENT_WEIGHT + castling)
}
