//! Zobrist keys for position fingerprints.
//!
//! The key table is an ordinary value: build it once (normally with
//! [`Zobrist::default`]) and hand it to every [`Position`](crate::Position)
//! that should produce comparable keys.

use std::fmt;

use chess::{ALL_PIECES, Board, Color, Piece, Square};

/// Seed used by [`Zobrist::default`].
pub const DEFAULT_SEED: u64 = 0x5a4f_4252_4953_5421; // "ZOBRIST!"

/// Immutable table of random keys for hashing positions.
///
/// Layout:
/// - 12 × 64 piece-square keys, indexed by `[color * 6 + piece][square]`
/// - one key XORed in when Black is to move
/// - 16 castling keys, indexed by `white_rights | black_rights << 2`
/// - 8 en passant keys, indexed by file
#[derive(Clone, PartialEq, Eq)]
pub struct Zobrist {
    piece_square: [[u64; 64]; 12],
    side_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

/// Xorshift64 step. A zero state is a fixed point, so callers never pass zero.
const fn xorshift64(mut state: u64) -> u64 {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

impl Zobrist {
    /// Generate every key from `seed`.
    ///
    /// The same seed always yields the same table. A zero seed is replaced
    /// by [`DEFAULT_SEED`].
    pub const fn new(seed: u64) -> Self {
        let mut state = if seed == 0 { DEFAULT_SEED } else { seed };

        let mut piece_square = [[0u64; 64]; 12];
        let mut piece = 0;
        while piece < 12 {
            let mut sq = 0;
            while sq < 64 {
                state = xorshift64(state);
                piece_square[piece][sq] = state;
                sq += 1;
            }
            piece += 1;
        }

        state = xorshift64(state);
        let side_to_move = state;

        let mut castling = [0u64; 16];
        let mut idx = 0;
        while idx < 16 {
            state = xorshift64(state);
            castling[idx] = state;
            idx += 1;
        }

        let mut en_passant_file = [0u64; 8];
        let mut file = 0;
        while file < 8 {
            state = xorshift64(state);
            en_passant_file[file] = state;
            file += 1;
        }

        Self {
            piece_square,
            side_to_move,
            castling,
            en_passant_file,
        }
    }

    /// Key for `piece` of `color` standing on `sq`.
    #[inline]
    pub fn piece(&self, piece: Piece, color: Color, sq: Square) -> u64 {
        self.piece_square[color.to_index() * 6 + piece.to_index()][sq.to_index()]
    }

    /// Key for whatever occupies `sq` on `board`, or 0 for an empty square.
    #[inline]
    pub fn square(&self, board: &Board, sq: Square) -> u64 {
        match (board.piece_on(sq), board.color_on(sq)) {
            (Some(piece), Some(color)) => self.piece(piece, color, sq),
            _ => 0,
        }
    }

    /// Key XORed in when Black is to move.
    #[inline]
    pub fn side_to_move(&self) -> u64 {
        self.side_to_move
    }

    /// Key for the combined castling rights of `board`.
    #[inline]
    pub fn castling(&self, board: &Board) -> u64 {
        let white = board.castle_rights(Color::White).to_index();
        let black = board.castle_rights(Color::Black).to_index();
        self.castling[white | (black << 2)]
    }

    /// Key for the en passant file of `board`, or 0 when there is none.
    #[inline]
    pub fn en_passant(&self, board: &Board) -> u64 {
        board
            .en_passant()
            .map_or(0, |sq| self.en_passant_file[sq.get_file().to_index()])
    }

    /// Compute the full key of `board` from scratch.
    pub fn hash(&self, board: &Board) -> u64 {
        let mut hash = 0u64;

        for color in [Color::White, Color::Black] {
            let side = *board.color_combined(color);
            for piece in ALL_PIECES {
                for sq in *board.pieces(piece) & side {
                    hash ^= self.piece(piece, color, sq);
                }
            }
        }

        if board.side_to_move() == Color::Black {
            hash ^= self.side_to_move;
        }
        hash ^= self.castling(board);
        hash ^= self.en_passant(board);

        hash
    }

    /// Signature of the pawn placement only (both colors).
    pub fn pawn_hash(&self, board: &Board) -> u64 {
        let pawns = *board.pieces(Piece::Pawn);
        let mut hash = 0u64;
        for color in [Color::White, Color::Black] {
            for sq in pawns & *board.color_combined(color) {
                hash ^= self.piece(Piece::Pawn, color, sq);
            }
        }
        hash
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl fmt::Debug for Zobrist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zobrist")
            .field("side_to_move", &format_args!("{:#018x}", self.side_to_move))
            .finish_non_exhaustive()
    }
}
