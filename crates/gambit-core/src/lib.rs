//! Rules-facing core for gambit: position cursor, Zobrist keys, and the
//! tablebase/opening-book collaborator traits.

mod error;
mod oracle;
mod position;
mod zobrist;

pub use error::PositionError;
pub use oracle::{DeadDrawTablebase, MAX_TABLEBASE_MEN, MemoryBook, OpeningBook, Tablebase, Wdl};
pub use position::{Position, STARTING_FEN, Status};
pub use zobrist::{DEFAULT_SEED, Zobrist};

pub use chess::{BitBoard, Board, ChessMove, Color, File, Piece, Rank, Square};
