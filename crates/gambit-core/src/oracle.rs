//! Outside knowledge the search can consult: endgame tablebases and opening
//! books.

use std::collections::HashMap;

use chess::ChessMove;
use tracing::trace;

use crate::position::Position;

/// Exact game-theoretic outcome from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    Draw,
    Win,
}

/// Endgame oracle.
///
/// Callers only probe positions with at most [`MAX_TABLEBASE_MEN`] pieces and
/// no castling rights; implementations may return `None` for anything they
/// do not cover.
pub trait Tablebase: Send + Sync {
    fn probe(&self, pos: &Position) -> Option<Wdl>;
}

/// Largest piece count (kings included) a tablebase is asked about.
pub const MAX_TABLEBASE_MEN: u32 = 6;

/// Recognises material configurations that can never be won.
///
/// Covers bare kings and a lone minor piece against a bare king.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadDrawTablebase;

impl Tablebase for DeadDrawTablebase {
    fn probe(&self, pos: &Position) -> Option<Wdl> {
        pos.is_insufficient_material().then_some(Wdl::Draw)
    }
}

/// Opening move source, consulted once before a search starts.
pub trait OpeningBook: Send + Sync {
    fn lookup(&self, pos: &Position) -> Option<ChessMove>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BookEntry {
    mv: ChessMove,
    weight: u16,
}

/// In-memory book keyed by position key, holding weighted candidate moves.
///
/// Lookup returns the heaviest candidate that is legal in the probed position.
/// Equal weights resolve to the candidate inserted first, so lookups are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryBook {
    entries: HashMap<u64, Vec<BookEntry>>,
}

impl MemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `mv` as a candidate for `pos`.
    pub fn insert(&mut self, pos: &Position, mv: ChessMove, weight: u16) {
        self.entries
            .entry(pos.key())
            .or_default()
            .push(BookEntry { mv, weight });
    }

    /// Number of positions in the book.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OpeningBook for MemoryBook {
    fn lookup(&self, pos: &Position) -> Option<ChessMove> {
        let candidates = self.entries.get(&pos.key())?;
        let mut best: Option<BookEntry> = None;
        for entry in candidates {
            if !pos.is_legal(entry.mv) {
                trace!(mv = %entry.mv, key = pos.key(), "skipping illegal book move");
                continue;
            }
            if best.is_none_or(|b| entry.weight > b.weight) {
                best = Some(*entry);
            }
        }
        best.map(|e| e.mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;

    #[test]
    fn dead_draw_recognised() {
        let kk: Position = "4k3/8/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let knk: Position = "4k3/8/8/8/8/8/8/1N2K3 w - - 0 1".parse().unwrap();
        let kqk: Position = "4k3/8/8/8/8/8/8/3QK3 w - - 0 1".parse().unwrap();
        assert_eq!(DeadDrawTablebase.probe(&kk), Some(Wdl::Draw));
        assert_eq!(DeadDrawTablebase.probe(&knk), Some(Wdl::Draw));
        assert_eq!(DeadDrawTablebase.probe(&kqk), None);
    }

    #[test]
    fn book_prefers_heaviest_legal_move() {
        let pos = Position::default();
        let mut book = MemoryBook::new();
        let e4 = ChessMove::new(Square::E2, Square::E4, None);
        let d4 = ChessMove::new(Square::D2, Square::D4, None);
        let illegal = ChessMove::new(Square::E2, Square::E5, None);
        book.insert(&pos, e4, 10);
        book.insert(&pos, d4, 30);
        book.insert(&pos, illegal, 99);
        assert_eq!(book.lookup(&pos), Some(d4));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn book_ties_keep_first_inserted() {
        let pos = Position::default();
        let mut book = MemoryBook::new();
        let c4 = ChessMove::new(Square::C2, Square::C4, None);
        let nf3 = ChessMove::new(Square::G1, Square::F3, None);
        book.insert(&pos, c4, 5);
        book.insert(&pos, nf3, 5);
        assert_eq!(book.lookup(&pos), Some(c4));
    }

    #[test]
    fn book_miss_returns_none() {
        let book = MemoryBook::new();
        assert!(book.is_empty());
        assert_eq!(book.lookup(&Position::default()), None);
    }
}
