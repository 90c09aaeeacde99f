//! Quiet-move ordering tables: killers, history, countermoves and
//! continuation history.

use chess::{ChessMove, Piece};
use gambit_core::Position;

use crate::search::negamax::MAX_PLY;

/// Bound on history and continuation values.
pub const HISTORY_MAX: i32 = 16_384;

/// Numerator and denominator of the periodic decay.
const DECAY_NUM: i32 = 7;
const DECAY_DEN: i32 = 8;

/// Move `entry` toward `bonus`, shrinking the step as the entry nears
/// `max` in magnitude, then clamp to `[-max, max]`.
#[inline]
pub(crate) fn gravity_update(entry: &mut i32, bonus: i32, max: i32) {
    let v = *entry;
    *entry = (v + bonus - v * bonus.abs() / max).clamp(-max, max);
}

#[inline]
fn decay(entry: &mut i32) {
    *entry = *entry * DECAY_NUM / DECAY_DEN;
}

/// Two killer moves per ply, most recent first.
pub struct KillerTable {
    slots: [[Option<ChessMove>; 2]; MAX_PLY],
}

impl KillerTable {
    pub fn new() -> Self {
        Self {
            slots: [[None; 2]; MAX_PLY],
        }
    }

    /// Record `mv` as the newest killer at `ply`; a repeat of the newest
    /// killer leaves the slots unchanged.
    pub fn store(&mut self, ply: usize, mv: ChessMove) {
        let Some(slots) = self.slots.get_mut(ply) else {
            return;
        };
        if slots[0] != Some(mv) {
            slots[1] = slots[0];
            slots[0] = Some(mv);
        }
    }

    /// 0 for the newest killer, 1 for the older one.
    pub fn rank(&self, ply: usize, mv: ChessMove) -> Option<usize> {
        let slots = self.slots.get(ply)?;
        slots.iter().position(|&k| k == Some(mv))
    }

    pub fn is_killer(&self, ply: usize, mv: ChessMove) -> bool {
        self.rank(ply, mv).is_some()
    }

    pub fn clear(&mut self) {
        self.slots = [[None; 2]; MAX_PLY];
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// History heuristic indexed by `[from][to]`.
pub struct HistoryTable {
    table: Box<[[i32; 64]; 64]>,
}

impl HistoryTable {
    pub fn new() -> Self {
        Self {
            table: Box::new([[0; 64]; 64]),
        }
    }

    /// Apply `bonus` (negative for a malus) with gravity.
    pub fn update(&mut self, mv: ChessMove, bonus: i32) {
        let entry = &mut self.table[mv.get_source().to_index()][mv.get_dest().to_index()];
        gravity_update(entry, bonus, HISTORY_MAX);
    }

    pub fn score(&self, mv: ChessMove) -> i32 {
        self.table[mv.get_source().to_index()][mv.get_dest().to_index()]
    }

    /// Scale every entry by 7/8.
    pub fn apply_gravity(&mut self) {
        self.table.iter_mut().flatten().for_each(decay);
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|row| row.fill(0));
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Best refutation seen for each previous move, keyed by its squares.
pub struct CounterMoveTable {
    table: Box<[[Option<ChessMove>; 64]; 64]>,
}

impl CounterMoveTable {
    pub fn new() -> Self {
        Self {
            table: Box::new([[None; 64]; 64]),
        }
    }

    /// Last write wins.
    pub fn store(&mut self, prev: ChessMove, reply: ChessMove) {
        self.table[prev.get_source().to_index()][prev.get_dest().to_index()] = Some(reply);
    }

    pub fn get(&self, prev: ChessMove) -> Option<ChessMove> {
        self.table[prev.get_source().to_index()][prev.get_dest().to_index()]
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|row| row.fill(None));
    }
}

impl Default for CounterMoveTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A move as seen by continuation history: the piece that moved and where
/// it landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceTo {
    pub piece: Piece,
    pub to: chess::Square,
}

impl PieceTo {
    #[inline]
    fn index(self) -> usize {
        self.piece.to_index() * 64 + self.to.to_index()
    }
}

const PIECE_TO: usize = 6 * 64;

/// "Move B is good after move A", indexed by the (piece, destination) of
/// both moves.
pub struct ContinuationHistory {
    table: Vec<i32>,
}

impl ContinuationHistory {
    pub fn new() -> Self {
        Self {
            table: vec![0; PIECE_TO * PIECE_TO],
        }
    }

    #[inline]
    fn slot(prev: PieceTo, cur: PieceTo) -> usize {
        prev.index() * PIECE_TO + cur.index()
    }

    pub fn score(&self, prev: PieceTo, cur: PieceTo) -> i32 {
        self.table[Self::slot(prev, cur)]
    }

    pub fn update(&mut self, prev: PieceTo, cur: PieceTo, bonus: i32) {
        gravity_update(&mut self.table[Self::slot(prev, cur)], bonus, HISTORY_MAX);
    }

    /// Scale every entry by 7/8.
    pub fn apply_gravity(&mut self) {
        self.table.iter_mut().for_each(decay);
    }

    pub fn clear(&mut self) {
        self.table.fill(0);
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Continuation key of the move that led to `pos`: the piece now standing
/// on its destination.
pub fn previous_piece_to(pos: &Position) -> Option<PieceTo> {
    let prev = pos.last_move()?;
    let to = prev.get_dest();
    pos.piece_at(to).map(|(piece, _)| PieceTo { piece, to })
}

/// Continuation key of `mv` about to be played in `pos`.
pub fn piece_to(pos: &Position, mv: ChessMove) -> Option<PieceTo> {
    pos.moved_piece(mv).map(|piece| PieceTo {
        piece,
        to: mv.get_dest(),
    })
}

/// Every quiet-move table one search worker owns.
#[derive(Default)]
pub struct Heuristics {
    pub killers: KillerTable,
    pub history: HistoryTable,
    pub counters: CounterMoveTable,
    pub continuation: ContinuationHistory,
}

impl Heuristics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reward the quiet move `mv` that failed high at `ply` in `pos`, and
    /// penalise the quiet moves in `tried` that were searched before it
    /// without doing so.
    pub fn record_cutoff(
        &mut self,
        pos: &Position,
        mv: ChessMove,
        ply: usize,
        depth: i32,
        tried: &[ChessMove],
    ) {
        let bonus = depth * depth;
        let prev = previous_piece_to(pos);

        self.killers.store(ply, mv);
        self.history.update(mv, bonus);
        if let Some(last) = pos.last_move() {
            self.counters.store(last, mv);
        }
        if let Some((prev, cur)) = prev.zip(piece_to(pos, mv)) {
            self.continuation.update(prev, cur, bonus);
        }

        for &quiet in tried.iter().filter(|&&q| q != mv) {
            self.history.update(quiet, -bonus);
            if let Some((prev, cur)) = prev.zip(piece_to(pos, quiet)) {
                self.continuation.update(prev, cur, -bonus);
            }
        }
    }

    /// Periodic 7/8 decay of history and continuation history.
    pub fn apply_gravity(&mut self) {
        self.history.apply_gravity();
        self.continuation.apply_gravity();
    }

    pub fn clear(&mut self) {
        self.killers.clear();
        self.history.clear();
        self.counters.clear();
        self.continuation.clear();
    }
}
