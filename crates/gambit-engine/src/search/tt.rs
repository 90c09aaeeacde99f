//! Bucketed transposition table.
//!
//! Each search worker owns its table, so entries are plain values rather
//! than atomics. The table is a power-of-two array of buckets, each holding
//! four entries; a key selects one bucket by its low bits.
//!
//! Replacement inside a bucket:
//! 1. an entry with the same key is overwritten,
//! 2. otherwise an empty slot is used,
//! 3. otherwise the slot with the lowest `(written this search, depth)` is
//!    evicted, so stale entries go first and then the shallowest.

use chess::ChessMove;

use crate::search::negamax::MATE_THRESHOLD;

/// Entries per bucket.
const BUCKET_SIZE: usize = 4;

/// Bound type stored in an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Empty slot.
    None,
    /// The score is exact.
    Exact,
    /// The search failed high; the true score is at least this.
    LowerBound,
    /// The search failed low; the true score is at most this.
    UpperBound,
}

/// One stored search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub key: u64,
    pub depth: i32,
    /// Mate scores are relative to the node on store and relative to the
    /// root again once returned from [`TranspositionTable::probe`].
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<ChessMove>,
    /// Search generation the entry was written in.
    pub age: u8,
    /// Written from a PV node.
    pub is_pv: bool,
}

impl TtEntry {
    const EMPTY: TtEntry = TtEntry {
        key: 0,
        depth: 0,
        score: 0,
        bound: Bound::None,
        best_move: None,
        age: 0,
        is_pv: false,
    };

    #[inline]
    fn is_empty(&self) -> bool {
        self.bound == Bound::None
    }
}

/// Usage counters since the last [`clear`](TranspositionTable::clear).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtStats {
    pub probes: u64,
    pub hits: u64,
    pub stores: u64,
    pub evictions: u64,
}

impl TtStats {
    /// Fraction of probes that found their key, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        if self.probes == 0 {
            0.0
        } else {
            self.hits as f64 / self.probes as f64
        }
    }
}

impl std::ops::AddAssign for TtStats {
    fn add_assign(&mut self, rhs: Self) {
        self.probes += rhs.probes;
        self.hits += rhs.hits;
        self.stores += rhs.stores;
        self.evictions += rhs.evictions;
    }
}

/// Convert a search score to its stored form.
///
/// Mate scores count plies from the root; stored scores count from the node,
/// so the same position reached at a different ply reads back correctly.
pub fn score_to_tt(score: i32, ply: usize) -> i32 {
    let ply = ply as i32;
    if score > MATE_THRESHOLD {
        score + ply
    } else if score < -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`].
pub fn score_from_tt(score: i32, ply: usize) -> i32 {
    let ply = ply as i32;
    if score > MATE_THRESHOLD {
        score - ply
    } else if score < -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

type Bucket = [TtEntry; BUCKET_SIZE];

/// Fixed-capacity transposition table.
pub struct TranspositionTable {
    buckets: Box<[Bucket]>,
    mask: u64,
    age: u8,
    stats: TtStats,
}

impl TranspositionTable {
    /// Table of roughly `mb` megabytes, rounded down to a power-of-two
    /// bucket count (at least one bucket).
    pub fn new(mb: usize) -> Self {
        let bytes = mb.saturating_mul(1024 * 1024);
        let per_bucket = std::mem::size_of::<Bucket>();
        let wanted = (bytes / per_bucket).max(1);
        let count = if wanted.is_power_of_two() {
            wanted
        } else {
            wanted.next_power_of_two() >> 1
        };

        Self {
            buckets: vec![[TtEntry::EMPTY; BUCKET_SIZE]; count].into_boxed_slice(),
            mask: (count - 1) as u64,
            age: 0,
            stats: TtStats::default(),
        }
    }

    /// Number of entry slots.
    pub fn capacity(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    /// Empty every slot and reset the age and counters.
    pub fn clear(&mut self) {
        self.buckets.fill([TtEntry::EMPTY; BUCKET_SIZE]);
        self.age = 0;
        self.stats = TtStats::default();
    }

    /// Advance the age. Entries from earlier searches become eviction
    /// candidates ahead of fresh ones.
    pub fn new_search(&mut self) {
        self.age = self.age.wrapping_add(1);
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn stats(&self) -> TtStats {
        self.stats
    }

    pub fn hit_rate(&self) -> f64 {
        self.stats.hit_rate()
    }

    /// Occupied slots per thousand, sampled from the first 250 buckets.
    pub fn hashfull(&self) -> usize {
        let sample = self.buckets.len().min(250);
        let used: usize = self.buckets[..sample]
            .iter()
            .flatten()
            .filter(|e| !e.is_empty() && e.age == self.age)
            .count();
        used * 1000 / (sample * BUCKET_SIZE)
    }

    #[inline]
    fn bucket_index(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }

    /// Look up `key`. The returned entry's score has been converted back to
    /// root-relative form for a node at `ply`.
    ///
    /// An entry is returned whatever its depth; the caller decides whether
    /// it is deep enough for a cutoff or only good for its move.
    pub fn probe(&mut self, key: u64, ply: usize) -> Option<TtEntry> {
        self.stats.probes += 1;
        let bucket = &self.buckets[self.bucket_index(key)];
        let mut entry = *bucket.iter().find(|e| !e.is_empty() && e.key == key)?;
        self.stats.hits += 1;
        entry.score = score_from_tt(entry.score, ply);
        Some(entry)
    }

    /// Store a result for `key` searched at `ply`.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &mut self,
        key: u64,
        depth: i32,
        score: i32,
        bound: Bound,
        best_move: Option<ChessMove>,
        ply: usize,
        is_pv: bool,
    ) {
        let age = self.age;
        let index = self.bucket_index(key);
        let bucket = &mut self.buckets[index];

        let slot = match bucket.iter().position(|e| !e.is_empty() && e.key == key) {
            Some(i) => i,
            None => match bucket.iter().position(TtEntry::is_empty) {
                Some(i) => i,
                None => {
                    self.stats.evictions += 1;
                    replacement_slot(bucket, age)
                }
            },
        };

        let previous = bucket[slot];
        let best_move = if best_move.is_none() && previous.key == key {
            previous.best_move
        } else {
            best_move
        };

        bucket[slot] = TtEntry {
            key,
            depth,
            score: score_to_tt(score, ply),
            bound,
            best_move,
            age,
            is_pv,
        };
        self.stats.stores += 1;
    }
}

/// Slot with the lowest `(is current age, depth)`; first such slot on ties.
fn replacement_slot(bucket: &Bucket, age: u8) -> usize {
    let priority = |e: &TtEntry| (e.age == age, e.depth);
    let mut worst = 0;
    for i in 1..BUCKET_SIZE {
        if priority(&bucket[i]) < priority(&bucket[worst]) {
            worst = i;
        }
    }
    worst
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("buckets", &self.buckets.len())
            .field("age", &self.age)
            .field("stats", &self.stats)
            .finish()
    }
}
