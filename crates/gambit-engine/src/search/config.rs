//! Search configuration: technique toggles, table sizes and difficulty presets.

use std::fmt;
use std::str::FromStr;

/// Errors raised while building a [`SearchConfig`] from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The difficulty name is not one of the known presets.
    #[error("unknown difficulty \"{0}\" (expected beginner, intermediate, advanced or expert)")]
    UnknownDifficulty(String),
}

/// Named strength presets, each a depth and time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Expert,
    ];

    /// Maximum iterative-deepening depth.
    pub fn max_depth(self) -> u32 {
        match self {
            Difficulty::Beginner => 2,
            Difficulty::Intermediate => 4,
            Difficulty::Advanced => 6,
            Difficulty::Expert => 8,
        }
    }

    /// Time budget in seconds.
    pub fn time_limit_secs(self) -> f64 {
        match self {
            Difficulty::Beginner => 1.0,
            Difficulty::Intermediate => 3.0,
            Difficulty::Advanced => 10.0,
            Difficulty::Expert => 20.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    /// Case-insensitive preset name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownDifficulty(s.to_string()))
    }
}

/// Everything a search session can be tuned with.
///
/// Each pruning, reduction and extension technique has its own switch.
/// Turning a technique off only changes how much of the tree is explored;
/// returned moves stay legal and mate/stalemate scores stay exact.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub null_move: bool,
    pub razoring: bool,
    pub futility: bool,
    pub late_move_pruning: bool,
    pub late_move_reduction: bool,
    pub singular_extension: bool,
    pub multi_cut: bool,
    pub probcut: bool,
    pub internal_iterative_deepening: bool,
    pub correction_history: bool,
    pub aspiration: bool,
    pub check_extension: bool,
    /// Quiescence delta pruning.
    pub delta_pruning: bool,

    /// Transposition table budget in megabytes.
    pub tt_size_mb: usize,
    /// Half-width of the aspiration window in centipawns.
    pub aspiration_window: i32,
    /// Root-parallel workers. 1 searches on the calling thread.
    pub threads: usize,
    /// Keep tables between `search` calls instead of clearing them.
    pub persist_tables: bool,
    pub max_depth: u32,
    /// Zero, negative or non-finite means no time limit.
    pub time_limit_secs: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            null_move: true,
            razoring: true,
            futility: true,
            late_move_pruning: true,
            late_move_reduction: true,
            singular_extension: true,
            multi_cut: true,
            probcut: true,
            internal_iterative_deepening: true,
            correction_history: true,
            aspiration: true,
            check_extension: true,
            delta_pruning: true,
            tt_size_mb: 64,
            aspiration_window: 50,
            threads: 1,
            persist_tables: false,
            max_depth: 6,
            time_limit_secs: 10.0,
        }
    }
}

impl SearchConfig {
    /// Plain alpha-beta with quiescence and a transposition table: every
    /// selective technique switched off.
    pub fn minimal() -> Self {
        Self {
            null_move: false,
            razoring: false,
            futility: false,
            late_move_pruning: false,
            late_move_reduction: false,
            singular_extension: false,
            multi_cut: false,
            probcut: false,
            internal_iterative_deepening: false,
            correction_history: false,
            aspiration: false,
            check_extension: false,
            delta_pruning: false,
            ..Self::default()
        }
    }

    /// Apply a difficulty preset's depth and time budget.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.max_depth = difficulty.max_depth();
        self.time_limit_secs = difficulty.time_limit_secs();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Whether `time_limit_secs` describes a real budget.
    pub fn has_time_limit(&self) -> bool {
        self.time_limit_secs.is_finite() && self.time_limit_secs > 0.0
    }
}
