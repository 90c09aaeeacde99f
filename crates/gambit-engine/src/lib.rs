//! Evaluation, search and analysis for gambit.

pub mod analysis;
pub mod eval;
pub mod search;

pub use analysis::{AnalysisError, Analyzer, MoveAnalysis, MoveQuality, PositionAnalysis};
pub use eval::evaluate;
pub use search::config::{ConfigError, Difficulty, SearchConfig};
pub use search::control::SearchControl;
pub use search::negamax::{INF, MATE_SCORE, MATE_THRESHOLD, MAX_PLY, SearchStats, is_mate_score, mate_in};
pub use search::{Iteration, SearchReport, Searcher, get_best_move};
