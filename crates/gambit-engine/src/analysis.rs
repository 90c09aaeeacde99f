//! Position and game analysis on top of [`Searcher`].
//!
//! An [`Analyzer`] searches a position to a fixed depth and keeps the result
//! in a small FIFO cache keyed by position key and depth. Played moves are
//! graded by how many centipawns the mover gave up compared with the
//! position before the move.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chess::ChessMove;
use gambit_core::{Position, PositionError};
use tracing::debug;

use crate::eval::evaluate;
use crate::search::Searcher;
use crate::search::config::SearchConfig;

/// Positions remembered before the oldest is dropped.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Other moves listed next to the best one.
const ALTERNATIVES: usize = 3;

/// Legal-move count above which finding the best move counts as brilliant.
const COMPLEX_POSITION_MOVES: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("move {ply} of the game is not playable: {source}")]
    IllegalGameMove {
        /// 1-based index into the move list.
        ply: usize,
        #[source]
        source: PositionError,
    },

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Annotation for a played move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveQuality {
    Brilliant,
    Good,
    Interesting,
    Dubious,
    Mistake,
    Blunder,
    /// The only legal move.
    Forced,
}

impl MoveQuality {
    /// Grade a move from the centipawns it lost.
    ///
    /// A negative loss means the move did better than the search expected.
    pub fn grade(loss: i32, played_best: bool, legal_moves: usize) -> MoveQuality {
        if legal_moves == 1 {
            return MoveQuality::Forced;
        }
        if played_best {
            return if loss < 0 && legal_moves > COMPLEX_POSITION_MOVES {
                MoveQuality::Brilliant
            } else {
                MoveQuality::Good
            };
        }
        match loss {
            i32::MIN..0 => MoveQuality::Brilliant,
            0..10 => MoveQuality::Good,
            10..50 => MoveQuality::Interesting,
            50..100 => MoveQuality::Dubious,
            100..300 => MoveQuality::Mistake,
            _ => MoveQuality::Blunder,
        }
    }

    /// Conventional annotation glyph; empty for forced moves.
    pub fn symbol(self) -> &'static str {
        match self {
            MoveQuality::Brilliant => "!!",
            MoveQuality::Good => "!",
            MoveQuality::Interesting => "!?",
            MoveQuality::Dubious => "?!",
            MoveQuality::Mistake => "?",
            MoveQuality::Blunder => "??",
            MoveQuality::Forced => "",
        }
    }
}

impl fmt::Display for MoveQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Search result for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionAnalysis {
    /// Centipawns from the side to move's point of view.
    pub score: i32,
    pub best_move: Option<ChessMove>,
    pub pv: Vec<ChessMove>,
    pub depth: u32,
    pub nodes: u64,
    pub elapsed: Duration,
    /// Up to three other moves with their static score after the move,
    /// from the side to move's point of view, best first.
    pub alternatives: Vec<(ChessMove, i32)>,
}

/// Verdict on one played move. Scores are from the mover's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnalysis {
    pub mv: ChessMove,
    pub best_move: Option<ChessMove>,
    pub score_before: i32,
    pub score_after: i32,
    /// `score_before - score_after`.
    pub loss: i32,
    pub quality: MoveQuality,
    pub alternatives: Vec<(ChessMove, i32)>,
}

/// Fixed-depth analysis session with a result cache.
pub struct Analyzer {
    searcher: Searcher,
    depth: u32,
    time_limit_secs: f64,
    cache: HashMap<(u64, u32), PositionAnalysis>,
    order: VecDeque<(u64, u32)>,
    capacity: usize,
}

impl Analyzer {
    /// Analyse to `config.max_depth` within `config.time_limit_secs`.
    pub fn new(config: SearchConfig) -> Self {
        let (depth, time_limit_secs) = (config.max_depth.max(1), config.time_limit_secs);
        Self {
            searcher: Searcher::new(config),
            depth,
            time_limit_secs,
            cache: HashMap::new(),
            order: VecDeque::new(),
            capacity: DEFAULT_CACHE_SIZE,
        }
    }

    pub fn with_cache_size(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Change the analysis depth. Cached results for other depths are dropped.
    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth.max(1);
        self.clear_cache();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.order.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Search `pos` and list the strongest alternatives to the best move.
    pub fn analyze_position(&mut self, pos: &Position) -> PositionAnalysis {
        let key = (pos.key(), self.depth);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let report = self
            .searcher
            .search_with(pos, self.depth, self.time_limit_secs, |_| {});
        let analysis = PositionAnalysis {
            score: report.score,
            best_move: report.best_move,
            alternatives: alternatives(pos, report.best_move),
            pv: report.pv,
            depth: report.depth,
            nodes: report.nodes,
            elapsed: report.elapsed,
        };

        if self.cache.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.order.push_back(key);
        self.cache.insert(key, analysis.clone());
        analysis
    }

    /// Grade `mv` played in `pos`.
    pub fn analyze_move(&mut self, pos: &Position, mv: ChessMove) -> Result<MoveAnalysis, AnalysisError> {
        let mut after = pos.clone();
        after.try_push(mv)?;

        let before = self.analyze_position(pos);
        let score_after = -self.analyze_position(&after).score;
        let loss = before.score - score_after;
        let quality = MoveQuality::grade(loss, before.best_move == Some(mv), pos.legal_move_count());
        debug!(%mv, loss, quality = %quality, "move graded");

        Ok(MoveAnalysis {
            mv,
            best_move: before.best_move,
            score_before: before.score,
            score_after,
            loss,
            quality,
            alternatives: before.alternatives,
        })
    }

    /// Grade every move of a game played from `start`.
    ///
    /// `on_progress` receives the number of moves done and the total.
    pub fn analyze_game<F>(
        &mut self,
        start: &Position,
        moves: &[ChessMove],
        mut on_progress: F,
    ) -> Result<Vec<MoveAnalysis>, AnalysisError>
    where
        F: FnMut(usize, usize),
    {
        let mut pos = start.clone();
        let mut graded = Vec::with_capacity(moves.len());
        for (i, &mv) in moves.iter().enumerate() {
            if !pos.is_legal(mv) {
                return Err(AnalysisError::IllegalGameMove {
                    ply: i + 1,
                    source: PositionError::IllegalMove { uci: mv.to_string() },
                });
            }
            graded.push(self.analyze_move(&pos, mv)?);
            pos.push(mv);
            on_progress(i + 1, moves.len());
        }
        Ok(graded)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

/// Every legal move except `best`, scored by static evaluation after the
/// move. Ties keep move generation order.
fn alternatives(pos: &Position, best: Option<ChessMove>) -> Vec<(ChessMove, i32)> {
    let mut scored: Vec<(ChessMove, i32)> = pos
        .legal_moves()
        .into_iter()
        .filter(|&mv| Some(mv) != best)
        .map(|mv| {
            let mut child = pos.clone();
            child.push(mv);
            (mv, -evaluate(&child, None))
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(ALTERNATIVES);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Square;

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    fn analyzer(depth: u32) -> Analyzer {
        Analyzer::new(SearchConfig { max_depth: depth, time_limit_secs: 0.0, tt_size_mb: 4, ..SearchConfig::default() })
    }

    #[test]
    fn grade_thresholds() {
        let grade = |loss| MoveQuality::grade(loss, false, 20);
        assert_eq!(grade(-5), MoveQuality::Brilliant);
        assert_eq!(grade(0), MoveQuality::Good);
        assert_eq!(grade(9), MoveQuality::Good);
        assert_eq!(grade(10), MoveQuality::Interesting);
        assert_eq!(grade(49), MoveQuality::Interesting);
        assert_eq!(grade(50), MoveQuality::Dubious);
        assert_eq!(grade(99), MoveQuality::Dubious);
        assert_eq!(grade(100), MoveQuality::Mistake);
        assert_eq!(grade(299), MoveQuality::Mistake);
        assert_eq!(grade(300), MoveQuality::Blunder);
        assert_eq!(grade(i32::MAX), MoveQuality::Blunder);
    }

    #[test]
    fn best_and_forced_moves() {
        assert_eq!(MoveQuality::grade(500, false, 1), MoveQuality::Forced);
        assert_eq!(MoveQuality::grade(80, true, 20), MoveQuality::Good);
        assert_eq!(MoveQuality::grade(-20, true, 20), MoveQuality::Good);
        assert_eq!(MoveQuality::grade(-20, true, 35), MoveQuality::Brilliant);
    }

    #[test]
    fn symbols() {
        assert_eq!(MoveQuality::Blunder.to_string(), "??");
        assert_eq!(MoveQuality::Interesting.symbol(), "!?");
        assert_eq!(MoveQuality::Forced.symbol(), "");
    }

    #[test]
    fn position_analysis_lists_alternatives() {
        let p = pos("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1");
        let analysis = analyzer(2).analyze_position(&p);
        let best = ChessMove::new(Square::E1, Square::E8, None);
        assert_eq!(analysis.best_move, Some(best));
        assert_eq!(analysis.pv.first(), Some(&best));
        assert_eq!(analysis.alternatives.len(), ALTERNATIVES);
        assert!(analysis.alternatives.iter().all(|&(mv, _)| mv != best && p.is_legal(mv)));
        assert!(analysis.alternatives.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn cache_is_bounded_and_reset_by_depth_change() {
        let mut analyzer = analyzer(2).with_cache_size(2);
        let start = Position::default();
        let first = analyzer.analyze_position(&start);
        assert_eq!(analyzer.analyze_position(&start), first);
        assert_eq!(analyzer.cached(), 1);

        for fen in [
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1",
        ] {
            analyzer.analyze_position(&pos(fen));
        }
        assert_eq!(analyzer.cached(), 2);

        analyzer.set_depth(3);
        assert_eq!(analyzer.cached(), 0);
        assert_eq!(analyzer.analyze_position(&start).depth, 3);
    }

    #[test]
    fn dropping_the_queen_is_a_blunder() {
        // Qd5 walks into the e4 pawn.
        let p = pos("4k3/8/8/8/4P3/8/3q4/7K b - - 0 1");
        let mut analyzer = analyzer(3);
        let blunder = analyzer
            .analyze_move(&p, ChessMove::new(Square::D2, Square::D5, None))
            .unwrap();
        assert_eq!(blunder.quality, MoveQuality::Blunder);
        assert!(blunder.loss >= 300, "loss {}", blunder.loss);
        assert_ne!(blunder.best_move, Some(blunder.mv));
    }

    #[test]
    fn mating_move_is_good() {
        let p = pos("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1");
        let mate = ChessMove::new(Square::E1, Square::E8, None);
        let graded = analyzer(2).analyze_move(&p, mate).unwrap();
        assert_eq!(graded.best_move, Some(mate));
        assert_eq!(graded.quality, MoveQuality::Good);
    }

    #[test]
    fn illegal_moves_are_rejected() {
        let p = Position::default();
        let bad = ChessMove::new(Square::E2, Square::E5, None);
        assert!(matches!(analyzer(1).analyze_move(&p, bad), Err(AnalysisError::Position(_))));

        let e4 = ChessMove::new(Square::E2, Square::E4, None);
        let err = analyzer(1).analyze_game(&p, &[e4, e4], |_, _| {}).unwrap_err();
        assert!(matches!(err, AnalysisError::IllegalGameMove { ply: 2, .. }));
    }

    #[test]
    fn game_analysis_reports_progress() {
        let moves = [
            ChessMove::new(Square::E2, Square::E4, None),
            ChessMove::new(Square::E7, Square::E5, None),
            ChessMove::new(Square::G1, Square::F3, None),
        ];
        let mut progress = Vec::new();
        let graded = analyzer(2)
            .analyze_game(&Position::default(), &moves, |done, total| progress.push((done, total)))
            .unwrap();
        assert_eq!(graded.len(), 3);
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
        assert!(graded.iter().zip(moves).all(|(g, mv)| g.mv == mv));
    }
}
