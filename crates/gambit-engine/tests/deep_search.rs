//! Searches deep enough for probcut, multi-cut and singular extensions to fire.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use gambit_core::Position;
use gambit_engine::search::negamax::{SearchContext, SearchTables, negamax};
use gambit_engine::{INF, MATE_SCORE, SearchConfig, SearchControl, SearchStats, Searcher};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const ITALIAN: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
const OPEN_CENTRE: &str = "r2q1rk1/ppp2ppp/2np1n2/2b1p1B1/2B1P1b1/2NP1N2/PPP2PPP/R2Q1RK1 w - - 0 8";
const BACK_RANK_MATE: &str = "6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1";

const DEEP: u32 = 10;

fn pos(fen: &str) -> Position {
    fen.parse().unwrap()
}

fn config() -> SearchConfig {
    SearchConfig { tt_size_mb: 16, ..SearchConfig::default() }
}

/// Root negamax score at a fixed depth, without the driver's early mate exit.
fn fixed_depth_score(config: &SearchConfig, p: &Position, depth: i32) -> i32 {
    let control = SearchControl::new_infinite(Arc::new(AtomicBool::new(false)));
    let mut tables = SearchTables::new(config.tt_size_mb);
    let mut ctx = SearchContext::new(config, &control, &mut tables, None);
    let mut root = p.clone();
    negamax(&mut root, &mut ctx, depth, 0, -INF, INF, true, None)
}

#[test]
fn depth_gated_techniques_fire_on_tactical_positions() {
    let mut total = SearchStats::default();
    for fen in [KIWIPETE, ITALIAN, OPEN_CENTRE] {
        let p = pos(fen);
        let report = Searcher::new(config()).search_with(&p, DEEP, 0.0, |_| {});
        assert_eq!(report.depth, DEEP, "{fen}");
        assert!(p.is_legal(report.best_move.unwrap()), "{fen}");
        total += report.stats;
    }
    assert!(total.probcut_cutoffs > 0, "{total:?}");
    assert!(total.multi_cut_cutoffs > 0, "{total:?}");
    assert!(total.singular_extensions > 0, "{total:?}");
}

#[test]
fn disabled_techniques_record_nothing() {
    let mut config = config();
    config.probcut = false;
    config.multi_cut = false;
    config.singular_extension = false;
    let p = pos(KIWIPETE);
    let report = Searcher::new(config).search_with(&p, 9, 0.0, |_| {});
    assert!(p.is_legal(report.best_move.unwrap()));
    assert_eq!(report.stats.probcut_cutoffs, 0);
    assert_eq!(report.stats.multi_cut_cutoffs, 0);
    assert_eq!(report.stats.singular_extensions, 0);
}

#[test]
fn deep_mate_survives_each_depth_gated_switch() {
    let toggles: [(&str, fn(&mut SearchConfig)); 4] = [
        ("all enabled", |_| {}),
        ("no probcut", |c| c.probcut = false),
        ("no multi-cut", |c| c.multi_cut = false),
        ("no singular extension", |c| c.singular_extension = false),
    ];
    let p = pos(BACK_RANK_MATE);
    for (name, toggle) in toggles {
        let mut config = config();
        toggle(&mut config);
        assert_eq!(fixed_depth_score(&config, &p, 9), MATE_SCORE - 1, "{name}");
    }
}
