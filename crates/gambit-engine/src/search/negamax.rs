//! Negamax alpha-beta search with quiescence and aspiration windows.
//!
//! Node order inside [`negamax`]:
//! mate-distance pruning, draw rules, transposition probe, quiescence at the
//! horizon, check extension, corrected static eval, internal iterative
//! deepening, razoring, null move, probcut, futility flag, move generation
//! and ordering, multi-cut, singular extension test, then the PVS move loop
//! with late move pruning and reductions. After the loop the correction
//! history learns from the result and the transposition table stores it.

use std::ops::AddAssign;

use chess::ChessMove;
use gambit_core::{Position, Status, Tablebase};
use tracing::debug;

use crate::eval::evaluate;
use crate::eval::material::piece_value;
use crate::search::config::SearchConfig;
use crate::search::control::SearchControl;
use crate::search::correction::{CorrectionHistory, MIN_ERROR};
use crate::search::heuristics::Heuristics;
use crate::search::ordering::{is_countermove, lmr_reduction, order_moves, order_noisy};
use crate::search::tt::{Bound, TranspositionTable, TtEntry};

/// Bound outside every reachable score.
pub const INF: i32 = 32_000;

/// Score of delivering mate at the root; mates further away score less.
pub const MATE_SCORE: i32 = 30_000;

/// Maximum search ply, for array sizing and the recursion ceiling.
pub const MAX_PLY: usize = 128;

/// Scores beyond this magnitude are mate scores.
pub const MATE_THRESHOLD: i32 = MATE_SCORE - MAX_PLY as i32;

/// Largest magnitude a corrected static evaluation may take.
const MAX_EVAL: i32 = MATE_THRESHOLD - 1;

/// Charged to the side that steps back into an earlier position.
const REPETITION_PENALTY: i32 = 50;

const RAZOR_MARGIN: [i32; 4] = [0, 300, 400, 600];
const FUTILITY_MARGIN: [i32; 4] = [0, 200, 300, 500];
const PROBCUT_MARGIN: i32 = 200;

/// Quiescence: per-capture safety margin, and the node-level margin
/// beyond which no capture can help.
const DELTA_MARGIN: i32 = 200;
const BIG_DELTA: i32 = 900;

const MULTI_CUT_MOVES: usize = 6;

/// Nodes between history decays.
const HISTORY_DECAY_INTERVAL: u64 = 4096;

/// Failed aspiration windows tolerated before falling back to a full window.
const ASPIRATION_ATTEMPTS: i32 = 4;

/// Whether `score` encodes a forced mate for either side.
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() > MATE_THRESHOLD
}

/// Full moves until mate: positive when the side to move mates, negative
/// when it gets mated. `None` for ordinary scores.
pub fn mate_in(score: i32) -> Option<i32> {
    if score > MATE_THRESHOLD {
        Some((MATE_SCORE - score + 1) / 2)
    } else if score < -MATE_THRESHOLD {
        Some(-(MATE_SCORE + score) / 2)
    } else {
        None
    }
}

/// Triangular principal variation table. Row `ply` holds the best line
/// found from that ply on.
pub struct PvTable {
    moves: [[Option<ChessMove>; MAX_PLY]; MAX_PLY],
    len: [usize; MAX_PLY],
}

impl PvTable {
    pub fn new() -> Self {
        Self {
            moves: [[None; MAX_PLY]; MAX_PLY],
            len: [0; MAX_PLY],
        }
    }

    pub fn clear_ply(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.len[ply] = 0;
        }
    }

    /// Make `mv` followed by the line at `ply + 1` the line at `ply`.
    pub fn update(&mut self, ply: usize, mv: ChessMove) {
        if ply >= MAX_PLY {
            return;
        }
        self.moves[ply][0] = Some(mv);

        let child = ply + 1;
        if child < MAX_PLY {
            let copy_len = self.len[child].min(MAX_PLY - 1);
            let (top, bottom) = self.moves.split_at_mut(child);
            top[ply][1..=copy_len].copy_from_slice(&bottom[0][..copy_len]);
            self.len[ply] = 1 + copy_len;
        } else {
            self.len[ply] = 1;
        }
    }

    /// The line from the root.
    pub fn root_pv(&self) -> Vec<ChessMove> {
        self.moves[0][..self.len[0]].iter().flatten().copied().collect()
    }

    /// First move of the root line.
    pub fn best_move(&self) -> Option<ChessMove> {
        if self.len[0] == 0 { None } else { self.moves[0][0] }
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one search. Summed across workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Main-search and quiescence nodes.
    pub nodes: u64,
    pub qnodes: u64,
    pub tt_cutoffs: u64,
    pub null_move_cutoffs: u64,
    pub razoring_cutoffs: u64,
    pub futility_prunes: u64,
    pub lmp_prunes: u64,
    pub multi_cut_cutoffs: u64,
    pub probcut_cutoffs: u64,
    pub singular_extensions: u64,
    pub iid_searches: u64,
    pub lmr_researches: u64,
    pub aspiration_researches: u64,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
        self.qnodes += rhs.qnodes;
        self.tt_cutoffs += rhs.tt_cutoffs;
        self.null_move_cutoffs += rhs.null_move_cutoffs;
        self.razoring_cutoffs += rhs.razoring_cutoffs;
        self.futility_prunes += rhs.futility_prunes;
        self.lmp_prunes += rhs.lmp_prunes;
        self.multi_cut_cutoffs += rhs.multi_cut_cutoffs;
        self.probcut_cutoffs += rhs.probcut_cutoffs;
        self.singular_extensions += rhs.singular_extensions;
        self.iid_searches += rhs.iid_searches;
        self.lmr_researches += rhs.lmr_researches;
        self.aspiration_researches += rhs.aspiration_researches;
    }
}

/// Tables that outlive a single node: transposition table, quiet-move
/// heuristics and correction history. One set per search worker.
pub struct SearchTables {
    pub tt: TranspositionTable,
    pub heuristics: Heuristics,
    pub correction: CorrectionHistory,
}

impl SearchTables {
    pub fn new(tt_mb: usize) -> Self {
        Self {
            tt: TranspositionTable::new(tt_mb),
            heuristics: Heuristics::new(),
            correction: CorrectionHistory::new(),
        }
    }

    pub fn clear(&mut self) {
        self.tt.clear();
        self.heuristics.clear();
        self.correction.clear();
    }
}

/// Search state threaded through the recursion.
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub control: &'a SearchControl,
    pub tables: &'a mut SearchTables,
    pub tablebase: Option<&'a dyn Tablebase>,
    /// Root moves this search may play; empty means all of them.
    pub root_moves: &'a [ChessMove],
    pub pv: PvTable,
    pub stats: SearchStats,
    /// Corrected static eval per ply on the current path, `None` in check.
    evals: [Option<i32>; MAX_PLY + 1],
}

impl<'a> SearchContext<'a> {
    pub fn new(
        config: &'a SearchConfig,
        control: &'a SearchControl,
        tables: &'a mut SearchTables,
        tablebase: Option<&'a dyn Tablebase>,
    ) -> Self {
        Self {
            config,
            control,
            tables,
            tablebase,
            root_moves: &[],
            pv: PvTable::new(),
            stats: SearchStats::default(),
            evals: [None; MAX_PLY + 1],
        }
    }

    /// Restrict the root to `moves`.
    pub fn with_root_moves(mut self, moves: &'a [ChessMove]) -> Self {
        self.root_moves = moves;
        self
    }

    #[inline]
    fn stopped(&self) -> bool {
        self.control.is_stopped()
    }

    /// Count a node, decay history on schedule, and report whether the
    /// search must unwind.
    fn enter_node(&mut self) -> bool {
        self.stats.nodes += 1;
        if self.stats.nodes % HISTORY_DECAY_INTERVAL == 0 {
            self.tables.heuristics.apply_gravity();
        }
        self.control.should_stop(self.stats.nodes)
    }

    fn static_eval(&self, pos: &Position) -> i32 {
        evaluate(pos, self.tablebase)
    }

    /// Static eval plus learned correction, kept clear of mate scores.
    fn corrected_eval(&self, pos: &Position) -> i32 {
        let raw = self.static_eval(pos);
        let correction = if self.config.correction_history {
            self.tables.correction.get_correction(pos, pos.last_move())
        } else {
            0
        };
        (raw + correction).clamp(-MAX_EVAL, MAX_EVAL)
    }

    fn probe_hash_move(&mut self, pos: &Position, ply: usize) -> (Option<TtEntry>, Option<ChessMove>) {
        let entry = self.tables.tt.probe(pos.key(), ply);
        let hash_move = entry.and_then(|e| e.best_move).filter(|&mv| pos.is_legal(mv));
        (entry, hash_move)
    }
}

/// Negamax alpha-beta search of `pos` to `depth` plies.
///
/// Returns the score from the side to move's point of view and leaves the
/// principal variation in `ctx.pv`. `excluded` names a move to skip, used
/// by the singular extension test; such searches neither read nor write
/// the transposition table. Every `push` made here is popped before
/// returning, including when the search is stopped.
#[allow(clippy::too_many_arguments)]
pub fn negamax(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    mut depth: i32,
    ply: usize,
    mut alpha: i32,
    mut beta: i32,
    allow_null: bool,
    excluded: Option<ChessMove>,
) -> i32 {
    ctx.pv.clear_ply(ply);
    if ctx.enter_node() {
        return 0;
    }
    if ply >= MAX_PLY {
        return ctx.static_eval(pos);
    }

    let config = ctx.config;
    let root = ply == 0;
    let pv_node = beta - alpha > 1;
    let ply_score = ply as i32;

    if !root {
        alpha = alpha.max(-MATE_SCORE + ply_score);
        beta = beta.min(MATE_SCORE - ply_score - 1);
        if alpha >= beta {
            return alpha;
        }

        if pos.is_insufficient_material() || pos.repetitions() >= 2 {
            return 0;
        }
        if pos.is_fifty_move_draw() && pos.status() != Status::Checkmate {
            return 0;
        }
        if pos.is_repetition() {
            return REPETITION_PENALTY;
        }
    }

    // ── Transposition table ─────────────────────────────────────────────
    let (mut tt_entry, mut hash_move) = if excluded.is_none() {
        ctx.probe_hash_move(pos, ply)
    } else {
        (None, None)
    };

    if let Some(entry) = tt_entry.filter(|e| !root && e.depth >= depth) {
        match entry.bound {
            Bound::Exact => {
                ctx.stats.tt_cutoffs += 1;
                return entry.score;
            }
            Bound::LowerBound => alpha = alpha.max(entry.score),
            Bound::UpperBound => beta = beta.min(entry.score),
            Bound::None => {}
        }
        if alpha >= beta {
            ctx.stats.tt_cutoffs += 1;
            return entry.score;
        }
    }

    if depth <= 0 {
        return qsearch(pos, ctx, alpha, beta, ply);
    }

    let in_check = pos.in_check();
    if in_check && config.check_extension {
        depth += 1;
    }

    // ── Static evaluation ───────────────────────────────────────────────
    let eval = if in_check {
        None
    } else {
        Some(ctx.corrected_eval(pos))
    };
    ctx.evals[ply] = eval;
    let improving = match (eval, ply.checked_sub(2).and_then(|p| ctx.evals[p])) {
        (Some(now), Some(before)) => now > before,
        _ => false,
    };

    // ── Internal iterative deepening ────────────────────────────────────
    if config.internal_iterative_deepening
        && hash_move.is_none()
        && depth >= 4
        && !in_check
        && excluded.is_none()
    {
        ctx.stats.iid_searches += 1;
        negamax(pos, ctx, depth - 2, ply, alpha, beta, allow_null, None);
        if ctx.stopped() {
            return 0;
        }
        ctx.evals[ply] = eval;
        (tt_entry, hash_move) = ctx.probe_hash_move(pos, ply);
    }

    // Nodes that were once on the principal variation keep that mark.
    let tt_pv = pv_node || tt_entry.is_some_and(|e| e.is_pv);

    // ── Node-level pruning ──────────────────────────────────────────────
    let prunable = !root && !pv_node && excluded.is_none();
    if let Some(static_eval) = eval.filter(|_| prunable) {
        if config.razoring
            && depth <= 3
            && !is_mate_score(alpha)
            && static_eval + RAZOR_MARGIN[depth as usize] < alpha
        {
            let score = qsearch(pos, ctx, alpha - 1, alpha, ply);
            if ctx.stopped() {
                return 0;
            }
            if score < alpha {
                ctx.stats.razoring_cutoffs += 1;
                return score;
            }
        }

        if config.null_move
            && allow_null
            && depth >= 3
            && static_eval >= beta
            && pos.has_non_pawn_material(pos.side_to_move())
            && pos.push_null().is_ok()
        {
            let r = if depth > 6 { 3 } else { 2 };
            let score = -negamax(pos, ctx, depth - 1 - r, ply + 1, -beta, -beta + 1, false, None);
            pos.pop();
            if ctx.stopped() {
                return 0;
            }
            if score >= beta {
                ctx.stats.null_move_cutoffs += 1;
                return beta;
            }
        }

        if config.probcut && depth >= 5 && !is_mate_score(beta) {
            let cut = probcut(pos, ctx, depth, ply, beta);
            if ctx.stopped() {
                return 0;
            }
            if let Some(score) = cut {
                return score;
            }
        }
    }

    let futile = eval.is_some_and(|e| {
        config.futility
            && !root
            && depth <= 3
            && !is_mate_score(alpha)
            && e + FUTILITY_MARGIN[depth as usize] <= alpha
    });

    // ── Moves ───────────────────────────────────────────────────────────
    let mut moves = pos.legal_moves();
    if moves.is_empty() {
        return if in_check { -MATE_SCORE + ply_score } else { 0 };
    }
    if root && !ctx.root_moves.is_empty() {
        moves.retain(|mv| ctx.root_moves.contains(mv));
    }
    order_moves(pos, &mut moves, ply, hash_move, &ctx.tables.heuristics);

    if prunable && !in_check && config.multi_cut && depth >= 6 {
        let required = if depth >= 8 { 3 } else { 2 };
        let mut cuts = 0;
        for &mv in moves.iter().take(MULTI_CUT_MOVES) {
            pos.push(mv);
            let score = -negamax(pos, ctx, depth - 4, ply + 1, -beta, -beta + 1, false, None);
            pos.pop();
            if ctx.stopped() {
                return 0;
            }
            if score >= beta {
                cuts += 1;
                if cuts >= required {
                    ctx.stats.multi_cut_cutoffs += 1;
                    return beta;
                }
            }
        }
    }

    let singular_move = if config.singular_extension && !root && excluded.is_none() && depth >= 8
    {
        let found = singular_test(pos, ctx, depth, ply, tt_entry, hash_move);
        if ctx.stopped() {
            return 0;
        }
        ctx.evals[ply] = eval;
        found
    } else {
        None
    };

    let lmp_count = (3 + depth * depth) / (2 - i32::from(improving));

    // ── Move loop ───────────────────────────────────────────────────────
    let original_alpha = alpha;
    let mut best_score = -INF;
    let mut best_move = None;
    let mut moves_searched = 0usize;
    let mut quiets_tried: Vec<ChessMove> = Vec::new();

    for (move_number, &mv) in moves.iter().enumerate() {
        if excluded == Some(mv) {
            continue;
        }

        let quiet = pos.is_quiet(mv);
        let gives_check = quiet && pos.gives_check(mv);
        let reducible = quiet && !in_check && !gives_check;

        if !root && reducible {
            if config.late_move_pruning && depth <= 8 && moves_searched as i32 >= lmp_count {
                ctx.stats.lmp_prunes += 1;
                continue;
            }
            if futile && moves_searched > 0 {
                ctx.stats.futility_prunes += 1;
                continue;
            }
        }

        let new_depth = if singular_move == Some(mv) { depth } else { depth - 1 };

        let mut reduction = 0;
        if config.late_move_reduction && reducible && depth >= 3 && moves_searched >= 4 {
            reduction = lmr_reduction(depth, move_number);
            let heuristics = &ctx.tables.heuristics;
            if heuristics.killers.is_killer(ply, mv) || is_countermove(pos, mv, heuristics) {
                reduction -= 1;
            }
            if tt_pv {
                reduction -= 1;
            }
            reduction = reduction.clamp(0, depth - 2);
        }

        pos.push(mv);
        let score = if moves_searched == 0 {
            -negamax(pos, ctx, new_depth, ply + 1, -beta, -alpha, true, None)
        } else {
            let mut score =
                -negamax(pos, ctx, new_depth - reduction, ply + 1, -alpha - 1, -alpha, true, None);
            if score > alpha && reduction > 0 {
                ctx.stats.lmr_researches += 1;
                score = -negamax(pos, ctx, new_depth, ply + 1, -alpha - 1, -alpha, true, None);
            }
            if score > alpha && score < beta {
                score = -negamax(pos, ctx, new_depth, ply + 1, -beta, -alpha, true, None);
            }
            score
        };
        pos.pop();

        if ctx.stopped() {
            return 0;
        }
        moves_searched += 1;

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
            if score > alpha {
                alpha = score;
                ctx.pv.update(ply, mv);
            }
        }

        if alpha >= beta {
            if quiet {
                ctx.tables
                    .heuristics
                    .record_cutoff(pos, mv, ply, depth, &quiets_tried);
            }
            break;
        }
        if quiet {
            quiets_tried.push(mv);
        }
    }

    if moves_searched == 0 {
        return alpha;
    }

    // ── Learning and storage ────────────────────────────────────────────
    if excluded.is_none() {
        if let Some(static_eval) = eval.filter(|_| config.correction_history) {
            let error = best_score - static_eval;
            if error.abs() > MIN_ERROR && !is_mate_score(best_score) {
                ctx.tables
                    .correction
                    .update(pos, error, pos.last_move(), depth);
            }
        }

        let bound = if best_score >= beta {
            Bound::LowerBound
        } else if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::UpperBound
        };
        let stored_move = if bound == Bound::UpperBound { None } else { best_move };
        ctx.tables
            .tt
            .store(pos.key(), depth, best_score, bound, stored_move, ply, tt_pv);
    }

    best_score
}

/// Capture-only search at the horizon.
///
/// Standing pat is always allowed, so on a full window the result is never
/// below the static evaluation of a position with legal moves. Checkmate
/// and stalemate are scored exactly.
pub fn qsearch(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    mut alpha: i32,
    beta: i32,
    ply: usize,
) -> i32 {
    ctx.stats.qnodes += 1;
    if ctx.enter_node() {
        return 0;
    }
    if ply >= MAX_PLY {
        return ctx.static_eval(pos);
    }

    let moves = pos.legal_moves();
    if moves.is_empty() {
        return if pos.in_check() { -MATE_SCORE + ply as i32 } else { 0 };
    }

    let stand_pat = ctx.static_eval(pos);
    if stand_pat >= beta {
        return beta;
    }
    let delta_pruning = ctx.config.delta_pruning;
    if delta_pruning && stand_pat + BIG_DELTA < alpha {
        return alpha;
    }
    alpha = alpha.max(stand_pat);

    let noisy: Vec<ChessMove> = moves.into_iter().filter(|&mv| !pos.is_quiet(mv)).collect();
    for (mv, exchange) in order_noisy(pos, noisy) {
        if mv.get_promotion().is_none() {
            let victim = pos.captured_piece(mv).map_or(0, piece_value);
            if delta_pruning && stand_pat + victim + DELTA_MARGIN < alpha {
                continue;
            }
            if exchange < 0 {
                continue;
            }
        }

        pos.push(mv);
        let score = -qsearch(pos, ctx, -beta, -alpha, ply + 1);
        pos.pop();

        if ctx.stopped() {
            return 0;
        }
        if score >= beta {
            return beta;
        }
        alpha = alpha.max(score);
    }

    alpha
}

/// Winning captures searched shallowly against a raised beta. A fail high
/// there is taken as a fail high of the full-depth search.
fn probcut(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    depth: i32,
    ply: usize,
    beta: i32,
) -> Option<i32> {
    let probcut_beta = beta + PROBCUT_MARGIN;
    let captures: Vec<ChessMove> = pos
        .legal_moves()
        .into_iter()
        .filter(|&mv| pos.is_capture(mv))
        .collect();

    for (mv, exchange) in order_noisy(pos, captures) {
        if exchange < 0 {
            break;
        }
        pos.push(mv);
        let mut score = -qsearch(pos, ctx, -probcut_beta, -probcut_beta + 1, ply + 1);
        if score >= probcut_beta && !ctx.stopped() {
            score = -negamax(
                pos,
                ctx,
                depth - 4,
                ply + 1,
                -probcut_beta,
                -probcut_beta + 1,
                true,
                None,
            );
        }
        pos.pop();

        if ctx.stopped() {
            return None;
        }
        if score >= probcut_beta {
            ctx.stats.probcut_cutoffs += 1;
            return Some(score);
        }
    }
    None
}

/// Whether the hash move is the only move reaching near its stored score.
///
/// The node is re-searched at reduced depth with the hash move excluded
/// against a beta lowered by `2 * depth`; if nothing else gets there, the
/// hash move is returned for a one-ply extension.
fn singular_test(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    depth: i32,
    ply: usize,
    tt_entry: Option<TtEntry>,
    hash_move: Option<ChessMove>,
) -> Option<ChessMove> {
    let entry = tt_entry?;
    let hash_move = hash_move?;
    let trusted = matches!(entry.bound, Bound::LowerBound | Bound::Exact)
        && entry.depth >= depth - 3
        && !is_mate_score(entry.score);
    if !trusted {
        return None;
    }

    let singular_beta = entry.score - 2 * depth;
    let score = negamax(
        pos,
        ctx,
        (depth - 1) / 2,
        ply,
        singular_beta - 1,
        singular_beta,
        false,
        Some(hash_move),
    );
    if score < singular_beta {
        ctx.stats.singular_extensions += 1;
        Some(hash_move)
    } else {
        None
    }
}

/// Root search at `depth` inside a window centred on `prev_score`.
///
/// Shallow depths, mate scores and disabled aspiration use the full window.
/// A result outside the window widens it by `window + window * attempt / 2`
/// and searches again; after four failures the full window is used.
pub fn aspiration_search(
    pos: &mut Position,
    ctx: &mut SearchContext<'_>,
    depth: i32,
    prev_score: i32,
) -> i32 {
    let window = ctx.config.aspiration_window;
    if !ctx.config.aspiration || depth <= 4 || is_mate_score(prev_score) {
        return negamax(pos, ctx, depth, 0, -INF, INF, true, None);
    }

    let mut alpha = (prev_score - window).max(-INF);
    let mut beta = (prev_score + window).min(INF);
    let mut attempt = 0;

    loop {
        let score = negamax(pos, ctx, depth, 0, alpha, beta, true, None);
        if ctx.stopped() {
            return score;
        }
        let full_window = alpha <= -INF && beta >= INF;
        if (score > alpha && score < beta) || full_window {
            return score;
        }

        attempt += 1;
        ctx.stats.aspiration_researches += 1;
        if attempt >= ASPIRATION_ATTEMPTS {
            alpha = -INF;
            beta = INF;
        } else {
            let delta = window + window * attempt / 2;
            if score <= alpha {
                beta = (alpha + beta) / 2;
                alpha = (alpha - delta).max(-INF);
            } else {
                beta = (beta + delta).min(INF);
            }
        }
        debug!(depth, score, alpha, beta, attempt, "aspiration re-search");
    }
}
