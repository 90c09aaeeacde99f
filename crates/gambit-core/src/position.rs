//! Stack-disciplined position cursor over the `chess` crate's board.
//!
//! [`Position`] is the only way the engine touches the rules: it enumerates
//! legal moves, applies and reverts them with strict `push`/`pop` pairing,
//! reports check and terminal status, and keeps the extra state the board
//! itself does not carry (move counters, incremental Zobrist key, key history
//! for repetition detection).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chess::{
    BitBoard, Board, BoardStatus, ChessMove, Color, EMPTY, File, MoveGen, Piece, Square,
};

use crate::error::PositionError;
use crate::zobrist::Zobrist;

/// Standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Terminal status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The side to move has at least one legal move.
    Ongoing,
    /// The side to move is in check and has no legal move.
    Checkmate,
    /// The side to move is not in check and has no legal move.
    Stalemate,
}

/// Everything needed to revert one `push`.
#[derive(Clone, Copy)]
struct Undo {
    board: Board,
    key: u64,
    halfmove: u32,
    fullmove: u32,
    reversible: u32,
    /// `None` for a null move.
    mv: Option<ChessMove>,
}

/// A chess position with push/pop semantics.
///
/// Cloning is cheap enough to hand each search worker a private copy.
#[derive(Clone)]
pub struct Position {
    board: Board,
    key: u64,
    halfmove: u32,
    fullmove: u32,
    /// Plies since the last capture, pawn move or null move. Bounds the
    /// repetition scan.
    reversible: u32,
    undo: Vec<Undo>,
    /// Keys of every earlier position, oldest first.
    keys: Vec<u64>,
    zobrist: Arc<Zobrist>,
}

impl Position {
    /// Starting position hashed with `zobrist`.
    pub fn startpos(zobrist: Arc<Zobrist>) -> Self {
        Self::from_board(Board::default(), 0, 1, zobrist)
    }

    /// Wrap an existing board with the given move counters.
    pub fn from_board(board: Board, halfmove: u32, fullmove: u32, zobrist: Arc<Zobrist>) -> Self {
        let key = zobrist.hash(&board);
        Self {
            board,
            key,
            halfmove,
            fullmove: fullmove.max(1),
            reversible: halfmove,
            undo: Vec::with_capacity(256),
            keys: Vec::with_capacity(256),
            zobrist,
        }
    }

    /// Parse a FEN string. The two move counters are optional and default
    /// to `0 1`.
    pub fn from_fen(fen: &str, zobrist: Arc<Zobrist>) -> Result<Self, PositionError> {
        let fen = fen.trim();
        let board = Board::from_str(fen).map_err(|e| PositionError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e:?}"),
        })?;

        let mut fields = fen.split_whitespace().skip(4);
        let halfmove = parse_counter(fields.next(), "halfmove clock", 0)?;
        let fullmove = parse_counter(fields.next(), "fullmove number", 1)?;

        Ok(Self::from_board(board, halfmove, fullmove, zobrist))
    }

    /// Seed the repetition history with keys of positions that preceded this
    /// one in the game (oldest first).
    pub fn with_history(mut self, keys: &[u64]) -> Self {
        self.keys = keys.to_vec();
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// The underlying board.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Incrementally maintained Zobrist key.
    #[inline]
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Key table this position hashes with.
    #[inline]
    pub fn zobrist(&self) -> &Arc<Zobrist> {
        &self.zobrist
    }

    /// Recompute the key from scratch (for verification).
    pub fn recompute_key(&self) -> u64 {
        self.zobrist.hash(&self.board)
    }

    /// Pawn-only signature.
    pub fn pawn_key(&self) -> u64 {
        self.zobrist.pawn_hash(&self.board)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove
    }

    /// Number of moves pushed and not yet popped.
    #[inline]
    pub fn depth(&self) -> usize {
        self.undo.len()
    }

    /// Keys of every earlier position, oldest first.
    pub fn history(&self) -> &[u64] {
        &self.keys
    }

    /// The most recent move pushed, or `None` at the root or after a null move.
    pub fn last_move(&self) -> Option<ChessMove> {
        self.undo.last().and_then(|u| u.mv)
    }

    /// Piece standing on `sq`, with its color.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.board.piece_on(sq).zip(self.board.color_on(sq))
    }

    /// All pieces of `piece` type belonging to `color`.
    #[inline]
    pub fn pieces(&self, piece: Piece, color: Color) -> BitBoard {
        *self.board.pieces(piece) & *self.board.color_combined(color)
    }

    /// Total number of pieces on the board, kings included.
    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.board.combined().popcnt()
    }

    /// Whether either side still has any castling right.
    pub fn has_castling_rights(&self) -> bool {
        [Color::White, Color::Black]
            .into_iter()
            .any(|c| self.board.castle_rights(c) != chess::CastleRights::NoRights)
    }

    /// Whether `color` owns any knight, bishop, rook or queen.
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let kings_and_pawns = *self.board.pieces(Piece::King) | *self.board.pieces(Piece::Pawn);
        (*self.board.color_combined(color) & !kings_and_pawns) != EMPTY
    }

    // ── Attacks ─────────────────────────────────────────────────────────────

    /// Pieces of either color attacking `sq`, with sliders blocked by `occupied`.
    ///
    /// Only pieces still present in `occupied` are returned, which lets SEE
    /// remove pieces one by one and discover x-ray attackers.
    pub fn attackers_with(&self, occupied: BitBoard, sq: Square) -> BitBoard {
        let b = &self.board;
        let pawns = *b.pieces(Piece::Pawn);
        let diagonal = *b.pieces(Piece::Bishop) | *b.pieces(Piece::Queen);
        let orthogonal = *b.pieces(Piece::Rook) | *b.pieces(Piece::Queen);

        let knights = chess::get_knight_moves(sq) & *b.pieces(Piece::Knight);
        let kings = chess::get_king_moves(sq) & *b.pieces(Piece::King);
        let bishops = chess::get_bishop_moves(sq, occupied) & diagonal;
        let rooks = chess::get_rook_moves(sq, occupied) & orthogonal;
        // A white pawn attacks `sq` from the squares a black pawn on `sq` would attack.
        let white_pawns =
            chess::get_pawn_attacks(sq, Color::Black, pawns & *b.color_combined(Color::White));
        let black_pawns =
            chess::get_pawn_attacks(sq, Color::White, pawns & *b.color_combined(Color::Black));

        (knights | kings | bishops | rooks | white_pawns | black_pawns) & occupied
    }

    /// Pieces of `color` attacking `sq`.
    pub fn attackers(&self, color: Color, sq: Square) -> BitBoard {
        self.attackers_with(*self.board.combined(), sq) & *self.board.color_combined(color)
    }

    // ── Move queries ────────────────────────────────────────────────────────

    /// All legal moves in generation order.
    pub fn legal_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(&self.board).collect()
    }

    /// Legal captures (en passant included) and promotions.
    pub fn noisy_moves(&self) -> Vec<ChessMove> {
        MoveGen::new_legal(&self.board)
            .filter(|&mv| self.is_capture(mv) || mv.get_promotion().is_some())
            .collect()
    }

    /// Number of legal moves for the side to move.
    pub fn legal_move_count(&self) -> usize {
        MoveGen::new_legal(&self.board).len()
    }

    /// Whether `mv` is legal here.
    pub fn is_legal(&self, mv: ChessMove) -> bool {
        self.board.legal(mv)
    }

    /// The piece making `mv`.
    #[inline]
    pub fn moved_piece(&self, mv: ChessMove) -> Option<Piece> {
        self.board.piece_on(mv.get_source())
    }

    /// Whether `mv` is a pawn capturing en passant.
    pub fn is_en_passant(&self, mv: ChessMove) -> bool {
        self.moved_piece(mv) == Some(Piece::Pawn)
            && mv.get_source().get_file() != mv.get_dest().get_file()
            && self.board.piece_on(mv.get_dest()).is_none()
    }

    /// The piece `mv` captures, if any.
    pub fn captured_piece(&self, mv: ChessMove) -> Option<Piece> {
        match self.board.piece_on(mv.get_dest()) {
            Some(piece) => Some(piece),
            None if self.is_en_passant(mv) => Some(Piece::Pawn),
            None => None,
        }
    }

    #[inline]
    pub fn is_capture(&self, mv: ChessMove) -> bool {
        self.captured_piece(mv).is_some()
    }

    /// Neither a capture nor a promotion.
    #[inline]
    pub fn is_quiet(&self, mv: ChessMove) -> bool {
        !self.is_capture(mv) && mv.get_promotion().is_none()
    }

    /// Whether `mv` is a castling move (king moving two files).
    pub fn is_castling(&self, mv: ChessMove) -> bool {
        self.moved_piece(mv) == Some(Piece::King)
            && mv.get_source().get_file().to_index().abs_diff(mv.get_dest().get_file().to_index()) == 2
    }

    /// Whether playing `mv` puts the opponent in check.
    pub fn gives_check(&self, mv: ChessMove) -> bool {
        *self.board.make_move_new(mv).checkers() != EMPTY
    }

    // ── Status ──────────────────────────────────────────────────────────────

    #[inline]
    pub fn in_check(&self) -> bool {
        *self.board.checkers() != EMPTY
    }

    pub fn status(&self) -> Status {
        match self.board.status() {
            BoardStatus::Ongoing => Status::Ongoing,
            BoardStatus::Checkmate => Status::Checkmate,
            BoardStatus::Stalemate => Status::Stalemate,
        }
    }

    /// Fifty-move rule (100 reversible plies).
    #[inline]
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove >= 100
    }

    /// Neither side can ever deliver mate: bare kings, or a single minor piece.
    pub fn is_insufficient_material(&self) -> bool {
        let b = &self.board;
        let heavy = *b.pieces(Piece::Pawn) | *b.pieces(Piece::Rook) | *b.pieces(Piece::Queen);
        if heavy != EMPTY {
            return false;
        }
        let minors = *b.pieces(Piece::Knight) | *b.pieces(Piece::Bishop);
        minors.popcnt() <= 1
    }

    /// How many earlier positions, since the last irreversible move, share
    /// this position's key and side to move.
    pub fn repetitions(&self) -> usize {
        let window = (self.reversible as usize).min(self.keys.len());
        self.keys
            .iter()
            .rev()
            .take(window)
            .skip(1)
            .step_by(2)
            .filter(|&&k| k == self.key)
            .count()
    }

    /// The current position occurred at least once before.
    #[inline]
    pub fn is_repetition(&self) -> bool {
        self.repetitions() >= 1
    }

    /// Draw by rule: fifty moves, insufficient material or threefold repetition.
    pub fn is_draw(&self) -> bool {
        self.is_fifty_move_draw() || self.is_insufficient_material() || self.repetitions() >= 2
    }

    // ── Mutation ────────────────────────────────────────────────────────────

    /// Play a move known to be legal. Every `push` must be matched by one `pop`.
    pub fn push(&mut self, mv: ChessMove) {
        debug_assert!(self.board.legal(mv), "push of illegal move {mv}");

        let before = self.board;
        let after = before.make_move_new(mv);
        let irreversible = self.moved_piece(mv) == Some(Piece::Pawn) || self.is_capture(mv);
        let key = self.key_after(&before, &after, mv);

        self.save(Some(mv));
        self.board = after;
        self.key = key;
        if irreversible {
            self.halfmove = 0;
            self.reversible = 0;
        } else {
            self.halfmove += 1;
            self.reversible += 1;
        }
        if before.side_to_move() == Color::Black {
            self.fullmove += 1;
        }
    }

    /// Play a move from untrusted input.
    pub fn try_push(&mut self, mv: ChessMove) -> Result<(), PositionError> {
        if !self.board.legal(mv) {
            return Err(PositionError::IllegalMove { uci: mv.to_string() });
        }
        self.push(mv);
        Ok(())
    }

    /// Pass the turn. Fails when the side to move is in check.
    pub fn push_null(&mut self) -> Result<(), PositionError> {
        let before = self.board;
        let after = before.null_move().ok_or(PositionError::NullMoveInCheck)?;

        let key = self.key
            ^ self.zobrist.side_to_move()
            ^ self.zobrist.en_passant(&before)
            ^ self.zobrist.en_passant(&after);

        self.save(None);
        self.board = after;
        self.key = key;
        self.halfmove += 1;
        self.reversible = 0;
        if before.side_to_move() == Color::Black {
            self.fullmove += 1;
        }
        Ok(())
    }

    /// Revert the most recent `push` or `push_null`. No-op at the root.
    pub fn pop(&mut self) {
        if let Some(undo) = self.undo.pop() {
            self.board = undo.board;
            self.key = undo.key;
            self.halfmove = undo.halfmove;
            self.fullmove = undo.fullmove;
            self.reversible = undo.reversible;
            self.keys.pop();
        }
    }

    fn save(&mut self, mv: Option<ChessMove>) {
        self.undo.push(Undo {
            board: self.board,
            key: self.key,
            halfmove: self.halfmove,
            fullmove: self.fullmove,
            reversible: self.reversible,
            mv,
        });
        self.keys.push(self.key);
    }

    /// Key after `mv`, derived from the current key by XORing out what
    /// changed and XORing in what replaced it.
    fn key_after(&self, before: &Board, after: &Board, mv: ChessMove) -> u64 {
        let z = &self.zobrist;
        let src = mv.get_source();
        let dst = mv.get_dest();

        let mut touched = BitBoard::from_square(src) | BitBoard::from_square(dst);
        if self.is_castling(mv) {
            let (rook_from, rook_to) = castling_rook_squares(src, dst);
            touched |= BitBoard::from_square(rook_from) | BitBoard::from_square(rook_to);
        } else if self.is_en_passant(mv) {
            touched |= BitBoard::from_square(Square::make_square(src.get_rank(), dst.get_file()));
        }

        let mut key = self.key;
        for sq in touched {
            key ^= z.square(before, sq) ^ z.square(after, sq);
        }
        key ^= z.side_to_move();
        key ^= z.castling(before) ^ z.castling(after);
        key ^= z.en_passant(before) ^ z.en_passant(after);
        key
    }

    /// FEN of the current position, move counters included.
    pub fn fen(&self) -> String {
        let board = self.board.to_string();
        let placement: Vec<&str> = board.split_whitespace().take(4).collect();
        format!("{} {} {}", placement.join(" "), self.halfmove, self.fullmove)
    }
}

/// Rook origin and destination for a castling king move.
fn castling_rook_squares(king_from: Square, king_to: Square) -> (Square, Square) {
    let rank = king_from.get_rank();
    if king_to.get_file().to_index() > king_from.get_file().to_index() {
        (Square::make_square(rank, File::H), Square::make_square(rank, File::F))
    } else {
        (Square::make_square(rank, File::A), Square::make_square(rank, File::D))
    }
}

fn parse_counter(
    field: Option<&str>,
    name: &'static str,
    default: u32,
) -> Result<u32, PositionError> {
    match field {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| PositionError::InvalidMoveCounter {
            field: name,
            found: s.to_string(),
        }),
    }
}

impl FromStr for Position {
    type Err = PositionError;

    /// Parse with a freshly built default key table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s, Arc::new(Zobrist::default()))
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos(Arc::new(Zobrist::default()))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.fen())
            .field("key", &format_args!("{:#018x}", self.key))
            .field("depth", &self.undo.len())
            .finish()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    fn mv(from: Square, to: Square) -> ChessMove {
        ChessMove::new(from, to, None)
    }

    #[test]
    fn startpos_has_twenty_moves() {
        let p = Position::default();
        assert_eq!(p.legal_moves().len(), 20);
        assert_eq!(p.legal_move_count(), 20);
        assert!(p.noisy_moves().is_empty());
    }

    #[test]
    fn fen_counters_are_parsed() {
        let p = pos("4k3/8/8/8/8/8/8/4K3 w - - 37 52");
        assert_eq!(p.halfmove_clock(), 37);
        assert_eq!(p.fullmove_number(), 52);
        assert_eq!(p.fen(), "4k3/8/8/8/8/8/8/4K3 w - - 37 52");
    }

    #[test]
    fn fen_without_counters_defaults() {
        let p = pos("4k3/8/8/8/8/8/8/4K3 b - -");
        assert_eq!(p.halfmove_clock(), 0);
        assert_eq!(p.fullmove_number(), 1);
    }

    #[test]
    fn bad_fen_is_rejected() {
        assert!(matches!(
            "not a fen".parse::<Position>(),
            Err(PositionError::InvalidFen { .. })
        ));
        assert!(matches!(
            "4k3/8/8/8/8/8/8/4K3 w - - x 1".parse::<Position>(),
            Err(PositionError::InvalidMoveCounter { .. })
        ));
    }

    #[test]
    fn push_pop_restores_everything() {
        let mut p = Position::default();
        let start_key = p.key();
        let start_fen = p.fen();

        p.push(mv(Square::E2, Square::E4));
        p.push(mv(Square::E7, Square::E5));
        p.push(mv(Square::G1, Square::F3));
        assert_eq!(p.depth(), 3);
        assert_eq!(p.fullmove_number(), 2);

        p.pop();
        p.pop();
        p.pop();
        assert_eq!(p.key(), start_key);
        assert_eq!(p.fen(), start_fen);
        assert!(p.history().is_empty());
    }

    #[test]
    fn incremental_key_matches_scratch_for_special_moves() {
        // Castling both sides, en passant, promotion with capture.
        let mut p = pos("r3k2r/1pp2ppp/8/3Pp3/8/8/1PP2PPP/R3K2R w KQkq e6 0 1");
        let line = [
            mv(Square::D5, Square::E6), // en passant
            mv(Square::E8, Square::C8), // black castles long
            mv(Square::E1, Square::G1), // white castles short
        ];
        for m in line {
            assert!(p.is_legal(m), "{m} should be legal");
            p.push(m);
            assert_eq!(p.key(), p.recompute_key(), "after {m}");
        }

        let mut promo = pos("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let m = ChessMove::new(Square::A7, Square::B8, Some(Piece::Queen));
        promo.push(m);
        assert_eq!(promo.key(), promo.recompute_key());
    }

    #[test]
    fn castling_is_detected() {
        let p = pos("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert!(p.is_castling(mv(Square::E1, Square::G1)));
        assert!(p.is_castling(mv(Square::E1, Square::C1)));
        assert!(!p.is_castling(mv(Square::E1, Square::F1)));
    }

    #[test]
    fn null_move_flips_side_and_restores() {
        let mut p = Position::default();
        let key = p.key();
        p.push_null().unwrap();
        assert_eq!(p.side_to_move(), Color::Black);
        assert_eq!(p.key(), p.recompute_key());
        assert_eq!(p.last_move(), None);
        p.pop();
        assert_eq!(p.key(), key);
    }

    #[test]
    fn null_move_refused_in_check() {
        let mut p = pos("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1");
        assert!(p.in_check());
        assert_eq!(p.push_null(), Err(PositionError::NullMoveInCheck));
        assert_eq!(p.depth(), 0);
    }

    #[test]
    fn knight_shuffle_repeats() {
        let mut p = Position::default();
        assert!(!p.is_repetition());
        for m in [
            mv(Square::G1, Square::F3),
            mv(Square::G8, Square::F6),
            mv(Square::F3, Square::G1),
            mv(Square::F6, Square::G8),
        ] {
            p.push(m);
        }
        assert!(p.is_repetition());
        assert_eq!(p.repetitions(), 1);
        assert!(!p.is_draw());
    }

    #[test]
    fn pawn_move_resets_repetition_window() {
        let mut p = Position::default();
        p.push(mv(Square::G1, Square::F3));
        p.push(mv(Square::G8, Square::F6));
        p.push(mv(Square::E2, Square::E4));
        assert_eq!(p.halfmove_clock(), 0);
        assert!(!p.is_repetition());
    }

    #[test]
    fn try_push_rejects_illegal() {
        let mut p = Position::default();
        let err = p.try_push(mv(Square::E2, Square::E5)).unwrap_err();
        assert_eq!(err, PositionError::IllegalMove { uci: "e2e5".to_string() });
        assert_eq!(p.depth(), 0);
    }

    #[test]
    fn en_passant_capture_is_a_capture() {
        let p = pos("4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 1");
        let ep = mv(Square::D5, Square::E6);
        assert!(p.is_en_passant(ep));
        assert_eq!(p.captured_piece(ep), Some(Piece::Pawn));
        assert!(p.noisy_moves().contains(&ep));
    }

    #[test]
    fn status_detects_mate_and_stalemate() {
        assert_eq!(pos("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1").status(), Status::Checkmate);
        assert_eq!(pos("k7/2K5/1Q6/8/8/8/8/8 b - - 0 1").status(), Status::Stalemate);
        assert_eq!(Position::default().status(), Status::Ongoing);
    }

    #[test]
    fn insufficient_material() {
        assert!(pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1").is_insufficient_material());
        assert!(pos("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").is_insufficient_material());
        assert!(!pos("4k3/8/8/8/8/8/8/2BBK3 w - - 0 1").is_insufficient_material());
        assert!(!pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").is_insufficient_material());
    }

    #[test]
    fn fifty_move_rule() {
        assert!(pos("4k3/8/8/8/8/8/8/R3K3 w - - 100 80").is_fifty_move_draw());
        assert!(!pos("4k3/8/8/8/8/8/8/R3K3 w - - 99 80").is_fifty_move_draw());
    }

    #[test]
    fn attackers_of_square() {
        // Only the d4 pawn hits e5; only the e5 pawn hits d4.
        let p = pos("4k3/8/5n2/4p3/3P4/2N5/8/4K3 w - - 0 1");
        let white = p.attackers(Color::White, Square::E5);
        assert_eq!(white.popcnt(), 1);
        assert!(white & BitBoard::from_square(Square::D4) != EMPTY);
        let black = p.attackers(Color::Black, Square::D4);
        assert_eq!(black.popcnt(), 1);
    }

    #[test]
    fn non_pawn_material() {
        let p = pos("4k3/pppp4/8/8/8/8/8/R3K3 w - - 0 1");
        assert!(p.has_non_pawn_material(Color::White));
        assert!(!p.has_non_pawn_material(Color::Black));
    }
}
