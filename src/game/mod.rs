//! The authoritative game state machine: turn sequencing, rule
//! enforcement, scoring, elimination, clocks and history. All mutation
//! funnels through [`GameState::make_move`] and its siblings; the UI and
//! networking layers only ever read.

use crate::board::{Color, ColorSet, Piece, Position};
use crate::error::GameError;
use crate::moves::execute;
use crate::moves::movegen;
use crate::moves::types::Move;
use crate::square::Square;
use tracing::debug;

pub mod clock;
pub mod events;
pub mod wire;

pub use clock::{Clocks, TimeControl};
pub use events::{EliminationReason, EventSink, GameEvent, Outcome};
pub use wire::{WireError, WireGame};

/// Team labels for the two-versus-two variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    A,
    B,
}

/// Partition of the four colors into two teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamConfig {
    assignment: [Team; 4],
}

impl TeamConfig {
    pub fn new(assignment: [Team; 4]) -> Self {
        TeamConfig { assignment }
    }

    /// The classic pairing: opposite seats together (Red+Yellow vs
    /// Blue+Green).
    pub fn opposite_seats() -> Self {
        TeamConfig {
            assignment: [Team::A, Team::B, Team::A, Team::B],
        }
    }

    #[inline(always)]
    pub fn team_of(&self, color: Color) -> Team {
        self.assignment[color as usize]
    }

    #[inline(always)]
    pub fn same_team(&self, a: Color, b: Color) -> bool {
        self.team_of(a) == self.team_of(b)
    }

    pub fn members(&self, team: Team) -> ColorSet {
        let mut set = ColorSet::EMPTY;
        for c in Color::ALL {
            if self.team_of(c) == team {
                set.insert(c);
            }
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    FreeForAll,
    Teams(TeamConfig),
}

impl GameMode {
    pub fn team_config(&self) -> Option<&TeamConfig> {
        match self {
            GameMode::FreeForAll => None,
            GameMode::Teams(cfg) => Some(cfg),
        }
    }

    /// The mover's side: itself, plus teammates in team mode.
    pub fn allies_of(&self, color: Color) -> ColorSet {
        match self {
            GameMode::FreeForAll => {
                let mut set = ColorSet::EMPTY;
                set.insert(color);
                set
            }
            GameMode::Teams(cfg) => cfg.members(cfg.team_of(color)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    Active,
    AwaitingPromotion,
    Finished,
}

impl GameStatus {
    pub const fn name(self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::AwaitingPromotion => "awaitingPromotion",
            GameStatus::Finished => "finished",
        }
    }
}

/// Whether `make_move` demands the promotion choice up front or parks
/// the game until `complete_promotion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionMode {
    Synchronous,
    Deferred,
}

/// One committed move as the UI and wire layers see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub mv: Move,
    pub color: Color,
    pub captured: Option<(Color, Piece)>,
    pub timestamp_ms: u64,
}

/// Immutable post-move snapshot for backward navigation. Rendering reads
/// these while the live position stays put.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: MoveRecord,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPromotion {
    pub from: Square,
    pub to: Square,
    pub color: Color,
    pub is_capture: bool,
}

/// Full game state: the position plus everything the rules need that
/// outlives a single position (clocks, scores, capture lists,
/// elimination order, history, promotion substate).
pub struct GameState {
    pos: Position,
    mode: GameMode,
    status: GameStatus,
    promotion_mode: PromotionMode,
    pending_promotion: Option<PendingPromotion>,
    clocks: Clocks,
    turn_started_at: u64,
    scores: [u32; 4],
    captured: [Vec<(Color, Piece)>; 4],
    /// Who put each color in its current check, for the checkmate
    /// bounty: the victim may only be eliminated when its turn arrives,
    /// possibly after other players have moved in between.
    checked_by: [Option<Color>; 4],
    eliminations: Vec<(Color, EliminationReason)>,
    outcome: Option<Outcome>,
    last_move: Option<MoveRecord>,
    history: Vec<HistoryEntry>,
    sink: Option<EventSink>,
}

impl GameState {
    /// A fresh game, immediately active, with the turn clock anchored at
    /// `now_ms`.
    pub fn new(mode: GameMode, control: TimeControl, promotion_mode: PromotionMode, now_ms: u64) -> Self {
        GameState {
            pos: Position::initial(),
            mode,
            status: GameStatus::Active,
            promotion_mode,
            pending_promotion: None,
            clocks: Clocks::new(control),
            turn_started_at: now_ms,
            scores: [0; 4],
            captured: Default::default(),
            checked_by: [None; 4],
            eliminations: Vec::new(),
            outcome: None,
            last_move: None,
            history: Vec::new(),
            sink: None,
        }
    }

    /// A lobby-state game; call [`GameState::start`] once players are in.
    pub fn new_waiting(mode: GameMode, control: TimeControl, promotion_mode: PromotionMode) -> Self {
        let mut game = GameState::new(mode, control, promotion_mode, 0);
        game.status = GameStatus::Waiting;
        game
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.status == GameStatus::Waiting {
            self.status = GameStatus::Active;
            self.turn_started_at = now_ms;
        }
    }

    /// Install the presentation sink. The core pushes [`GameEvent`]s and
    /// never calls back in any other way.
    pub fn set_sink(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn emit(&mut self, event: GameEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink(event);
        }
    }

    // ----- read side -----

    pub fn position(&self) -> &Position {
        &self.pos
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn scores(&self) -> &[u32; 4] {
        &self.scores
    }

    pub fn score(&self, color: Color) -> u32 {
        self.scores[color as usize]
    }

    pub fn clocks(&self) -> &Clocks {
        &self.clocks
    }

    pub fn turn_started_at(&self) -> u64 {
        self.turn_started_at
    }

    pub fn captured_pieces(&self, color: Color) -> &[(Color, Piece)] {
        &self.captured[color as usize]
    }

    /// Elimination order with reasons, oldest first.
    pub fn eliminations(&self) -> &[(Color, EliminationReason)] {
        &self.eliminations
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.last_move.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn pending_promotion(&self) -> Option<&PendingPromotion> {
        self.pending_promotion.as_ref()
    }

    /// All legal moves for the player to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut buf = Vec::with_capacity(64);
        movegen::generate_legal(&self.pos, &mut buf);
        buf
    }

    /// Legal moves for the piece on `square`, validating selection:
    /// the square must hold a piece of the active, to-move color.
    pub fn selectable_moves(&self, square: Square) -> Result<Vec<Move>, GameError> {
        self.ensure_active()?;
        let (owner, _) = self
            .pos
            .piece_at(square)
            .ok_or(GameError::NoSuchPiece { square })?;
        if owner != self.pos.turn() || !self.pos.is_active(owner) {
            return Err(GameError::NotYourTurn { square, owner });
        }
        let mut buf = Vec::with_capacity(32);
        movegen::generate_legal_for_square(&self.pos, square, &mut buf);
        Ok(buf)
    }

    // ----- mutation -----

    /// Validate and commit a move. For promotions, `promotion` picks the
    /// new piece; without it, synchronous mode refuses outright while
    /// deferred mode parks the game awaiting [`GameState::complete_promotion`].
    pub fn make_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
        now_ms: u64,
    ) -> Result<(), GameError> {
        self.ensure_active()?;
        let (owner, _) = self
            .pos
            .piece_at(from)
            .ok_or(GameError::NoSuchPiece { square: from })?;
        if owner != self.pos.turn() || !self.pos.is_active(owner) {
            return Err(GameError::NotYourTurn { square: from, owner });
        }

        let mut candidates = Vec::with_capacity(32);
        movegen::generate_legal_for_square(&self.pos, from, &mut candidates);
        let matching: Vec<Move> = candidates.into_iter().filter(|m| m.to == to).collect();
        if matching.is_empty() {
            return Err(GameError::IllegalMove { from, to });
        }

        // A castle can share its king destination with a plain king
        // step (the short-wing geometries move the king one square);
        // the castle is what the player means there.
        if let Some(castle) = matching.iter().find(|m| m.is_castling()).copied() {
            self.commit(castle, now_ms);
            return Ok(());
        }

        let needs_choice = matching[0].is_promotion();
        let chosen = if needs_choice {
            match promotion {
                Some(piece) => matching
                    .into_iter()
                    .find(|m| m.promotion == Some(piece))
                    .ok_or(GameError::IllegalMove { from, to })?,
                None => {
                    if self.promotion_mode == PromotionMode::Deferred {
                        self.pending_promotion = Some(PendingPromotion {
                            from,
                            to,
                            color: owner,
                            is_capture: matching[0].is_capture(),
                        });
                        self.status = GameStatus::AwaitingPromotion;
                        debug!(%from, %to, "promotion deferred, awaiting choice");
                    }
                    return Err(GameError::PromotionRequired { square: to });
                }
            }
        } else {
            matching[0]
        };

        self.commit(chosen, now_ms);
        Ok(())
    }

    /// Resolve a deferred promotion and let the turn advance.
    pub fn complete_promotion(&mut self, piece: Piece, now_ms: u64) -> Result<(), GameError> {
        let pending = self
            .pending_promotion
            .ok_or(GameError::NoPendingPromotion)?;
        self.pending_promotion = None;
        self.status = GameStatus::Active;

        let mut candidates = Vec::with_capacity(8);
        movegen::generate_legal_for_square(&self.pos, pending.from, &mut candidates);
        let chosen = candidates
            .into_iter()
            .find(|m| m.to == pending.to && m.promotion == Some(piece))
            .ok_or(GameError::IllegalMove {
                from: pending.from,
                to: pending.to,
            })?;
        self.commit(chosen, now_ms);
        Ok(())
    }

    /// Voluntary departure. Never fails; a finished game or an already
    /// eliminated color makes it a no-op.
    pub fn resign(&mut self, color: Color, now_ms: u64) {
        self.eliminate_externally(color, EliminationReason::Resignation, now_ms);
    }

    /// Flag fall. Same semantics as resignation, different reason.
    pub fn apply_timeout(&mut self, color: Color, now_ms: u64) {
        self.eliminate_externally(color, EliminationReason::Timeout, now_ms);
    }

    /// Back to the initial position; mode, clocks settings and sink stay.
    pub fn reset(&mut self, now_ms: u64) {
        self.pos = Position::initial();
        self.status = GameStatus::Active;
        self.pending_promotion = None;
        self.clocks = Clocks::new(self.clocks.control);
        self.turn_started_at = now_ms;
        self.scores = [0; 4];
        self.captured = Default::default();
        self.checked_by = [None; 4];
        self.eliminations.clear();
        self.outcome = None;
        self.last_move = None;
        self.history.clear();
    }

    // ----- internals -----

    fn ensure_active(&self) -> Result<(), GameError> {
        match self.status {
            GameStatus::Active => Ok(()),
            other => Err(GameError::GameOver {
                status: other.name(),
            }),
        }
    }

    fn commit(&mut self, mv: Move, now_ms: u64) {
        let mover = self.pos.turn();
        let undo = execute::make_move(&mut self.pos, mv);
        let captured = undo.capture.map(|(c, p, _)| (c, p));

        if let Some((victim, piece)) = captured {
            self.captured[mover as usize].push((victim, piece));
            let betrayal = self
                .mode
                .team_config()
                .is_some_and(|cfg| cfg.same_team(mover, victim));
            if betrayal {
                self.emit(GameEvent::Betrayal {
                    attacker: mover,
                    victim,
                    piece,
                });
            } else {
                self.scores[mover as usize] += piece.capture_award();
            }
        }

        self.clocks.charge(mover, self.turn_started_at, now_ms);
        self.turn_started_at = now_ms;

        let record = MoveRecord {
            mv,
            color: mover,
            captured,
            timestamp_ms: now_ms,
        };
        self.last_move = Some(record);
        self.emit(GameEvent::MoveApplied { color: mover, mv });

        for c in Color::ALL {
            if c == mover || !self.pos.is_active(c) {
                continue;
            }
            if self.pos.in_check(c) {
                if !undo.prev_check[c as usize] {
                    self.checked_by[c as usize] = Some(mover);
                    self.emit(GameEvent::CheckAnnounced { color: c });
                }
            } else {
                self.checked_by[c as usize] = None;
            }
        }
        self.checked_by[mover as usize] = None;

        self.settle_terminal_states(Some(mover));

        self.history.push(HistoryEntry {
            record,
            position: self.pos.clone(),
        });
    }

    /// Eliminate every successive player left without a legal reply,
    /// then decide whether the game is over. A checkmate bounty goes to
    /// whoever delivered the standing check, or to `fallback` when the
    /// attribution is unknown.
    fn settle_terminal_states(&mut self, fallback: Option<Color>) {
        loop {
            if self.maybe_finish() {
                return;
            }
            let next = self.pos.turn();
            if !self.pos.is_active(next) {
                // Turn advance always lands on an active color.
                debug_assert!(false, "turn on eliminated color");
                return;
            }
            let mut replies = Vec::with_capacity(32);
            movegen::generate_legal(&self.pos, &mut replies);
            if !replies.is_empty() {
                return;
            }
            let reason = if self.pos.in_check(next) {
                EliminationReason::Checkmate
            } else {
                EliminationReason::Stalemate
            };
            if reason == EliminationReason::Checkmate
                && let Some(credit) = self.checked_by[next as usize].or(fallback)
            {
                self.scores[credit as usize] += 20;
            }
            debug!(color = ?next, ?reason, "player eliminated");
            execute::eliminate(&mut self.pos, next);
            self.checked_by[next as usize] = None;
            self.eliminations.push((next, reason));
            self.emit(GameEvent::Eliminated {
                color: next,
                reason,
            });
        }
    }

    fn eliminate_externally(&mut self, color: Color, reason: EliminationReason, now_ms: u64) {
        if self.status == GameStatus::Finished || !self.pos.is_active(color) {
            return;
        }
        // Resignation while awaiting promotion abandons the pending move.
        if self
            .pending_promotion
            .is_some_and(|p| p.color == color)
        {
            self.pending_promotion = None;
            self.status = GameStatus::Active;
        }
        let was_their_turn = self.pos.turn() == color;
        execute::eliminate(&mut self.pos, color);
        self.eliminations.push((color, reason));
        self.emit(GameEvent::Eliminated { color, reason });
        if was_their_turn {
            self.turn_started_at = now_ms;
        }
        // The successor may itself be stuck; checkmate bounties still go
        // to whoever delivered the standing check.
        self.settle_terminal_states(None);
    }

    /// Check the victory condition; returns true when the game ended.
    fn maybe_finish(&mut self) -> bool {
        if self.status == GameStatus::Finished {
            return true;
        }
        let outcome = match self.mode {
            GameMode::FreeForAll => {
                let mut active = self.pos.active_colors();
                match (active.next(), active.next()) {
                    (Some(last), None) => Some(Outcome::Winner(last)),
                    _ => None,
                }
            }
            GameMode::Teams(cfg) => {
                let alive_a = cfg
                    .members(Team::A)
                    .iter()
                    .any(|c| self.pos.is_active(c));
                let alive_b = cfg
                    .members(Team::B)
                    .iter()
                    .any(|c| self.pos.is_active(c));
                match (alive_a, alive_b) {
                    (true, false) => Some(Outcome::WinningTeam(Team::A)),
                    (false, true) => Some(Outcome::WinningTeam(Team::B)),
                    _ => None,
                }
            }
        };
        if let Some(outcome) = outcome {
            self.status = GameStatus::Finished;
            self.outcome = Some(outcome);
            self.emit(GameEvent::GameOver { outcome });
            true
        } else {
            false
        }
    }
}
