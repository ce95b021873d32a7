//! Turn orchestration: whose move it is, when to ask the engine, and what to
//! do with the answer.
//!
//! Everything runs on one task. Inputs arrive as method calls carrying the
//! current `Instant` (human actions, engine lines, timer ticks) and the
//! orchestrator reacts synchronously; it never blocks or sleeps.

use std::time::{Duration, Instant};

use chess_core::{DifficultyTier, MoveToken, PromotionKind, RulesEngine};
use shakmaty::{Color, Square};
use tracing::{debug, info, warn};

use crate::config::DuelConfig;
use crate::error::DuelError;
use crate::evaluation::EvaluationSample;
use crate::hint::{HintChange, HintScheduler};
use crate::presenter::{Presenter, UiEvent};
use crate::promotion::PromotionRequest;
use crate::protocol::SearchParameters;
use crate::session::{
    Admission, AnalysisRequest, AnalysisSession, EngineTransport, Purpose, SessionEvent, Ticket,
};
use crate::timers::{TimerId, TimerKind, Timers};

/// Progress of the AI's move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTurn {
    /// Waiting for the session to accept the search.
    Queued {
        /// When the AI turn began; the thinking floor counts from here.
        issued: Instant,
        retry: Option<TimerId>,
    },
    Searching {
        issued: Instant,
        ticket: Ticket,
    },
    /// Result in hand; held until the minimum thinking time has passed.
    Settling {
        best_move: Option<MoveToken>,
        timer: TimerId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    HumanToMove,
    AwaitingPromotionChoice(PromotionRequest),
    AiThinking(AiTurn),
    GameOver,
}

/// What became of a human move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanMove {
    Committed,
    PromotionPending,
    /// Illegal, out of turn, or the engine is not ready yet. Nothing changed.
    Ignored,
}

#[derive(Debug, Default)]
struct Background {
    /// Generation still owed a background search.
    wanted: Option<u64>,
    retry: Option<TimerId>,
}

pub struct Orchestrator<R, T, P> {
    rules: R,
    session: AnalysisSession<T>,
    presenter: P,
    timers: Timers,
    hints: HintScheduler,
    state: TurnState,
    /// Bumped on every position change; results tagged with an older value are stale.
    generation: u64,
    background: Background,
    evaluation: EvaluationSample,
    human: Color,
    difficulty: DifficultyTier,
    search: SearchParameters,
    ai_min_think: Duration,
    retry_backoff: Duration,
}

impl<R, T, P> Orchestrator<R, T, P>
where
    R: RulesEngine,
    T: EngineTransport,
    P: Presenter,
{
    pub fn new(config: &DuelConfig, mut session: AnalysisSession<T>, rules: R, presenter: P) -> Self {
        session.configure_difficulty(config.difficulty);
        Self {
            rules,
            session,
            presenter,
            timers: Timers::new(),
            hints: HintScheduler::new(config.hints_enabled, config.hint_delay),
            state: TurnState::HumanToMove,
            generation: 0,
            background: Background::default(),
            evaluation: EvaluationSample::even(),
            human: config.human_color,
            difficulty: config.difficulty,
            search: config.search,
            ai_min_think: config.ai_min_think,
            retry_backoff: config.retry_backoff,
        }
    }

    // ---- Inputs ----

    /// Feed one line of engine output.
    pub fn on_engine_line(&mut self, line: &str, now: Instant) -> Result<(), DuelError> {
        match self.session.handle_line(line)? {
            Some(SessionEvent::Ready) => self.on_ready(now),
            Some(SessionEvent::Evaluation { ticket, sample }) => {
                if ticket.generation == self.generation {
                    self.evaluation = sample;
                    self.emit(UiEvent::Evaluation(sample));
                }
                Ok(())
            }
            Some(SessionEvent::Completed { ticket, best_move }) => {
                self.on_completed(ticket, best_move, now)
            }
            None => Ok(()),
        }
    }

    /// Fire every timer due at `now`.
    pub fn on_tick(&mut self, now: Instant) -> Result<(), DuelError> {
        for (id, kind) in self.timers.take_due(now) {
            match kind {
                TimerKind::HintReveal => {
                    let eligible = self.hint_eligible();
                    let change = self.hints.on_timer(id, eligible);
                    self.apply_hint(change);
                }
                TimerKind::AiMoveReady => self.finish_ai_turn(id, now)?,
                TimerKind::RetryTurn => {
                    if let TurnState::AiThinking(AiTurn::Queued { retry: Some(r), .. }) = self.state {
                        if r == id {
                            self.submit_turn(now)?;
                        }
                    }
                }
                TimerKind::RetryBackground => {
                    if self.background.retry == Some(id) {
                        self.background.retry = None;
                        self.pump_background(now)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Human plays a move. A pawn reaching its last rank without a piece
    /// chosen is held until [`Self::choose_promotion`].
    pub fn submit_move(&mut self, mv: MoveToken, now: Instant) -> Result<HumanMove, DuelError> {
        if !self.accepts_human_input() {
            debug!(%mv, state = ?self.state, "Move ignored");
            return Ok(HumanMove::Ignored);
        }
        self.rearm_hints(now);

        if mv.promotion.is_none() && self.rules.is_promotion_move(mv.origin, mv.destination) {
            if !self.rules.is_legal(&mv.with_promotion(PromotionKind::Queen)) {
                return Ok(HumanMove::Ignored);
            }
            let request = PromotionRequest::new(mv.origin, mv.destination);
            self.state = TurnState::AwaitingPromotionChoice(request);
            self.emit(UiEvent::PromotionPending(request));
            return Ok(HumanMove::PromotionPending);
        }

        self.commit_human(mv, now)
    }

    pub fn choose_promotion(&mut self, kind: PromotionKind, now: Instant) -> Result<HumanMove, DuelError> {
        let TurnState::AwaitingPromotionChoice(request) = self.state else {
            return Ok(HumanMove::Ignored);
        };
        self.state = TurnState::HumanToMove;
        self.commit_human(request.resolve(kind), now)
    }

    /// Drop a pending promotion without moving. Returns whether one was pending.
    pub fn cancel_promotion(&mut self, now: Instant) -> bool {
        if !matches!(self.state, TurnState::AwaitingPromotionChoice(_)) {
            return false;
        }
        self.state = TurnState::HumanToMove;
        self.rearm_hints(now);
        true
    }

    /// Any click or selection on the human's turn restarts the hint delay.
    pub fn note_interaction(&mut self, now: Instant) {
        if self.accepts_human_input() {
            self.rearm_hints(now);
        }
    }

    /// Pick up the piece on `square` and show where it can go.
    ///
    /// Only the human's own pieces on the human's turn are selectable; the
    /// returned list is empty otherwise.
    pub fn select_square(&mut self, square: Square, now: Instant) -> Vec<Square> {
        if !self.accepts_human_input() {
            return Vec::new();
        }
        self.rearm_hints(now);
        match self.rules.piece_at(square) {
            Some(piece) if piece.color == self.human => {
                let destinations = self.rules.legal_destinations(square);
                self.emit(UiEvent::LegalMoves {
                    origin: square,
                    destinations: destinations.clone(),
                });
                destinations
            }
            _ => Vec::new(),
        }
    }

    /// Show a message to the player.
    pub fn announce(&mut self, text: impl Into<String>) {
        self.emit(UiEvent::Status(text.into()));
    }

    /// Start a new game. In-flight searches run to completion and are discarded.
    pub fn reset(&mut self, now: Instant) -> Result<(), DuelError> {
        info!("New game");
        self.abandon_turn();
        self.rules.reset();
        self.evaluation = EvaluationSample::even();
        self.emit(UiEvent::Evaluation(self.evaluation));
        self.advance(now, None)
    }

    /// Take back the last human move and any AI reply to it.
    pub fn undo(&mut self, now: Instant) -> Result<(), DuelError> {
        let plies = if self.rules.side_to_move() == self.human { 2 } else { 1 };
        if self.rules.history().len() < plies.max(2) {
            return self.reset(now);
        }

        self.abandon_turn();
        for _ in 0..plies {
            self.rules.undo_last_move();
        }
        info!(plies, "Undo");
        let last = self.rules.history().last().map(|m| m.token);
        self.advance(now, last)
    }

    pub fn set_difficulty(&mut self, tier: DifficultyTier) {
        self.difficulty = tier;
        self.session.configure_difficulty(tier);
    }

    pub fn set_hints(&mut self, enabled: bool, now: Instant) {
        let eligible = self.hint_eligible();
        let change = self.hints.set_enabled(enabled, &mut self.timers, now, eligible);
        self.apply_hint(change);
    }

    /// Draw the board, evaluation and status again.
    pub fn redraw(&mut self) {
        let last_move = self.rules.history().last().map(|m| m.token);
        self.emit(UiEvent::BoardChanged { last_move });
        self.emit(UiEvent::Evaluation(self.evaluation));
        let status = self.rules.status_text();
        self.emit(UiEvent::Status(status));
    }

    pub fn quit(&mut self) -> Result<(), DuelError> {
        self.session.quit()
    }

    // ---- Accessors ----

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn session(&self) -> &AnalysisSession<T> {
        &self.session
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn hints(&self) -> &HintScheduler {
        &self.hints
    }

    pub fn evaluation(&self) -> &EvaluationSample {
        &self.evaluation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn difficulty(&self) -> DifficultyTier {
        self.difficulty
    }

    pub fn human(&self) -> Color {
        self.human
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // ---- Transitions ----

    fn on_ready(&mut self, now: Instant) -> Result<(), DuelError> {
        self.emit(UiEvent::EngineReady);
        self.settle(now)
    }

    fn commit_human(&mut self, mv: MoveToken, now: Instant) -> Result<HumanMove, DuelError> {
        match self.rules.commit(&mv) {
            Ok(played) => {
                let token = played.token;
                debug!(%token, san = %played.san, "Human move");
                self.advance(now, Some(token))?;
                Ok(HumanMove::Committed)
            }
            Err(e) => {
                debug!(error = %e, "Human move rejected");
                Ok(HumanMove::Ignored)
            }
        }
    }

    /// The position changed: invalidate everything tied to the old one.
    fn advance(&mut self, now: Instant, last_move: Option<MoveToken>) -> Result<(), DuelError> {
        self.generation += 1;
        self.hints.invalidate_candidate();
        self.emit(UiEvent::BoardChanged { last_move });
        self.settle(now)
    }

    /// Pick the state for the current position and queue the searches it needs.
    fn settle(&mut self, now: Instant) -> Result<(), DuelError> {
        if self.rules.is_game_over() {
            self.state = TurnState::GameOver;
            let status = self.rules.status_text();
            info!(%status, "Game over");
            self.emit(UiEvent::GameOver(status));
        } else if self.session.is_ready() && self.rules.side_to_move() != self.human {
            self.begin_ai_turn(now)?;
        } else {
            self.state = TurnState::HumanToMove;
            let status = if self.session.is_ready() {
                self.rules.status_text()
            } else {
                "Loading engine".to_string()
            };
            self.emit(UiEvent::Status(status));
        }

        self.background.wanted = Some(self.generation);
        self.pump_background(now)?;
        self.rearm_hints(now);
        Ok(())
    }

    fn begin_ai_turn(&mut self, now: Instant) -> Result<(), DuelError> {
        self.state = TurnState::AiThinking(AiTurn::Queued {
            issued: now,
            retry: None,
        });
        self.emit(UiEvent::AiThinking);
        self.submit_turn(now)
    }

    /// Offer the AI's search to the session; on rejection, retry after the backoff.
    fn submit_turn(&mut self, now: Instant) -> Result<(), DuelError> {
        let TurnState::AiThinking(AiTurn::Queued { issued, retry }) = self.state else {
            return Ok(());
        };
        if let Some(id) = retry {
            self.timers.cancel(id);
        }

        let request = self.request(Purpose::Turn, self.search);
        match self.session.try_request(request)? {
            Admission::Accepted(ticket) => {
                self.state = TurnState::AiThinking(AiTurn::Searching { issued, ticket });
            }
            Admission::Rejected(reason) => {
                debug!(?reason, "AI search deferred");
                let retry = self.timers.arm(now + self.retry_backoff, TimerKind::RetryTurn);
                self.state = TurnState::AiThinking(AiTurn::Queued {
                    issued,
                    retry: Some(retry),
                });
            }
        }
        Ok(())
    }

    /// Issue the owed background search if the slot allows.
    fn pump_background(&mut self, now: Instant) -> Result<(), DuelError> {
        let Some(generation) = self.background.wanted else {
            return Ok(());
        };
        if let Some(id) = self.background.retry.take() {
            self.timers.cancel(id);
        }
        // The AI's own search covers this position's evaluation.
        if generation != self.generation || matches!(self.state, TurnState::AiThinking(_)) {
            self.background.wanted = None;
            return Ok(());
        }
        if !self.session.is_ready() {
            // Picked up again once the handshake completes.
            return Ok(());
        }

        let request = self.request(Purpose::Background, SearchParameters::EngineDefault);
        match self.session.try_request(request)? {
            Admission::Accepted(_) => self.background.wanted = None,
            Admission::Rejected(reason) => {
                debug!(?reason, "Background search deferred");
                self.background.retry =
                    Some(self.timers.arm(now + self.retry_backoff, TimerKind::RetryBackground));
            }
        }
        Ok(())
    }

    fn on_completed(
        &mut self,
        ticket: Ticket,
        best_move: Option<MoveToken>,
        now: Instant,
    ) -> Result<(), DuelError> {
        if ticket.generation != self.generation {
            debug!(?ticket, current = self.generation, "Discarding stale result");
        } else {
            match ticket.purpose {
                Purpose::Turn => self.on_turn_result(ticket, best_move, now),
                Purpose::Background => {
                    let eligible = self.hint_eligible();
                    let change = self.hints.offer_candidate(best_move, eligible);
                    self.apply_hint(change);
                }
            }
        }

        // The slot is free again.
        self.submit_turn(now)?;
        self.pump_background(now)
    }

    fn on_turn_result(&mut self, ticket: Ticket, best_move: Option<MoveToken>, now: Instant) {
        let TurnState::AiThinking(AiTurn::Searching { issued, ticket: current }) = self.state else {
            return;
        };
        if current != ticket {
            return;
        }
        let wait = self.ai_min_think.saturating_sub(now.saturating_duration_since(issued));
        let timer = self.timers.arm(now + wait, TimerKind::AiMoveReady);
        self.state = TurnState::AiThinking(AiTurn::Settling { best_move, timer });
    }

    fn finish_ai_turn(&mut self, id: TimerId, now: Instant) -> Result<(), DuelError> {
        let TurnState::AiThinking(AiTurn::Settling { best_move, timer }) = self.state else {
            return Ok(());
        };
        if timer != id {
            return Ok(());
        }

        let Some(mv) = best_move else {
            // No legal move: the game ended on the human's last move.
            self.state = TurnState::GameOver;
            let status = self.rules.status_text();
            info!(%status, "Engine has no move");
            self.emit(UiEvent::GameOver(status));
            self.rearm_hints(now);
            return Ok(());
        };

        let mv = if mv.promotion.is_none() && self.rules.is_promotion_move(mv.origin, mv.destination) {
            mv.with_promotion(PromotionKind::Queen)
        } else {
            mv
        };

        match self.rules.commit(&mv) {
            Ok(played) => {
                let token = played.token;
                info!(%token, san = %played.san, "Engine move");
                self.advance(now, Some(token))
            }
            Err(e) => {
                warn!(error = %e, "Engine move rejected, searching again");
                self.begin_ai_turn(now)
            }
        }
    }

    /// Cancel AI bookkeeping and any pending promotion.
    fn abandon_turn(&mut self) {
        match self.state {
            TurnState::AiThinking(AiTurn::Queued { retry: Some(id), .. })
            | TurnState::AiThinking(AiTurn::Settling { timer: id, .. }) => {
                self.timers.cancel(id);
            }
            _ => {}
        }
        self.state = TurnState::HumanToMove;
    }

    // ---- Helpers ----

    fn request(&self, purpose: Purpose, params: SearchParameters) -> AnalysisRequest {
        AnalysisRequest {
            position: self.rules.history_tokens(),
            params,
            generation: self.generation,
            purpose,
        }
    }

    fn accepts_human_input(&self) -> bool {
        self.session.is_ready()
            && self.state == TurnState::HumanToMove
            && self.rules.side_to_move() == self.human
    }

    fn hint_eligible(&self) -> bool {
        self.accepts_human_input() && !self.rules.is_game_over()
    }

    fn rearm_hints(&mut self, now: Instant) {
        let eligible = self.hint_eligible();
        let change = self.hints.rearm(&mut self.timers, now, eligible);
        self.apply_hint(change);
    }

    fn apply_hint(&mut self, change: HintChange) {
        match change {
            HintChange::Revealed(mv) => self.emit(UiEvent::HintShown(mv)),
            HintChange::Cleared => self.emit(UiEvent::HintCleared),
            HintChange::Unchanged => {}
        }
    }

    fn emit(&mut self, event: UiEvent) {
        self.presenter.notify(event, &self.rules);
    }
}
