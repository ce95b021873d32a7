//! Analysis session over the engine's line protocol.
//!
//! The engine answers with any number of `info` lines followed by exactly one
//! `bestmove`, and nothing in those lines says which request they belong to.
//! The session therefore admits at most one search at a time: the next
//! `bestmove` always answers the request currently in flight. A caller that
//! finds the slot taken gets [`Admission::Rejected`] up front and retries later.

use chess_core::{DifficultyTier, MoveToken};
use shakmaty::Color;
use tracing::{debug, info};

use crate::error::DuelError;
use crate::evaluation::{normalize, EvaluationSample};
use crate::protocol::{parse_line, Command, EngineLine, InfoLine, SearchParameters};

/// Outbound half of the engine connection. Sends are fire-and-forget.
pub trait EngineTransport {
    fn send(&mut self, command: &Command) -> Result<(), DuelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    HandshakePending,
    Ready,
}

/// Who asked for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// The AI's own move.
    Turn,
    /// Evaluation refresh and hint precomputation.
    Background,
}

/// Identifies an accepted request and the game generation it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: u64,
    pub generation: u64,
    pub purpose: Purpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Full move list from the start position; resent on every request.
    pub position: Vec<MoveToken>,
    pub params: SearchParameters,
    pub generation: u64,
    pub purpose: Purpose,
}

impl AnalysisRequest {
    pub fn side_to_move(&self) -> Color {
        if self.position.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotReady,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted(Ticket),
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Handshake finished; requests are now accepted.
    Ready,
    /// A primary-line score for the request in flight.
    Evaluation {
        ticket: Ticket,
        sample: EvaluationSample,
    },
    /// The request in flight finished. `None` means the engine had no move.
    Completed {
        ticket: Ticket,
        best_move: Option<MoveToken>,
    },
}

#[derive(Debug)]
struct InFlight {
    ticket: Ticket,
    side_to_move: Color,
    /// First move of the most recent rank-1 PV.
    fallback: Option<MoveToken>,
}

pub struct AnalysisSession<T> {
    transport: T,
    phase: SessionPhase,
    depth: u32,
    multipv: u32,
    inflight: Option<InFlight>,
    next_ticket: u64,
    searches_sent: u64,
    resolved: u64,
}

impl<T: EngineTransport> AnalysisSession<T> {
    pub fn new(transport: T, multipv: u32) -> Self {
        Self {
            transport,
            phase: SessionPhase::Uninitialized,
            depth: DifficultyTier::default().search_depth(),
            multipv: multipv.max(1),
            inflight: None,
            next_ticket: 0,
            searches_sent: 0,
            resolved: 0,
        }
    }

    /// Create a session and send the handshake.
    pub fn connect(transport: T, multipv: u32) -> Result<Self, DuelError> {
        let mut session = Self::new(transport, multipv);
        session.start()?;
        Ok(session)
    }

    pub fn start(&mut self) -> Result<(), DuelError> {
        if self.phase != SessionPhase::Uninitialized {
            return Ok(());
        }
        self.transport.send(&Command::Uci)?;
        self.phase = SessionPhase::HandshakePending;
        Ok(())
    }

    /// Set the depth used by [`SearchParameters::EngineDefault`]. No engine traffic.
    pub fn configure_difficulty(&mut self, tier: DifficultyTier) {
        self.depth = tier.search_depth();
        debug!(%tier, depth = self.depth, "Difficulty configured");
    }

    /// Submit a search if the slot is free.
    ///
    /// On acceptance the full position and one `go` command are sent. A
    /// rejection sends nothing; the caller retries after a backoff.
    pub fn try_request(&mut self, request: AnalysisRequest) -> Result<Admission, DuelError> {
        if self.phase != SessionPhase::Ready {
            return Ok(Admission::Rejected(Rejection::NotReady));
        }
        if self.inflight.is_some() {
            return Ok(Admission::Rejected(Rejection::Busy));
        }

        let side_to_move = request.side_to_move();
        let go = Command::go(request.params, self.depth);

        self.transport.send(&Command::Position {
            moves: request.position,
        })?;
        self.transport.send(&go)?;
        self.searches_sent += 1;

        self.next_ticket += 1;
        let ticket = Ticket {
            id: self.next_ticket,
            generation: request.generation,
            purpose: request.purpose,
        };
        self.inflight = Some(InFlight {
            ticket,
            side_to_move,
            fallback: None,
        });
        debug!(?ticket, %go, "Search accepted");
        Ok(Admission::Accepted(ticket))
    }

    /// Feed one line of engine output.
    pub fn handle_line(&mut self, line: &str) -> Result<Option<SessionEvent>, DuelError> {
        match parse_line(line) {
            EngineLine::UciOk => self.on_handshake(),
            EngineLine::Info(info) => Ok(self.on_info(info)),
            EngineLine::BestMove(token) => Ok(self.on_bestmove(token.as_deref())),
            EngineLine::ReadyOk | EngineLine::Other => Ok(None),
        }
    }

    fn on_handshake(&mut self) -> Result<Option<SessionEvent>, DuelError> {
        if self.phase != SessionPhase::HandshakePending {
            return Ok(None);
        }
        self.transport.send(&Command::SetOption {
            name: "MultiPV".to_string(),
            value: self.multipv.to_string(),
        })?;
        self.phase = SessionPhase::Ready;
        info!(multipv = self.multipv, "Engine ready");
        Ok(Some(SessionEvent::Ready))
    }

    fn on_info(&mut self, info: InfoLine) -> Option<SessionEvent> {
        let inflight = self.inflight.as_mut()?;
        if info.rank() != 1 {
            return None;
        }

        if let Some(candidate) = info.pv.first().and_then(|m| m.parse::<MoveToken>().ok()) {
            inflight.fallback = Some(candidate);
        }

        let score = info.score?;
        Some(SessionEvent::Evaluation {
            ticket: inflight.ticket,
            sample: normalize(score, inflight.side_to_move),
        })
    }

    fn on_bestmove(&mut self, token: Option<&str>) -> Option<SessionEvent> {
        let Some(inflight) = self.inflight.take() else {
            debug!(?token, "Stray bestmove ignored");
            return None;
        };
        self.resolved += 1;

        // The declared move wins; the PV fallback only covers an unparseable token.
        let declared = token.and_then(|t| t.parse::<MoveToken>().ok());
        let best_move = declared.or_else(|| match token {
            Some(t) if is_no_move(t) => None,
            _ => inflight.fallback,
        });

        debug!(ticket = ?inflight.ticket, ?best_move, "Search completed");
        Some(SessionEvent::Completed {
            ticket: inflight.ticket,
            best_move,
        })
    }

    pub fn quit(&mut self) -> Result<(), DuelError> {
        self.transport.send(&Command::Quit)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    pub fn is_busy(&self) -> bool {
        self.inflight.is_some()
    }

    /// Ticket of the request in flight, if any.
    pub fn in_flight(&self) -> Option<Ticket> {
        self.inflight.as_ref().map(|f| f.ticket)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn searches_sent(&self) -> u64 {
        self.searches_sent
    }

    pub fn resolved(&self) -> u64 {
        self.resolved
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// Engines spell "no legal move" as `(none)` or `0000`.
fn is_no_move(token: &str) -> bool {
    matches!(token, "(none)" | "0000" | "none")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<String>,
    }

    impl EngineTransport for Recorder {
        fn send(&mut self, command: &Command) -> Result<(), DuelError> {
            self.sent.push(command.to_string());
            Ok(())
        }
    }

    fn ready_session() -> AnalysisSession<Recorder> {
        let mut session = AnalysisSession::connect(Recorder::default(), 3).unwrap();
        assert_eq!(session.handle_line("uciok").unwrap(), Some(SessionEvent::Ready));
        session
    }

    fn request(moves: &[&str], generation: u64) -> AnalysisRequest {
        AnalysisRequest {
            position: moves.iter().map(|m| m.parse().unwrap()).collect(),
            params: SearchParameters::EngineDefault,
            generation,
            purpose: Purpose::Background,
        }
    }

    #[test]
    fn test_handshake_then_multipv() {
        let mut session = AnalysisSession::connect(Recorder::default(), 3).unwrap();
        assert_eq!(session.phase(), SessionPhase::HandshakePending);
        assert_eq!(
            session.try_request(request(&[], 0)).unwrap(),
            Admission::Rejected(Rejection::NotReady)
        );

        session.handle_line("id name Stockfish").unwrap();
        session.handle_line("uciok").unwrap();
        assert!(session.is_ready());
        assert_eq!(
            session.transport().sent,
            vec!["uci", "setoption name MultiPV value 3"]
        );

        // A second uciok does not resend the option.
        assert_eq!(session.handle_line("uciok").unwrap(), None);
        assert_eq!(session.transport().sent.len(), 2);
    }

    #[test]
    fn test_single_flight() {
        let mut session = ready_session();
        let first = session.try_request(request(&["e2e4"], 1)).unwrap();
        assert!(matches!(first, Admission::Accepted(_)));
        assert_eq!(
            session.try_request(request(&["e2e4"], 1)).unwrap(),
            Admission::Rejected(Rejection::Busy)
        );
        assert_eq!(session.searches_sent(), 1);

        session.handle_line("bestmove e7e5").unwrap();
        assert_eq!(session.resolved(), 1);
        assert!(matches!(
            session.try_request(request(&["e2e4"], 1)).unwrap(),
            Admission::Accepted(_)
        ));
        assert_eq!(session.searches_sent(), 2);
    }

    #[test]
    fn test_difficulty_sets_default_depth() {
        let mut session = ready_session();
        session.configure_difficulty(DifficultyTier::Level3);
        session.try_request(request(&[], 0)).unwrap();
        assert_eq!(session.transport().sent.last().unwrap(), "go depth 4");
    }

    #[test]
    fn test_declared_move_preferred_over_fallback() {
        let mut session = ready_session();
        session.try_request(request(&[], 0)).unwrap();
        session
            .handle_line("info depth 5 multipv 1 score cp 20 pv d2d4 d7d5")
            .unwrap();
        let event = session.handle_line("bestmove e2e4 ponder e7e5").unwrap();
        let Some(SessionEvent::Completed { best_move, .. }) = event else {
            panic!("expected completion");
        };
        assert_eq!(best_move, Some("e2e4".parse().unwrap()));
    }

    #[test]
    fn test_fallback_used_for_unparseable_declared_move() {
        let mut session = ready_session();
        session.try_request(request(&[], 0)).unwrap();
        session
            .handle_line("info depth 3 multipv 1 score cp 10 pv g1f3")
            .unwrap();
        session
            .handle_line("info depth 3 multipv 2 score cp 5 pv b1c3")
            .unwrap();
        session
            .handle_line("info depth 4 multipv 1 score cp 15 pv d2d4 g8f6")
            .unwrap();
        let event = session.handle_line("bestmove e2e9").unwrap();
        let Some(SessionEvent::Completed { best_move, .. }) = event else {
            panic!("expected completion");
        };
        assert_eq!(best_move, Some("d2d4".parse().unwrap()));
    }

    #[test]
    fn test_out_of_range_score_is_not_fatal() {
        let mut session = ready_session();
        session.try_request(request(&["e2e4"], 0)).unwrap();
        let event = session
            .handle_line("info depth 1 multipv 1 score cp -2147483648 pv e7e5")
            .unwrap();
        let Some(SessionEvent::Evaluation { sample, .. }) = event else {
            panic!("expected an evaluation");
        };
        assert_eq!(sample.score, i32::MAX);
    }

    #[test]
    fn test_no_move_resolves_absent() {
        let mut session = ready_session();
        session.try_request(request(&["f2f3", "e7e5", "g2g4", "d8h4"], 0)).unwrap();
        session.handle_line("info depth 0 score mate 0").unwrap();
        let event = session.handle_line("bestmove (none)").unwrap();
        assert!(matches!(
            event,
            Some(SessionEvent::Completed { best_move: None, .. })
        ));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_evaluation_normalised_for_black_to_move() {
        let mut session = ready_session();
        let Admission::Accepted(ticket) = session.try_request(request(&["e2e4"], 7)).unwrap() else {
            panic!("expected acceptance");
        };
        let event = session
            .handle_line("info depth 10 multipv 1 score cp 30 pv e7e5")
            .unwrap();
        let Some(SessionEvent::Evaluation { ticket: t, sample }) = event else {
            panic!("expected evaluation");
        };
        assert_eq!(t, ticket);
        assert_eq!(t.generation, 7);
        assert_eq!(sample.score, -30);
    }

    #[test]
    fn test_secondary_lines_and_garbage_ignored() {
        let mut session = ready_session();
        session.try_request(request(&[], 0)).unwrap();
        assert_eq!(
            session.handle_line("info depth 8 multipv 2 score cp -40 pv a2a3").unwrap(),
            None
        );
        assert_eq!(session.handle_line("info string hello").unwrap(), None);
        assert_eq!(session.handle_line("garbage !!").unwrap(), None);
        assert!(session.is_busy());
    }

    #[test]
    fn test_stray_bestmove_without_request() {
        let mut session = ready_session();
        assert_eq!(session.handle_line("bestmove e2e4").unwrap(), None);
        assert_eq!(session.resolved(), 0);
    }

    #[test]
    fn test_position_resent_in_full() {
        let mut session = ready_session();
        session.try_request(request(&["e2e4", "e7e5"], 0)).unwrap();
        session.handle_line("bestmove g1f3").unwrap();
        session.try_request(request(&["e2e4"], 1)).unwrap();
        let sent = &session.transport().sent;
        assert!(sent.contains(&"position startpos moves e2e4 e7e5".to_string()));
        assert_eq!(sent[sent.len() - 2], "position startpos moves e2e4");
    }
}
