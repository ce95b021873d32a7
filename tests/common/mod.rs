#![allow(dead_code)]

use std::time::{Duration, Instant};

use chess_core::{Game, MoveToken, RulesEngine};
use duel::protocol::Command;
use duel::{AnalysisSession, DuelConfig, DuelError, EngineTransport, Orchestrator, Presenter, UiEvent};

/// Transport that records every command line instead of writing to a process.
#[derive(Default)]
pub struct Recorder {
    pub sent: Vec<String>,
}

impl EngineTransport for Recorder {
    fn send(&mut self, command: &Command) -> Result<(), DuelError> {
        self.sent.push(command.to_string());
        Ok(())
    }
}

/// Presenter that keeps every event it is shown.
#[derive(Default)]
pub struct Events {
    pub seen: Vec<UiEvent>,
}

impl Presenter for Events {
    fn notify(&mut self, event: UiEvent, _rules: &dyn RulesEngine) {
        self.seen.push(event);
    }
}

pub type TestDuel = Orchestrator<Game, Recorder, Events>;

/// Fast timings so scenarios read in whole seconds.
pub fn config() -> DuelConfig {
    DuelConfig {
        ai_min_think: Duration::from_secs(2),
        hint_delay: Duration::from_secs(3),
        retry_backoff: Duration::from_millis(100),
        ..DuelConfig::default()
    }
}

/// An orchestrator whose engine has completed the handshake.
pub fn ready_duel(config: DuelConfig, now: Instant) -> TestDuel {
    let session = AnalysisSession::connect(Recorder::default(), config.multipv).unwrap();
    let mut duel = Orchestrator::new(&config, session, Game::new(), Events::default());
    duel.on_engine_line("uciok", now).unwrap();
    duel
}

pub fn tok(s: &str) -> MoveToken {
    s.parse().unwrap()
}

pub fn sent(duel: &TestDuel) -> &[String] {
    &duel.session().transport().sent
}

/// Commands sent since `mark`.
pub fn sent_since(duel: &TestDuel, mark: usize) -> Vec<String> {
    sent(duel)[mark..].to_vec()
}

pub fn events(duel: &TestDuel) -> &[UiEvent] {
    &duel.presenter().seen
}

pub fn feed(duel: &mut TestDuel, lines: &[&str], now: Instant) {
    for line in lines {
        duel.on_engine_line(line, now).unwrap();
    }
}
