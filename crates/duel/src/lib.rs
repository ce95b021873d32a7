//! Human-versus-engine chess over the UCI protocol.
//!
//! The protocol, session, timers and orchestrator are sans-IO: they take the
//! current `Instant` and return what to do, so they can be driven by the tokio
//! loop in the binary or stepped directly in tests.

pub mod command;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod hint;
pub mod orchestrator;
pub mod presenter;
pub mod promotion;
pub mod protocol;
pub mod session;
pub mod timers;
pub mod transport;

pub use config::DuelConfig;
pub use error::DuelError;
pub use evaluation::EvaluationSample;
pub use orchestrator::{HumanMove, Orchestrator, TurnState};
pub use presenter::{Presenter, TerminalPresenter, UiEvent};
pub use session::{AnalysisSession, EngineTransport};
