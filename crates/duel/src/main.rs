//! Engine Duel
//!
//! Play chess in the terminal against a UCI engine subprocess.

use std::time::Instant;

use chess_core::{Game, RulesEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use duel::command::{parse_input, UserCommand, HELP};
use duel::presenter::TerminalPresenter;
use duel::session::EngineTransport;
use duel::transport::spawn_engine;
use duel::{AnalysisSession, DuelConfig, HumanMove, Orchestrator, Presenter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout belongs to the board.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = DuelConfig::from_env()?;
    info!(
        engine = %config.engine_path,
        difficulty = %config.difficulty,
        human = ?config.human_color,
        "Starting engine duel"
    );

    let (transport, mut engine_lines, process) = spawn_engine(&config.engine_path)?;
    let session = AnalysisSession::connect(transport, config.multipv)?;
    let presenter = TerminalPresenter::new(std::io::stdout(), config.human_color);
    let mut duel = Orchestrator::new(&config, session, Game::new(), presenter);
    duel.announce("Loading engine");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let deadline = duel.next_deadline();
        tokio::select! {
            line = engine_lines.recv() => match line {
                Some(line) => duel.on_engine_line(&line, Instant::now())?,
                None => {
                    warn!("Engine exited");
                    break;
                }
            },
            line = input.next_line() => match line? {
                Some(line) => {
                    if !handle_input(&mut duel, &line)? {
                        break;
                    }
                }
                None => break,
            },
            _ = sleep_until(deadline) => duel.on_tick(Instant::now())?,
        }
    }

    if let Err(e) = duel.quit() {
        warn!(error = %e, "Failed to send quit");
    }
    process.shutdown().await;
    info!("Bye");
    Ok(())
}

/// Apply one line of player input. Returns `false` when the player quits.
fn handle_input<R, T, P>(duel: &mut Orchestrator<R, T, P>, line: &str) -> anyhow::Result<bool>
where
    R: RulesEngine,
    T: EngineTransport,
    P: Presenter,
{
    if line.trim().is_empty() {
        return Ok(true);
    }
    let command = match parse_input(line) {
        Ok(command) => command,
        Err(e) => {
            duel.announce(format!("{e}. Type `help` for commands."));
            return Ok(true);
        }
    };

    let now = Instant::now();
    match command {
        UserCommand::Move(mv) => {
            if duel.submit_move(mv, now)? == HumanMove::Ignored {
                duel.announce(format!("Move {mv} not accepted."));
            }
        }
        UserCommand::Promote(kind) => {
            if duel.choose_promotion(kind, now)? == HumanMove::Ignored {
                duel.announce("No promotion pending.");
            }
        }
        UserCommand::Select(square) => {
            duel.select_square(square, now);
        }
        UserCommand::Cancel => {
            if duel.cancel_promotion(now) {
                duel.announce("Promotion cancelled.");
            }
        }
        UserCommand::NewGame => duel.reset(now)?,
        UserCommand::Undo => duel.undo(now)?,
        UserCommand::Hints(enabled) => {
            duel.set_hints(enabled, now);
            duel.announce(if enabled { "Hints on." } else { "Hints off." });
        }
        UserCommand::Level(tier) => {
            duel.set_difficulty(tier);
            duel.announce(format!("Difficulty set to {tier}."));
        }
        UserCommand::Board => duel.redraw(),
        UserCommand::Help => duel.announce(HELP),
        UserCommand::Quit => return Ok(false),
    }
    Ok(true)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
