//! Parsing of the player's terminal input.

use chess_core::uci::parse_square;
use chess_core::{DifficultyTier, MoveToken, PromotionKind};
use shakmaty::Square;

use crate::error::DuelError;

pub const HELP: &str = "\
Commands:
  e2e4, e7e8q       play a move (promotion letter optional)
  q | r | b | n     pick a promotion piece when asked
  select <square>   show where a piece can move
  cancel            abandon a pending promotion
  new               start a new game
  undo              take back your last move
  hint on|off       toggle delayed hints
  level <1-8>       set difficulty (or `medium`)
  board             redraw the board
  quit              leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Move(MoveToken),
    Promote(PromotionKind),
    Select(Square),
    Cancel,
    NewGame,
    Undo,
    Hints(bool),
    Level(DifficultyTier),
    Board,
    Help,
    Quit,
}

pub fn parse_input(line: &str) -> Result<UserCommand, DuelError> {
    let lower = line.trim().to_ascii_lowercase();
    let mut words = lower.split_whitespace();
    let head = words.next().unwrap_or_default();
    let arg = words.next();
    let bad = || DuelError::Input(line.trim().to_string());

    let command = match (head, arg) {
        ("new", None) => UserCommand::NewGame,
        ("undo", None) => UserCommand::Undo,
        ("cancel", None) => UserCommand::Cancel,
        ("board", None) => UserCommand::Board,
        ("help" | "?", None) => UserCommand::Help,
        ("quit" | "exit", None) => UserCommand::Quit,
        ("hint", Some("on")) => UserCommand::Hints(true),
        ("hint", Some("off")) => UserCommand::Hints(false),
        ("select", Some(sq)) => UserCommand::Select(parse_square(sq).ok_or_else(bad)?),
        ("level", Some(tier)) => UserCommand::Level(tier.parse().map_err(|_| bad())?),
        ("medium", None) => UserCommand::Level(DifficultyTier::default()),
        (word, None) => {
            if let Ok(kind) = word.parse::<PromotionKind>() {
                UserCommand::Promote(kind)
            } else {
                UserCommand::Move(word.parse().map_err(|_| bad())?)
            }
        }
        _ => return Err(bad()),
    };
    Ok(command)
}
