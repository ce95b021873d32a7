//! UCI line protocol: outbound commands and inbound line parsing.

use std::fmt;
use std::time::Duration;

use chess_core::uci::join_tokens;
use chess_core::MoveToken;

/// How a search is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchParameters {
    /// Fixed depth in plies.
    Depth(u32),
    /// Fixed time for this move.
    MoveTime(Duration),
    /// Simulated clocks so the engine paces itself.
    Clock {
        white: Duration,
        black: Duration,
        white_increment: Duration,
        black_increment: Duration,
    },
    /// Depth taken from the session's configured difficulty.
    EngineDefault,
}

/// Commands written to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    Position { moves: Vec<MoveToken> },
    GoDepth(u32),
    GoMoveTime(Duration),
    GoClock {
        white: Duration,
        black: Duration,
        white_increment: Duration,
        black_increment: Duration,
    },
    Stop,
    Quit,
}

impl Command {
    /// Resolve search parameters into a concrete `go` command.
    pub fn go(params: SearchParameters, default_depth: u32) -> Self {
        match params {
            SearchParameters::Depth(depth) => Command::GoDepth(depth),
            SearchParameters::EngineDefault => Command::GoDepth(default_depth),
            SearchParameters::MoveTime(t) => Command::GoMoveTime(t),
            SearchParameters::Clock {
                white,
                black,
                white_increment,
                black_increment,
            } => Command::GoClock {
                white,
                black,
                white_increment,
                black_increment,
            },
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(
            self,
            Command::GoDepth(_) | Command::GoMoveTime(_) | Command::GoClock { .. }
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => write!(f, "uci"),
            Command::IsReady => write!(f, "isready"),
            Command::SetOption { name, value } => write!(f, "setoption name {name} value {value}"),
            Command::Position { moves } if moves.is_empty() => write!(f, "position startpos"),
            Command::Position { moves } => {
                write!(f, "position startpos moves {}", join_tokens(moves))
            }
            Command::GoDepth(depth) => write!(f, "go depth {depth}"),
            Command::GoMoveTime(t) => write!(f, "go movetime {}", t.as_millis()),
            Command::GoClock {
                white,
                black,
                white_increment,
                black_increment,
            } => write!(
                f,
                "go wtime {} btime {} winc {} binc {}",
                white.as_millis(),
                black.as_millis(),
                white_increment.as_millis(),
                black_increment.as_millis()
            ),
            Command::Stop => write!(f, "stop"),
            Command::Quit => write!(f, "quit"),
        }
    }
}

/// Engine score, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Mate in N moves; negative when the side to move is being mated.
    Mate(i32),
}

/// The parts of an `info` line the client cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

impl InfoLine {
    /// Lines without a `multipv` field come from single-PV searches and rank first.
    pub fn rank(&self) -> u32 {
        self.multipv.unwrap_or(1)
    }
}

/// A classified inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    UciOk,
    ReadyOk,
    Info(InfoLine),
    /// Raw move field of `bestmove`; `None` when the line carries no move at all.
    BestMove(Option<String>),
    Other,
}

/// Classify one line of engine output. Never fails: anything unrecognised is `Other`.
pub fn parse_line(line: &str) -> EngineLine {
    let trimmed = line.trim();
    let mut parts = trimmed.split_whitespace();
    match parts.next() {
        Some("uciok") => EngineLine::UciOk,
        Some("readyok") => EngineLine::ReadyOk,
        Some("info") => EngineLine::Info(parse_info(trimmed)),
        Some("bestmove") => EngineLine::BestMove(parts.next().map(str::to_string)),
        _ => EngineLine::Other,
    }
}

fn parse_info(line: &str) -> InfoLine {
    let parts: Vec<&str> = line.split_whitespace().collect();
    InfoLine {
        depth: value_after(&parts, "depth"),
        multipv: value_after(&parts, "multipv"),
        score: parse_score(&parts),
        pv: parse_pv(&parts),
    }
}

fn value_after<T: std::str::FromStr>(parts: &[&str], key: &str) -> Option<T> {
    let idx = parts.iter().position(|p| *p == key)?;
    parts.get(idx + 1)?.parse().ok()
}

/// Parse `score cp N` / `score mate N`.
fn parse_score(parts: &[&str]) -> Option<Score> {
    let idx = parts.iter().position(|p| *p == "score")?;
    let value: i32 = parts.get(idx + 2)?.parse().ok()?;
    match *parts.get(idx + 1)? {
        "cp" => Some(Score::Centipawns(value)),
        "mate" => Some(Score::Mate(value)),
        _ => None,
    }
}

/// PV moves run from `pv` to the end of the line or the next keyword.
fn parse_pv(parts: &[&str]) -> Vec<String> {
    let Some(idx) = parts.iter().position(|p| *p == "pv") else {
        return Vec::new();
    };
    parts[idx + 1..]
        .iter()
        .take_while(|p| !matches!(**p, "bmc" | "string" | "score" | "multipv" | "depth"))
        .map(|p| p.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        let EngineLine::Info(info) = parse_line(line) else {
            panic!("expected info");
        };
        assert_eq!(info.score, Some(Score::Centipawns(35)));
        assert_eq!(info.depth, Some(20));
        assert_eq!(info.rank(), 1);
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate -3 nodes 100000 pv e2e4";
        let EngineLine::Info(info) = parse_line(line) else {
            panic!("expected info");
        };
        assert_eq!(info.score, Some(Score::Mate(-3)));
    }

    #[test]
    fn test_parse_pv() {
        let line = "info depth 20 multipv 2 score cp 35 pv e2e4 e7e5 g1f3";
        let EngineLine::Info(info) = parse_line(line) else {
            panic!("expected info");
        };
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(info.rank(), 2);
    }

    #[test]
    fn test_malformed_info_has_no_score() {
        let EngineLine::Info(info) = parse_line("info score cp banana") else {
            panic!("expected info");
        };
        assert_eq!(info.score, None);
        assert!(info.pv.is_empty());
        assert_eq!(parse_line("info string NNUE enabled"), EngineLine::Info(InfoLine::default()));
    }

    #[test]
    fn test_parse_bestmove_forms() {
        assert_eq!(
            parse_line("bestmove e2e4 ponder e7e5"),
            EngineLine::BestMove(Some("e2e4".into()))
        );
        assert_eq!(
            parse_line("bestmove (none)"),
            EngineLine::BestMove(Some("(none)".into()))
        );
        assert_eq!(parse_line("bestmove"), EngineLine::BestMove(None));
        assert_eq!(parse_line("uciok"), EngineLine::UciOk);
        assert_eq!(parse_line("id name Stockfish 16"), EngineLine::Other);
        assert_eq!(parse_line(""), EngineLine::Other);
    }

    #[test]
    fn test_command_formatting() {
        let moves = vec!["e2e4".parse().unwrap(), "e7e5".parse().unwrap()];
        assert_eq!(Command::Position { moves }.to_string(), "position startpos moves e2e4 e7e5");
        assert_eq!(Command::Position { moves: vec![] }.to_string(), "position startpos");
        assert_eq!(Command::go(SearchParameters::EngineDefault, 6).to_string(), "go depth 6");
        assert_eq!(
            Command::go(SearchParameters::MoveTime(Duration::from_millis(750)), 6).to_string(),
            "go movetime 750"
        );
        let clock = SearchParameters::Clock {
            white: Duration::from_secs(60),
            black: Duration::from_secs(50),
            white_increment: Duration::from_secs(1),
            black_increment: Duration::from_secs(2),
        };
        assert_eq!(
            Command::go(clock, 6).to_string(),
            "go wtime 60000 btime 50000 winc 1000 binc 2000"
        );
        assert_eq!(
            Command::SetOption { name: "MultiPV".into(), value: "3".into() }.to_string(),
            "setoption name MultiPV value 3"
        );
    }
}
