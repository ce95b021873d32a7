//! Client configuration from environment variables

use std::env;
use std::time::Duration;

use chess_core::DifficultyTier;
use shakmaty::Color;
use tracing::warn;

use crate::error::DuelError;
use crate::protocol::SearchParameters;

#[derive(Clone, Debug)]
pub struct DuelConfig {
    /// Path to the UCI engine binary
    pub engine_path: String,

    /// MultiPV value sent once after the handshake
    pub multipv: u32,

    /// Starting difficulty
    pub difficulty: DifficultyTier,

    /// How the AI's search is bounded
    pub search: SearchParameters,

    /// Minimum time the AI appears to think before its move lands
    pub ai_min_think: Duration,

    /// Delay before a hint is revealed on the human's turn
    pub hint_delay: Duration,

    /// Hints on at startup
    pub hints_enabled: bool,

    /// Side the human plays
    pub human_color: Color,

    /// Backoff before retrying a request the session rejected
    pub retry_backoff: Duration,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            engine_path: "stockfish".to_string(),
            multipv: 3,
            difficulty: DifficultyTier::default(),
            search: SearchParameters::EngineDefault,
            ai_min_think: Duration::from_millis(2000),
            hint_delay: Duration::from_millis(3000),
            hints_enabled: false,
            human_color: Color::White,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

impl DuelConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Result<Self, DuelError> {
        let defaults = Self::default();

        let engine_path = env::var("ENGINE_PATH").unwrap_or(defaults.engine_path);
        if engine_path.trim().is_empty() {
            return Err(DuelError::Config("ENGINE_PATH is empty".into()));
        }

        let multipv = env_parse("ENGINE_MULTIPV").unwrap_or(defaults.multipv).max(1);

        let difficulty = match env::var("DIFFICULTY") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default difficulty");
                defaults.difficulty
            }),
            Err(_) => defaults.difficulty,
        };

        let search = search_from_env().unwrap_or(defaults.search);

        let ai_min_think = env_parse("AI_MIN_THINK_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.ai_min_think);

        let hint_delay = env_parse("HINT_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.hint_delay);

        let hints_enabled = env::var("HINTS")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.hints_enabled);

        let human_color = match env::var("HUMAN_COLOR").as_deref() {
            Ok("black") | Ok("b") => Color::Black,
            _ => defaults.human_color,
        };

        let retry_backoff = env_parse("RETRY_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_backoff);

        Ok(Self {
            engine_path,
            multipv,
            difficulty,
            search,
            ai_min_think,
            hint_delay,
            hints_enabled,
            human_color,
            retry_backoff,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn search_from_env() -> Option<SearchParameters> {
    let mode = env::var("SEARCH_MODE").ok()?;
    parse_search_mode(
        &mode,
        env_parse("MOVETIME_MS").unwrap_or(1000),
        env_parse("CLOCK_MS").unwrap_or(300_000),
        env_parse("CLOCK_INC_MS").unwrap_or(2000),
    )
}

/// Build search parameters from a mode name and its millisecond settings.
pub fn parse_search_mode(mode: &str, movetime_ms: u64, clock_ms: u64, inc_ms: u64) -> Option<SearchParameters> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "default" | "depth" => Some(SearchParameters::EngineDefault),
        "movetime" => Some(SearchParameters::MoveTime(Duration::from_millis(movetime_ms))),
        "clock" => Some(SearchParameters::Clock {
            white: Duration::from_millis(clock_ms),
            black: Duration::from_millis(clock_ms),
            white_increment: Duration::from_millis(inc_ms),
            black_increment: Duration::from_millis(inc_ms),
        }),
        other => {
            if let Some(depth) = other.strip_prefix("depth").and_then(|d| d.trim().parse().ok()) {
                return Some(SearchParameters::Depth(depth));
            }
            warn!(mode = other, "Unknown SEARCH_MODE");
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
