//! Difficulty tiers and the search depth each one maps to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Level1,
    Level2,
    Level3,
    /// Also reachable as "medium".
    #[default]
    Level4,
    Level5,
    Level6,
    Level7,
    Level8,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 8] = [
        DifficultyTier::Level1,
        DifficultyTier::Level2,
        DifficultyTier::Level3,
        DifficultyTier::Level4,
        DifficultyTier::Level5,
        DifficultyTier::Level6,
        DifficultyTier::Level7,
        DifficultyTier::Level8,
    ];

    /// Search depth in plies used by `go depth`.
    pub fn search_depth(self) -> u32 {
        match self {
            DifficultyTier::Level1 => 1,
            DifficultyTier::Level2 => 2,
            DifficultyTier::Level3 => 4,
            DifficultyTier::Level4 => 6,
            DifficultyTier::Level5 => 8,
            DifficultyTier::Level6 => 12,
            DifficultyTier::Level7 => 16,
            DifficultyTier::Level8 => 20,
        }
    }
}

impl FromStr for DifficultyTier {
    type Err = CoreError;

    /// Accepts `level1`..`level8`, a bare `1`..`8`, or `medium`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "medium" {
            return Ok(DifficultyTier::Level4);
        }
        let digits = lower.strip_prefix("level").unwrap_or(&lower);
        match digits.parse::<usize>() {
            Ok(n @ 1..=8) => Ok(Self::ALL[n - 1]),
            _ => Err(CoreError::UnknownTier(s.to_string())),
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = Self::ALL.iter().position(|t| t == self).unwrap_or(3) + 1;
        write!(f, "level{n}")
    }
}
