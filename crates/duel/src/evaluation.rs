//! Score normalisation and win probability. Pure functions only.
//!
//! The engine reports scores for whichever side is to move; everything here
//! re-expresses them from White's point of view.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::protocol::Score;

/// Logistic slope for centipawns -> win probability.
const WIN_PROBABILITY_SLOPE: f64 = 0.003682;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    #[serde(rename = "cp")]
    Centipawn,
    Mate,
}

/// One evaluation, already normalised to White's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSample {
    /// Centipawns or mate distance; positive favours White.
    pub score: i32,
    pub kind: ScoreKind,
    /// Side to move in the analysed position (the engine's raw perspective).
    #[serde(skip)]
    pub side_to_move: Option<Color>,
    /// 0.0 ..= 100.0, White's chance.
    pub win_probability: f64,
}

impl EvaluationSample {
    /// The sample shown for a fresh game before any analysis arrives.
    pub fn even() -> Self {
        Self {
            score: 0,
            kind: ScoreKind::Centipawn,
            side_to_move: None,
            win_probability: 50.0,
        }
    }

    /// For mate scores: the side delivering mate.
    pub fn mating_side(&self) -> Option<Color> {
        match self.kind {
            ScoreKind::Centipawn => None,
            ScoreKind::Mate if self.score > 0 => Some(Color::White),
            ScoreKind::Mate if self.score < 0 => Some(Color::Black),
            // Mate 0: the side to move has already been mated.
            ScoreKind::Mate => self.side_to_move.map(|c| !c),
        }
    }
}

/// Win probability for White given a White-relative centipawn score.
pub fn win_probability(cp: i32) -> f64 {
    let x = f64::from(cp);
    50.0 + 50.0 * (2.0 / (1.0 + (-WIN_PROBABILITY_SLOPE * x).exp()) - 1.0)
}

/// Convert a side-to-move-relative engine score into a White-relative sample.
pub fn normalize(score: Score, side_to_move: Color) -> EvaluationSample {
    let flip = |v: i32| if side_to_move == Color::White { v } else { v.saturating_neg() };

    match score {
        Score::Centipawns(cp) => {
            let score = flip(cp);
            EvaluationSample {
                score,
                kind: ScoreKind::Centipawn,
                side_to_move: Some(side_to_move),
                win_probability: win_probability(score),
            }
        }
        Score::Mate(n) => {
            let score = flip(n);
            let mut sample = EvaluationSample {
                score,
                kind: ScoreKind::Mate,
                side_to_move: Some(side_to_move),
                win_probability: 0.0,
            };
            if sample.mating_side() == Some(Color::White) {
                sample.win_probability = 100.0;
            }
            sample
        }
    }
}
