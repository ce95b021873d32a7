pub use shakmaty;

pub mod difficulty;
pub mod error;
pub mod pgn;
pub mod rules;
pub mod uci;

pub use difficulty::DifficultyTier;
pub use error::CoreError;
pub use rules::{Game, PlayedMove, RulesEngine};
pub use uci::{MoveToken, PromotionKind};
