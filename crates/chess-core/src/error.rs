//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid move token: {0}")]
    InvalidToken(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Unknown difficulty tier: {0}")]
    UnknownTier(String),

    #[error("Unknown promotion piece: {0}")]
    UnknownPromotion(String),
}
