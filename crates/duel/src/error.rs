//! Client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to spawn engine: {0}")]
    EngineSpawn(String),

    #[error("Engine I/O error: {0}")]
    EngineIo(String),

    #[error("Unrecognised input: {0}")]
    Input(String),

    #[error("Engine channel closed")]
    EngineClosed,

    #[error("Rules error: {0}")]
    Rules(#[from] chess_core::CoreError),
}
