//! Rules adapter error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// `ply` is 0-based.
    #[error("Invalid move at ply {ply} ({san}): {reason}")]
    InvalidMove {
        ply: usize,
        san: String,
        reason: String,
    },

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Invalid UCI move {uci}: {reason}")]
    InvalidUci { uci: String, reason: String },
}
