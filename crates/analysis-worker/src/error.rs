//! Worker error types

use chess_core::ReplayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Invalid game record at ply {ply} ({san}): {reason}")]
    InvalidGameRecord {
        ply: usize,
        san: String,
        reason: String,
    },

    #[error("Evaluator timed out after {timeout_ms}ms at ply {ply}")]
    EvaluatorTimeout { ply: usize, timeout_ms: u64 },

    #[error("Evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("No analysis stored for game {0}")]
    MissingAnalysis(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ReplayError> for WorkerError {
    fn from(e: ReplayError) -> Self {
        match e {
            ReplayError::InvalidMove { ply, san, reason } => {
                WorkerError::InvalidGameRecord { ply, san, reason }
            }
            other => WorkerError::EvaluatorUnavailable(other.to_string()),
        }
    }
}

impl WorkerError {
    /// HTTP-equivalent status for the surrounding service layer.
    pub fn status_code(&self) -> u16 {
        match self {
            WorkerError::InvalidGameRecord { .. } => 400,
            WorkerError::GameNotFound(_) | WorkerError::MissingAnalysis(_) => 404,
            WorkerError::Cancelled => 499,
            WorkerError::EvaluatorUnavailable(_) => 503,
            WorkerError::EvaluatorTimeout { .. } => 504,
            WorkerError::Config(_) | WorkerError::Database(_) | WorkerError::Json(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Message safe to show to a player. Diagnostics stay in `Display`.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::InvalidGameRecord { ply, san, .. } => {
                format!("Move {} ({san}) is not legal in this game", ply / 2 + 1)
            }
            WorkerError::GameNotFound(_) => "Game not found".to_string(),
            WorkerError::MissingAnalysis(_) => "This game has not been analyzed yet".to_string(),
            WorkerError::Cancelled => "Analysis was cancelled".to_string(),
            WorkerError::EvaluatorTimeout { .. } | WorkerError::EvaluatorUnavailable(_) => {
                "The chess engine is not responding, please try again later".to_string()
            }
            WorkerError::Config(_) | WorkerError::Database(_) | WorkerError::Json(_) => {
                "Internal server error".to_string()
            }
        }
    }
}
