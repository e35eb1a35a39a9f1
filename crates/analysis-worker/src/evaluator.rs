//! Position evaluator contract.
//!
//! The analyzer only ever talks to this trait. The Stockfish adapter in
//! [`crate::stockfish`] is the production implementation; tests plug in stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// Sentinel score (in pawns) for a forced mate. Encodes the sign only.
pub const MATE_SCORE: f64 = 999.0;

#[async_trait]
pub trait PositionEvaluator: Send {
    /// Score of `fen` in pawns from White's perspective, or `±MATE_SCORE`.
    async fn evaluate(&mut self, fen: &str) -> Result<f64, WorkerError>;

    /// Best move in UCI notation, `None` when the position has no legal moves.
    async fn best_move(&mut self, fen: &str, depth: u8) -> Result<Option<String>, WorkerError>;

    /// Release the underlying engine. The evaluator must not be used afterwards.
    async fn shutdown(&mut self) {}
}

/// Engine strength tier offered to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn search_depth(self) -> u8 {
        match self {
            Difficulty::Beginner => 5,
            Difficulty::Intermediate => 10,
            Difficulty::Advanced => 15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(WorkerError::Config("unknown difficulty tier")),
        }
    }
}

/// Convert a side-to-move engine score to pawns from White's perspective.
///
/// Mate scores collapse to `±MATE_SCORE`; `mate 0` (side to move is already
/// mated) counts as a loss for the side to move.
pub fn white_pov_pawns(cp: Option<i32>, mate: Option<i32>, white_to_move: bool) -> f64 {
    let side_to_move = if let Some(m) = mate {
        if m > 0 {
            MATE_SCORE
        } else {
            -MATE_SCORE
        }
    } else if let Some(c) = cp {
        f64::from(c) / 100.0
    } else {
        0.0
    };

    if white_to_move {
        side_to_move
    } else {
        -side_to_move
    }
}
