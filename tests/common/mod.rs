//! Stub position evaluators shared by the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use analysis_worker::{PositionEvaluator, WorkerError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Same score for every position.
pub struct Constant {
    pub score: f64,
    pub calls: usize,
}

impl Constant {
    pub fn new(score: f64) -> Self {
        Self { score, calls: 0 }
    }
}

#[async_trait]
impl PositionEvaluator for Constant {
    async fn evaluate(&mut self, _fen: &str) -> Result<f64, WorkerError> {
        self.calls += 1;
        Ok(self.score)
    }

    async fn best_move(&mut self, _fen: &str, _depth: u8) -> Result<Option<String>, WorkerError> {
        Ok(None)
    }
}

/// Scores handed out in call order; the last one repeats.
pub struct Sequence {
    pub scores: Vec<f64>,
    pub fens: Vec<String>,
}

impl Sequence {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            scores,
            fens: Vec::new(),
        }
    }
}

#[async_trait]
impl PositionEvaluator for Sequence {
    async fn evaluate(&mut self, fen: &str) -> Result<f64, WorkerError> {
        let i = self.fens.len().min(self.scores.len().saturating_sub(1));
        self.fens.push(fen.to_string());
        Ok(self.scores.get(i).copied().unwrap_or(0.0))
    }

    async fn best_move(&mut self, _fen: &str, _depth: u8) -> Result<Option<String>, WorkerError> {
        Ok(None)
    }
}

/// Never answers within any reasonable timeout.
pub struct Stalled(pub Duration);

#[async_trait]
impl PositionEvaluator for Stalled {
    async fn evaluate(&mut self, _fen: &str) -> Result<f64, WorkerError> {
        tokio::time::sleep(self.0).await;
        Ok(0.0)
    }

    async fn best_move(&mut self, _fen: &str, _depth: u8) -> Result<Option<String>, WorkerError> {
        Ok(None)
    }
}

/// Cancels `token` on its `after`-th evaluation.
pub struct CancelAfter {
    pub token: CancellationToken,
    pub after: usize,
    pub calls: usize,
}

#[async_trait]
impl PositionEvaluator for CancelAfter {
    async fn evaluate(&mut self, _fen: &str) -> Result<f64, WorkerError> {
        self.calls += 1;
        if self.calls == self.after {
            self.token.cancel();
        }
        Ok(0.0)
    }

    async fn best_move(&mut self, _fen: &str, _depth: u8) -> Result<Option<String>, WorkerError> {
        Ok(None)
    }
}

/// Answers `0.0` until its `fail_on`-th evaluation, which reports a dead engine.
pub struct DiesAfter {
    pub fail_on: usize,
    pub calls: usize,
}

#[async_trait]
impl PositionEvaluator for DiesAfter {
    async fn evaluate(&mut self, _fen: &str) -> Result<f64, WorkerError> {
        self.calls += 1;
        if self.calls >= self.fail_on {
            return Err(WorkerError::EvaluatorUnavailable(
                "engine closed its output".to_string(),
            ));
        }
        Ok(0.0)
    }

    async fn best_move(&mut self, _fen: &str, _depth: u8) -> Result<Option<String>, WorkerError> {
        Ok(None)
    }
}

/// Knight shuffle: a legal capture-free game of `plies` half-moves.
pub fn knight_shuffle(plies: usize) -> Vec<String> {
    ["Nf3", "Nf6", "Ng1", "Ng8"]
        .iter()
        .cycle()
        .take(plies)
        .map(|s| s.to_string())
        .collect()
}
