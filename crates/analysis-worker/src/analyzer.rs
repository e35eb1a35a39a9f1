//! Game analysis: replay, evaluate every position once, classify each ply.
//!
//! The whole move list is replayed before the evaluator is touched, so an
//! illegal move fails the request without any engine work and nothing partial
//! ever leaves this module.

use std::time::{Duration, Instant};

use chess_core::{pgn, replay_san, ReplayedPosition, Side, Terminal};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::analysis::{classify, QualityLabel};
use crate::commentary;
use crate::error::WorkerError;
use crate::evaluator::{PositionEvaluator, MATE_SCORE};

/// Plies counted as opening, and as endgame at the other end of the game
const PHASE_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    /// Phase of 0-based `ply` in a game of `total_plies`.
    ///
    /// The opening window wins over the endgame window, so short games have
    /// no middlegame and the plies after the opening count as endgame.
    pub fn of_ply(ply: usize, total_plies: usize) -> Self {
        if ply < PHASE_WINDOW {
            GamePhase::Opening
        } else if ply < total_plies.saturating_sub(PHASE_WINDOW) {
            GamePhase::Middlegame
        } else {
            GamePhase::Endgame
        }
    }

    /// Phase bucket the accuracy of `ply` counts toward.
    ///
    /// Games of at most two windows have no endgame samples: their plies after
    /// the opening are commented as endgame moves but not scored.
    pub fn scored(ply: usize, total_plies: usize) -> Option<Self> {
        match Self::of_ply(ply, total_plies) {
            GamePhase::Endgame if total_plies <= 2 * PHASE_WINDOW => None,
            phase => Some(phase),
        }
    }
}

/// One analyzed ply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub ply: usize,
    pub move_number: usize,
    pub color: Side,
    /// SAN with check/mate suffix
    #[serde(rename = "move")]
    pub san: String,
    pub uci: String,
    /// Evaluation after the move, White's perspective, pawns
    pub evaluation: f64,
    pub quality: QualityLabel,
    pub accuracy: f64,
    pub comment: String,
}

impl MoveRecord {
    /// Capture, check or mate, judged from the SAN text.
    pub fn is_forcing(&self) -> bool {
        self.san.contains(['x', '+', '#'])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysis {
    pub comments: Vec<MoveRecord>,
    pub mistakes: u32,
    pub blunders: u32,
    pub accuracy: f64,
    pub opening_score: f64,
    pub middle_game_score: f64,
    pub end_game_score: f64,
    pub tactics_score: f64,
}

impl GameAnalysis {
    fn empty() -> Self {
        Self {
            comments: Vec::new(),
            mistakes: 0,
            blunders: 0,
            accuracy: 0.0,
            opening_score: 0.0,
            middle_game_score: 0.0,
            end_game_score: 0.0,
            tactics_score: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Upper bound for a single evaluator call
    pub eval_timeout: Duration,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            eval_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    sum: f64,
    count: usize,
}

impl Bucket {
    fn add(&mut self, accuracy: f64) {
        self.sum += accuracy;
        self.count += 1;
    }

    fn score(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64).clamp(0.0, 100.0)
        }
    }
}

/// Analyze a SAN move list played from the standard starting position.
pub async fn analyze_game<E, S>(
    evaluator: &mut E,
    moves: &[S],
    opts: &AnalyzeOptions,
    cancel: &CancellationToken,
) -> Result<GameAnalysis, WorkerError>
where
    E: PositionEvaluator + ?Sized,
    S: AsRef<str>,
{
    if cancel.is_cancelled() {
        return Err(WorkerError::Cancelled);
    }

    let replay = replay_san(moves)?;
    let total = replay.len();
    if total == 0 {
        return Ok(GameAnalysis::empty());
    }

    let started = Instant::now();
    info!(move_count = total, "Starting analysis");

    let mut analysis = GameAnalysis::empty();
    analysis.comments.reserve(total);
    let mut overall = Bucket::default();
    let mut opening = Bucket::default();
    let mut middlegame = Bucket::default();
    let mut endgame = Bucket::default();
    let mut tactics = Bucket::default();

    let mut eval_before = score_position(evaluator, &replay.positions[0], 0, opts, cancel).await?;

    for (ply, mv) in replay.moves.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        let eval_after =
            score_position(evaluator, &replay.positions[ply + 1], ply, opts, cancel).await?;
        let mover = Side::of_ply(ply);
        let classification = classify(eval_before, eval_after, mover);
        let label = classification.label;
        debug!(
            ply,
            san = mv.san.as_str(),
            eval_after,
            delta = classification.delta,
            %label,
            "Classified"
        );

        match label {
            QualityLabel::Blunder => analysis.blunders += 1,
            QualityLabel::Mistake => analysis.mistakes += 1,
            _ => {}
        }

        overall.add(classification.accuracy);
        match GamePhase::scored(ply, total) {
            Some(GamePhase::Opening) => opening.add(classification.accuracy),
            Some(GamePhase::Middlegame) => middlegame.add(classification.accuracy),
            Some(GamePhase::Endgame) => endgame.add(classification.accuracy),
            None => {}
        }
        if mv.flags.is_tactical() {
            tactics.add(classification.accuracy);
        }

        analysis.comments.push(MoveRecord {
            ply,
            move_number: ply / 2 + 1,
            color: mover,
            san: mv.san.clone(),
            uci: mv.uci.clone(),
            evaluation: eval_after,
            quality: label,
            accuracy: classification.accuracy,
            comment: commentary::comment_for(mv, label, ply, total).to_string(),
        });

        eval_before = eval_after;
    }

    analysis.accuracy = overall.score();
    analysis.opening_score = opening.score();
    analysis.middle_game_score = middlegame.score();
    analysis.end_game_score = endgame.score();
    analysis.tactics_score = tactics.score();

    info!(
        move_count = total,
        accuracy = analysis.accuracy,
        mistakes = analysis.mistakes,
        blunders = analysis.blunders,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis complete"
    );

    Ok(analysis)
}

/// Analyze the main line of a PGN game.
pub async fn analyze_pgn<E>(
    evaluator: &mut E,
    pgn_text: &str,
    opts: &AnalyzeOptions,
    cancel: &CancellationToken,
) -> Result<GameAnalysis, WorkerError>
where
    E: PositionEvaluator + ?Sized,
{
    let game = pgn::parse_pgn(pgn_text).ok_or_else(|| WorkerError::InvalidGameRecord {
        ply: 0,
        san: String::new(),
        reason: "PGN has no moves or starts from a custom position".to_string(),
    })?;
    analyze_game(evaluator, &game.moves, opts, cancel).await
}

/// Score one position, asking the evaluator only when the game is not over.
async fn score_position<E>(
    evaluator: &mut E,
    position: &ReplayedPosition,
    ply: usize,
    opts: &AnalyzeOptions,
    cancel: &CancellationToken,
) -> Result<f64, WorkerError>
where
    E: PositionEvaluator + ?Sized,
{
    if let Some(terminal) = position.terminal {
        return Ok(terminal_score(terminal, position.side_to_move));
    }

    let call = tokio::time::timeout(opts.eval_timeout, evaluator.evaluate(&position.fen));
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WorkerError::Cancelled),
        result = call => match result {
            Ok(score) => score,
            Err(_) => Err(WorkerError::EvaluatorTimeout {
                ply,
                timeout_ms: u64::try_from(opts.eval_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        },
    }
}

/// White-perspective score of a finished game.
fn terminal_score(terminal: Terminal, side_to_move: Side) -> f64 {
    match terminal {
        Terminal::Checkmate if side_to_move.is_white() => -MATE_SCORE,
        Terminal::Checkmate => MATE_SCORE,
        Terminal::Stalemate | Terminal::InsufficientMaterial => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(GamePhase::of_ply(0, 40), GamePhase::Opening);
        assert_eq!(GamePhase::of_ply(9, 40), GamePhase::Opening);
        assert_eq!(GamePhase::of_ply(10, 40), GamePhase::Middlegame);
        assert_eq!(GamePhase::of_ply(29, 40), GamePhase::Middlegame);
        assert_eq!(GamePhase::of_ply(30, 40), GamePhase::Endgame);
        assert_eq!(GamePhase::of_ply(39, 40), GamePhase::Endgame);
    }

    #[test]
    fn test_short_games_score_opening_only() {
        assert!((0..15).all(|p| GamePhase::of_ply(p, 15) != GamePhase::Middlegame));
        assert_eq!(GamePhase::of_ply(10, 15), GamePhase::Endgame);
        assert_eq!(GamePhase::scored(9, 15), Some(GamePhase::Opening));
        assert!((10..15).all(|p| GamePhase::scored(p, 15).is_none()));
        assert!((10..20).all(|p| GamePhase::scored(p, 20).is_none()));
        assert_eq!(GamePhase::scored(20, 21), Some(GamePhase::Endgame));
        assert!((0..5).all(|p| GamePhase::of_ply(p, 5) == GamePhase::Opening));
    }

    #[test]
    fn test_terminal_scores() {
        // White to move and mated
        assert_eq!(terminal_score(Terminal::Checkmate, Side::White), -MATE_SCORE);
        assert_eq!(terminal_score(Terminal::Checkmate, Side::Black), MATE_SCORE);
        assert_eq!(terminal_score(Terminal::Stalemate, Side::Black), 0.0);
    }

    #[test]
    fn test_bucket_empty_is_zero() {
        let mut b = Bucket::default();
        assert_eq!(b.score(), 0.0);
        b.add(95.0);
        b.add(20.0);
        assert_eq!(b.score(), 57.5);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = MoveRecord {
            ply: 3,
            move_number: 2,
            color: Side::Black,
            san: "Nc6".into(),
            uci: "b8c6".into(),
            evaluation: 0.3,
            quality: QualityLabel::Ok,
            accuracy: 85.0,
            comment: "fine".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["moveNumber"], 2);
        assert_eq!(json["move"], "Nc6");
        assert_eq!(json["color"], "black");
        assert_eq!(json["quality"], "ok");
        assert!(!record.is_forcing());
    }
}
