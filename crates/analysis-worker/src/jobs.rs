//! Store-backed flows: analyze a stored game, then feedback and progress.

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analyzer::{self, AnalyzeOptions, GameAnalysis};
use crate::coach::{self, StudyPlan};
use crate::db;
use crate::error::WorkerError;
use crate::evaluator::{Difficulty, PositionEvaluator};
use crate::feedback::{self, AdaptiveFeedback};
use crate::progress::LearningProgress;

/// Analyze a stored game and save the result, replacing any earlier analysis.
pub async fn analyze_stored_game<E>(
    evaluator: &mut E,
    pool: &PgPool,
    game_id: i64,
    opts: &AnalyzeOptions,
    cancel: &CancellationToken,
) -> Result<GameAnalysis, WorkerError>
where
    E: PositionEvaluator + ?Sized,
{
    let game = db::fetch_game(pool, game_id)
        .await?
        .ok_or(WorkerError::GameNotFound(game_id))?;

    info!(game_id, user_id = game.user_id, "Loaded game");

    let analysis = analyzer::analyze_pgn(evaluator, &game.pgn, opts, cancel).await?;
    db::save_game_analysis(pool, game_id, &analysis).await?;
    info!(game_id, accuracy = analysis.accuracy, "Analysis saved");
    Ok(analysis)
}

/// Adaptive feedback for a stored game, using the owner's analyzed history.
pub async fn feedback_for_game(
    pool: &PgPool,
    game_id: i64,
) -> Result<AdaptiveFeedback, WorkerError> {
    let game = db::fetch_game(pool, game_id)
        .await?
        .ok_or(WorkerError::GameNotFound(game_id))?;
    let analysis = db::fetch_game_analysis(pool, game_id)
        .await?
        .ok_or(WorkerError::MissingAnalysis(game_id))?;
    let history = db::fetch_user_analyses(pool, game.user_id).await?;
    Ok(feedback::generate_adaptive(&analysis, &history))
}

/// Fold a stored game's analysis into its owner's learning progress.
pub async fn update_progress_for_game(
    pool: &PgPool,
    game_id: i64,
) -> Result<LearningProgress, WorkerError> {
    let game = db::fetch_game(pool, game_id)
        .await?
        .ok_or(WorkerError::GameNotFound(game_id))?;
    let analysis = db::fetch_game_analysis(pool, game_id)
        .await?
        .ok_or(WorkerError::MissingAnalysis(game_id))?;

    let updated = db::fold_learning_progress(pool, game.user_id, &analysis).await?;
    info!(
        game_id,
        user_id = game.user_id,
        openings = updated.openings,
        middle_game = updated.middle_game,
        end_game = updated.end_game,
        tactics = updated.tactics,
        "Learning progress updated"
    );
    Ok(updated)
}

pub async fn difficulty_for_user(pool: &PgPool, user_id: i64) -> Result<Difficulty, WorkerError> {
    let recent = db::fetch_recent_games(pool, user_id).await?;
    Ok(coach::adaptive_difficulty(&recent))
}

pub async fn study_plan_for_user(pool: &PgPool, user_id: i64) -> Result<StudyPlan, WorkerError> {
    let progress = db::fetch_learning_progress(pool, user_id).await?;
    Ok(coach::study_plan(progress.as_ref()))
}
