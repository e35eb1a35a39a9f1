//! Database queries for games, analyses and learning progress

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use crate::analyzer::{GameAnalysis, MoveRecord};
use crate::coach::{RecentGame, RECENT_GAMES};
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::progress::{fold_into, LearningProgress};

pub async fn create_pool(config: &WorkerConfig) -> Result<PgPool, WorkerError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(config.require_database_url()?)
        .await?;
    Ok(pool)
}

/// Create the tables this worker reads and writes, if missing.
pub async fn run_migrations(pool: &PgPool) -> Result<(), WorkerError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    id          BIGSERIAL PRIMARY KEY,
    user_id     BIGINT NOT NULL,
    pgn         TEXT NOT NULL,
    result      TEXT NOT NULL,
    difficulty  TEXT NOT NULL DEFAULT 'beginner',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_games_user_created
    ON games (user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS game_analysis (
    game_id           BIGINT PRIMARY KEY REFERENCES games(id) ON DELETE CASCADE,
    comments          JSONB NOT NULL,
    mistakes          INTEGER NOT NULL,
    blunders          INTEGER NOT NULL,
    accuracy          DOUBLE PRECISION NOT NULL,
    opening_score     DOUBLE PRECISION NOT NULL,
    middle_game_score DOUBLE PRECISION NOT NULL,
    end_game_score    DOUBLE PRECISION NOT NULL,
    tactics_score     DOUBLE PRECISION NOT NULL,
    analyzed_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS learning_progress (
    user_id      BIGINT PRIMARY KEY,
    openings     DOUBLE PRECISION NOT NULL,
    middle_game  DOUBLE PRECISION NOT NULL,
    end_game     DOUBLE PRECISION NOT NULL,
    tactics      DOUBLE PRECISION NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

/// A stored game record
#[derive(Debug, Clone)]
pub struct StoredGame {
    pub user_id: i64,
    pub pgn: String,
}

type AnalysisRow = (Json<Vec<MoveRecord>>, i32, i32, f64, f64, f64, f64, f64);

fn analysis_from_row(row: AnalysisRow) -> GameAnalysis {
    let (Json(comments), mistakes, blunders, accuracy, opening, middle, end, tactics) = row;
    GameAnalysis {
        comments,
        mistakes: u32::try_from(mistakes).unwrap_or(0),
        blunders: u32::try_from(blunders).unwrap_or(0),
        accuracy,
        opening_score: opening,
        middle_game_score: middle,
        end_game_score: end,
        tactics_score: tactics,
    }
}

const ANALYSIS_COLUMNS: &str = "a.comments, a.mistakes, a.blunders, a.accuracy, \
     a.opening_score, a.middle_game_score, a.end_game_score, a.tactics_score";

/// Fetch game data by ID
pub async fn fetch_game(pool: &PgPool, game_id: i64) -> Result<Option<StoredGame>, WorkerError> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT user_id, pgn FROM games WHERE id = $1")
            .bind(game_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(user_id, pgn)| StoredGame { user_id, pgn }))
}

/// Store an analysis, replacing any earlier one for the same game as a whole.
pub async fn save_game_analysis(
    pool: &PgPool,
    game_id: i64,
    analysis: &GameAnalysis,
) -> Result<(), WorkerError> {
    sqlx::query(
        r#"INSERT INTO game_analysis (
            game_id, comments, mistakes, blunders, accuracy,
            opening_score, middle_game_score, end_game_score, tactics_score
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (game_id) DO UPDATE SET
            comments = EXCLUDED.comments,
            mistakes = EXCLUDED.mistakes,
            blunders = EXCLUDED.blunders,
            accuracy = EXCLUDED.accuracy,
            opening_score = EXCLUDED.opening_score,
            middle_game_score = EXCLUDED.middle_game_score,
            end_game_score = EXCLUDED.end_game_score,
            tactics_score = EXCLUDED.tactics_score,
            analyzed_at = NOW()"#,
    )
    .bind(game_id)
    .bind(Json(&analysis.comments))
    .bind(i32::try_from(analysis.mistakes).unwrap_or(i32::MAX))
    .bind(i32::try_from(analysis.blunders).unwrap_or(i32::MAX))
    .bind(analysis.accuracy)
    .bind(analysis.opening_score)
    .bind(analysis.middle_game_score)
    .bind(analysis.end_game_score)
    .bind(analysis.tactics_score)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_game_analysis(
    pool: &PgPool,
    game_id: i64,
) -> Result<Option<GameAnalysis>, WorkerError> {
    let row: Option<AnalysisRow> = sqlx::query_as(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM game_analysis a WHERE a.game_id = $1"
    ))
    .bind(game_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(analysis_from_row))
}

/// Every analyzed game of a user, newest first.
pub async fn fetch_user_analyses(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<GameAnalysis>, WorkerError> {
    let rows: Vec<AnalysisRow> = sqlx::query_as(&format!(
        "SELECT {ANALYSIS_COLUMNS} FROM game_analysis a \
         JOIN games g ON g.id = a.game_id \
         WHERE g.user_id = $1 ORDER BY g.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(analysis_from_row).collect())
}

/// The user's latest games with their accuracy when analyzed, newest first.
pub async fn fetch_recent_games(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<RecentGame>, WorkerError> {
    let rows: Vec<(String, Option<f64>)> = sqlx::query_as(
        r#"SELECT g.result, a.accuracy FROM games g
        LEFT JOIN game_analysis a ON a.game_id = g.id
        WHERE g.user_id = $1
        ORDER BY g.created_at DESC
        LIMIT $2"#,
    )
    .bind(user_id)
    .bind(RECENT_GAMES as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        // `result` is `victory`, `defeat` or `draw` from the player's side
        .map(|(result, accuracy)| RecentGame {
            won: result == "victory",
            accuracy,
        })
        .collect())
}

pub async fn fetch_learning_progress(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<LearningProgress>, WorkerError> {
    let row: Option<(f64, f64, f64, f64)> = sqlx::query_as(
        "SELECT openings, middle_game, end_game, tactics FROM learning_progress WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(openings, middle_game, end_game, tactics)| LearningProgress {
        openings,
        middle_game,
        end_game,
        tactics,
    }))
}

/// Fold an analysis into the user's stored progress inside one transaction.
///
/// The first sample is inserted as-is; later ones lock the row before reading
/// it, so concurrent folds for the same user apply one after the other.
pub async fn fold_learning_progress(
    pool: &PgPool,
    user_id: i64,
    analysis: &GameAnalysis,
) -> Result<LearningProgress, WorkerError> {
    let mut tx = pool.begin().await?;

    let first = fold_into(None, analysis);
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"INSERT INTO learning_progress (user_id, openings, middle_game, end_game, tactics)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING user_id"#,
    )
    .bind(user_id)
    .bind(first.openings)
    .bind(first.middle_game)
    .bind(first.end_game)
    .bind(first.tactics)
    .fetch_optional(&mut *tx)
    .await?;

    if inserted.is_some() {
        tx.commit().await?;
        return Ok(first);
    }

    let (openings, middle_game, end_game, tactics): (f64, f64, f64, f64) = sqlx::query_as(
        "SELECT openings, middle_game, end_game, tactics FROM learning_progress \
         WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;
    let current = LearningProgress {
        openings,
        middle_game,
        end_game,
        tactics,
    };
    let updated = fold_into(Some(&current), analysis);

    sqlx::query(
        r#"UPDATE learning_progress SET
            openings = $2, middle_game = $3, end_game = $4, tactics = $5,
            updated_at = NOW()
        WHERE user_id = $1"#,
    )
    .bind(user_id)
    .bind(updated.openings)
    .bind(updated.middle_game)
    .bind(updated.end_game)
    .bind(updated.tactics)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}
