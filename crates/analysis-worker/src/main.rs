//! Analysis Worker
//!
//! Analyzes games with native Stockfish, either from a PGN file (printing the
//! analysis as JSON) or by game id from Postgres (saving the analysis and
//! updating the player's learning progress).

use std::path::{Path, PathBuf};

use analysis_worker::analyzer::{self, AnalyzeOptions};
use analysis_worker::config::WorkerConfig;
use analysis_worker::db;
use analysis_worker::error::WorkerError;
use analysis_worker::evaluator::{Difficulty, PositionEvaluator};
use analysis_worker::feedback;
use analysis_worker::jobs;
use analysis_worker::pool::EnginePool;
use analysis_worker::stockfish::StockfishEngine;
use chess_core::pgn;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const USAGE: &str = "usage: analysis-worker --pgn <file> [--difficulty beginner|intermediate|advanced]
       analysis-worker --games <id,id,...>
       analysis-worker --feedback <game id>
       analysis-worker --coach <user id>";

enum Mode {
    Pgn {
        path: PathBuf,
        difficulty: Option<Difficulty>,
    },
    Games(Vec<i64>),
    Feedback(i64),
    Coach(i64),
}

/// Parse `--pgn <file> [--difficulty tier]` or `--games 1,2,3` from CLI args
fn parse_args() -> anyhow::Result<Mode> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Some(path) = flag_value(&args, "--pgn") {
        let difficulty = flag_value(&args, "--difficulty")
            .map(str::parse::<Difficulty>)
            .transpose()?;
        return Ok(Mode::Pgn {
            path: PathBuf::from(path),
            difficulty,
        });
    }

    if let Some(ids_str) = flag_value(&args, "--games") {
        let ids: Vec<i64> = ids_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if !ids.is_empty() {
            return Ok(Mode::Games(ids));
        }
    }

    if let Some(id) = flag_value(&args, "--feedback") {
        return Ok(Mode::Feedback(id.parse()?));
    }
    if let Some(id) = flag_value(&args, "--coach") {
        return Ok(Mode::Coach(id.parse()?));
    }

    anyhow::bail!(USAGE)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let mode = parse_args()?;
    let config = WorkerConfig::from_env()?;
    info!(
        stockfish_path = %config.stockfish_path,
        eval_depth = config.eval_depth,
        engines = config.engine_pool_size,
        "Worker config loaded"
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            warn!("Shutdown requested, cancelling in-flight analyses");
            cancel.cancel();
        }
    });

    match mode {
        Mode::Pgn { path, difficulty } => {
            analyze_pgn_file(&config, &path, difficulty, &cancel).await
        }
        Mode::Games(ids) => analyze_stored_games(&config, ids, &cancel).await,
        Mode::Feedback(game_id) => {
            let pool = db::create_pool(&config).await?;
            let feedback = jobs::feedback_for_game(&pool, game_id).await?;
            println!("{}", serde_json::to_string_pretty(&feedback)?);
            Ok(())
        }
        Mode::Coach(user_id) => {
            let pool = db::create_pool(&config).await?;
            let out = serde_json::json!({
                "difficulty": jobs::difficulty_for_user(&pool, user_id).await?,
                "studyPlan": jobs::study_plan_for_user(&pool, user_id).await?,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

async fn analyze_pgn_file(
    config: &WorkerConfig,
    path: &Path,
    difficulty: Option<Difficulty>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(path).await?;
    let game = pgn::parse_pgn(&text).ok_or_else(|| {
        anyhow::anyhow!(
            "{}: no moves, or the game starts from a custom position",
            path.display()
        )
    })?;
    info!(
        white = game.metadata.white.as_str(),
        black = game.metadata.black.as_str(),
        move_count = game.moves.len(),
        "Loaded PGN"
    );
    let depth = difficulty.map_or(config.eval_depth, Difficulty::search_depth);

    let mut engine = StockfishEngine::new(&config.stockfish_path, depth).await?;
    let opts = AnalyzeOptions {
        eval_timeout: config.eval_timeout,
    };
    let result = analyzer::analyze_game(&mut engine, &game.moves, &opts, cancel).await;
    engine.shutdown().await;

    let analysis = result?;
    let feedback = feedback::generate(&analysis);
    let out = serde_json::json!({
        "game": game.metadata,
        "analysis": analysis,
        "feedback": feedback,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn analyze_stored_games(
    config: &WorkerConfig,
    game_ids: Vec<i64>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let pool = db::create_pool(config).await?;
    db::run_migrations(&pool).await?;
    info!("Database connection pool established");

    info!(count = config.engine_pool_size, "Creating Stockfish engine pool");
    let mut engines = Vec::with_capacity(config.engine_pool_size);
    for engine_id in 0..config.engine_pool_size {
        engines.push(StockfishEngine::new(&config.stockfish_path, config.eval_depth).await?);
        info!(engine_id, "Stockfish engine ready");
    }
    let engines = EnginePool::new(engines);

    let mut tasks = Vec::with_capacity(game_ids.len());
    for game_id in game_ids {
        let engines = engines.clone();
        let pool = pool.clone();
        let config = config.clone();
        let cancel = cancel.clone();
        tasks.push((
            game_id,
            tokio::spawn(async move {
                process_game(&engines, &pool, &config, game_id, &cancel).await
            }),
        ));
    }

    let total = tasks.len();
    let mut passed = 0usize;
    for (game_id, task) in tasks {
        match task.await {
            Ok(Ok(())) => passed += 1,
            Ok(Err(WorkerError::GameNotFound(_))) => warn!(game_id, "Game not found"),
            Ok(Err(e)) => error!(game_id, error = %e, "Analysis failed"),
            Err(e) => error!(game_id, error = %e, "Analysis task panicked"),
        }
    }

    engines.shutdown().await;
    info!(passed, failed = total - passed, "Done");
    Ok(())
}

async fn process_game(
    engines: &EnginePool<StockfishEngine>,
    pool: &PgPool,
    config: &WorkerConfig,
    game_id: i64,
    cancel: &CancellationToken,
) -> Result<(), WorkerError> {
    let mut engine = tokio::select! {
        _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
        engine = engines.checkout() => engine?,
    };

    let opts = AnalyzeOptions {
        eval_timeout: config.eval_timeout,
    };
    let result = jobs::analyze_stored_game(&mut *engine, pool, game_id, &opts, cancel).await;

    if let Err(WorkerError::EvaluatorUnavailable(reason)) = &result {
        // The process is gone or talking nonsense: swap in a fresh one
        warn!(game_id, reason = reason.as_str(), "Replacing Stockfish engine");
        if let Some(mut dead) = engine.discard() {
            dead.shutdown().await;
        }
        match StockfishEngine::new(&config.stockfish_path, config.eval_depth).await {
            Ok(fresh) => engines.add(fresh),
            Err(e) => error!(error = %e, "Failed to respawn Stockfish"),
        }
    } else {
        drop(engine);
    }

    let analysis = result?;
    info!(
        game_id,
        accuracy = analysis.accuracy,
        blunders = analysis.blunders,
        "Analysis complete"
    );
    jobs::update_progress_for_game(pool, game_id).await?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
