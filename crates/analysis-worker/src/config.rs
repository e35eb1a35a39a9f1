//! Worker configuration from environment variables

use std::env;
use std::time::Duration;

use crate::error::WorkerError;
use crate::evaluator::Difficulty;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Database connection URL. Only required when analyzing stored games.
    pub database_url: Option<String>,

    /// Maximum Postgres connections in the pool
    pub db_max_connections: u32,

    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search depth used for position evaluation during game analysis
    pub eval_depth: u8,

    /// Upper bound for a single evaluator call
    pub eval_timeout: Duration,

    /// Number of engine processes (one in-flight analysis per engine)
    pub engine_pool_size: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, WorkerError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let db_max_connections = parse_var("DB_MAX_CONNECTIONS")?.unwrap_or(5);

        let stockfish_path = env::var("STOCKFISH_PATH")
            .unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string());

        let eval_depth = parse_var("EVAL_DEPTH")?.unwrap_or(Difficulty::Advanced.search_depth());
        if eval_depth == 0 {
            return Err(WorkerError::Config("EVAL_DEPTH must be at least 1"));
        }

        let eval_timeout_ms: u64 = parse_var("EVAL_TIMEOUT_MS")?.unwrap_or(30_000);
        if eval_timeout_ms == 0 {
            return Err(WorkerError::Config("EVAL_TIMEOUT_MS must be positive"));
        }

        let engine_pool_size = parse_var("ENGINE_POOL_SIZE")?
            .unwrap_or_else(num_cpus::get)
            .max(1);

        Ok(Self {
            database_url,
            db_max_connections,
            stockfish_path,
            eval_depth,
            eval_timeout: Duration::from_millis(eval_timeout_ms),
            engine_pool_size,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, WorkerError> {
        self.database_url
            .as_deref()
            .ok_or(WorkerError::Config("DATABASE_URL not set"))
    }
}

/// Unset variables are `None`; set-but-unparseable ones are a config error.
fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, WorkerError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WorkerError::Config(name)),
        Err(_) => Ok(None),
    }
}
