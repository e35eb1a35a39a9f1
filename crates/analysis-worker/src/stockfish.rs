//! Stockfish engine wrapper using UCI protocol (async I/O)

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::error::WorkerError;
use crate::evaluator::{white_pov_pawns, PositionEvaluator};

/// Raw result of one `go depth N` search
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Centipawn score (side to move)
    pub cp: Option<i32>,
    /// Mate in N moves (positive = side to move mates)
    pub mate: Option<i32>,
    /// Best move in UCI notation; `None` for `bestmove (none)`
    pub best_move: Option<String>,
}

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Depth used by [`PositionEvaluator::evaluate`]
    eval_depth: u8,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str, eval_depth: u8) -> Result<Self, WorkerError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unavailable(format!("Failed to spawn Stockfish at {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| unavailable("Failed to open Stockfish stdin".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| unavailable("Failed to open Stockfish stdout".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
            eval_depth,
        };

        // Initialize UCI
        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine.send("setoption name Threads value 1").await?;
        engine.send("setoption name Hash value 64").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), WorkerError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| unavailable(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| unavailable(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one trimmed line; a closed pipe means the engine died.
    async fn read_line(&mut self, buf: &mut String) -> Result<(), WorkerError> {
        buf.clear();
        let n = self
            .stdout
            .read_line(buf)
            .await
            .map_err(|e| unavailable(format!("Failed to read from Stockfish: {e}")))?;
        if n == 0 {
            return Err(unavailable("Stockfish closed its output".into()));
        }
        let trimmed_len = buf.trim_end().len();
        buf.truncate(trimmed_len);
        debug!(line = buf.as_str(), "SF >");
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), WorkerError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            if line.trim() == expected {
                return Ok(());
            }
        }
    }

    /// Drain anything left over from an abandoned search.
    ///
    /// `stop` flushes a pending `bestmove`, which is skipped while waiting for
    /// `readyok`.
    async fn sync(&mut self) -> Result<(), WorkerError> {
        self.send("stop").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    /// Search `fen` to `depth` and collect the final score and best move
    pub async fn search(&mut self, fen: &str, depth: u8) -> Result<SearchResult, WorkerError> {
        self.sync().await?;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut result = SearchResult::default();
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;

            if line.starts_with("info") && line.contains(" score ") {
                if let Some(cp) = parse_cp(&line) {
                    result.cp = Some(cp);
                    result.mate = None;
                }
                if let Some(mate) = parse_mate(&line) {
                    result.mate = Some(mate);
                    result.cp = None;
                }
            } else if line.starts_with("bestmove") {
                result.best_move = parse_bestmove(&line)?;
                break;
            }
        }

        Ok(result)
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

#[async_trait]
impl PositionEvaluator for StockfishEngine {
    async fn evaluate(&mut self, fen: &str) -> Result<f64, WorkerError> {
        let depth = self.eval_depth;
        let result = self.search(fen, depth).await?;
        if result.cp.is_none() && result.mate.is_none() && result.best_move.is_some() {
            return Err(unavailable(format!("No score reported for {fen}")));
        }
        Ok(white_pov_pawns(result.cp, result.mate, is_white_to_move(fen)))
    }

    async fn best_move(&mut self, fen: &str, depth: u8) -> Result<Option<String>, WorkerError> {
        Ok(self.search(fen, depth).await?.best_move)
    }

    async fn shutdown(&mut self) {
        self.quit().await;
    }
}

fn unavailable(msg: String) -> WorkerError {
    WorkerError::EvaluatorUnavailable(msg)
}

fn is_white_to_move(fen: &str) -> bool {
    fen.split_whitespace().nth(1) != Some("b")
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "cp" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "mate" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse `bestmove e2e4 ponder e7e5` / `bestmove (none)`
fn parse_bestmove(line: &str) -> Result<Option<String>, WorkerError> {
    match line.split_whitespace().nth(1) {
        Some("(none)") | Some("0000") => Ok(None),
        Some(mv) if (4..=5).contains(&mv.len()) => Ok(Some(mv.to_string())),
        _ => Err(unavailable(format!("Unparseable bestmove line: {line}"))),
    }
}
