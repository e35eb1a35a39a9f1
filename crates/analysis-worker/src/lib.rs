pub mod analysis;
pub mod analyzer;
pub mod coach;
pub mod commentary;
pub mod config;
pub mod db;
pub mod error;
pub mod evaluator;
pub mod feedback;
pub mod hint;
pub mod jobs;
pub mod pool;
pub mod progress;
pub mod stockfish;

pub use analysis::{classify, Classification, QualityLabel};
pub use analyzer::{analyze_game, AnalyzeOptions, GameAnalysis, GamePhase, MoveRecord};
pub use error::WorkerError;
pub use evaluator::{Difficulty, PositionEvaluator, MATE_SCORE};
pub use feedback::{AdaptiveFeedback, Feedback};
pub use progress::{fold_into, LearningArea, LearningProgress, SMOOTHING_WEIGHT};
