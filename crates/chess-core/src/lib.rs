//! Chess rules adapter shared by the analysis crates.
//!
//! Wraps `shakmaty` so callers deal in SAN strings, FEN strings and flagged
//! moves instead of engine-specific board types.

pub mod error;
pub mod game_data;
pub mod pgn;
pub mod replay;

pub use error::ReplayError;
pub use game_data::{GameData, GameMetadata};
pub use replay::{
    replay_san, uci_to_san, MoveFlags, Piece, PlayedMove, Replay, ReplayedPosition, Side,
    Terminal, STANDARD_START_FEN,
};
