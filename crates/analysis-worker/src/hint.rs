//! Move hints: the engine's pick at beginner strength, explained in words.

use chess_core::replay::plies_played;
use chess_core::{uci_to_san, Piece, PlayedMove, ReplayedPosition};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorkerError;
use crate::evaluator::{Difficulty, PositionEvaluator};
use crate::progress::{LearningArea, LearningProgress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    #[serde(rename = "move")]
    pub uci: String,
    pub san: String,
    pub from: String,
    pub to: String,
    pub hint: String,
    /// Weakest area the text was tailored to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapted_to: Option<LearningArea>,
}

/// Suggest a move for the side to move in `fen`. `None` when the game is over.
pub async fn hint<E>(
    evaluator: &mut E,
    fen: &str,
    progress: Option<&LearningProgress>,
) -> Result<Option<Hint>, WorkerError>
where
    E: PositionEvaluator + ?Sized,
{
    let plies = plies_played(fen);
    let position = ReplayedPosition::from_fen(fen).map_err(|e| WorkerError::InvalidGameRecord {
        ply: plies,
        san: String::new(),
        reason: e.to_string(),
    })?;
    if let Some(terminal) = position.terminal {
        debug!(fen, ?terminal, "No hint for a finished game");
        return Ok(None);
    }

    let Some(uci) = evaluator
        .best_move(fen, Difficulty::Beginner.search_depth())
        .await?
    else {
        return Ok(None);
    };
    let mv = uci_to_san(fen, &uci)?;
    debug!(fen, uci = uci.as_str(), san = mv.san.as_str(), "Hint");

    let mut text = move_hint(&mv).to_string();
    let adapted_to = progress.map(|p| {
        let weakest = p.weakest_area();
        if let Some(extra) = area_hint(plies, weakest) {
            text.push(' ');
            text.push_str(extra);
        }
        weakest
    });

    Ok(Some(Hint {
        uci,
        san: mv.san,
        from: mv.from,
        to: mv.to,
        hint: text,
        adapted_to,
    }))
}

fn move_hint(mv: &PlayedMove) -> &'static str {
    let flags = &mv.flags;
    if flags.capture && !flags.en_passant {
        return "Consider capturing one of your opponent's pieces.";
    }
    if flags.en_passant {
        return "An en passant capture could be a good move here.";
    }
    if flags.is_castle() {
        return "Consider castling to keep your king safe.";
    }
    if flags.promotion {
        return "Promoting a pawn could give you a big advantage.";
    }
    match mv.piece {
        Piece::Pawn => "Advancing a pawn can help you control the centre.",
        Piece::Knight | Piece::Bishop => {
            "Developing your minor pieces is important early in the game."
        }
        Piece::Rook => "Rooks are most effective on open files.",
        Piece::Queen => "The queen is powerful, but be careful not to expose her too early.",
        Piece::King => "King safety is crucial. Consider moving it somewhere safer.",
    }
}

/// Extra advice when the position's phase matches the player's weakest area.
fn area_hint(plies: usize, weakest: LearningArea) -> Option<&'static str> {
    let phase = if plies > 20 {
        LearningArea::EndGame
    } else if plies > 10 {
        LearningArea::MiddleGame
    } else {
        LearningArea::Openings
    };

    match weakest {
        LearningArea::Tactics => {
            Some("Look for tactical chances such as forks, skewers and double attacks.")
        }
        area if area != phase => None,
        LearningArea::Openings => Some(
            "Remember the opening principles: control the centre, develop your pieces and keep your king safe.",
        ),
        LearningArea::MiddleGame => Some(
            "In the middlegame, look for tactical opportunities and keep your pieces coordinated.",
        ),
        LearningArea::EndGame => {
            Some("In the endgame, activate your king and try to create passed pawns.")
        }
    }
}
