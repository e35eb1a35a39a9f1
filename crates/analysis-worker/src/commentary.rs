//! Per-move teaching comments.
//!
//! Phase/piece rules are tried first; when none applies the comment falls back
//! to a fixed remark for the move's quality label.

use chess_core::{Piece, PlayedMove};

use crate::analysis::QualityLabel;
use crate::analyzer::GamePhase;

pub fn comment_for(
    mv: &PlayedMove,
    label: QualityLabel,
    ply: usize,
    total_plies: usize,
) -> &'static str {
    phase_comment(mv, label, ply, GamePhase::of_ply(ply, total_plies))
        .unwrap_or_else(|| label_comment(label))
}

fn phase_comment(
    mv: &PlayedMove,
    label: QualityLabel,
    ply: usize,
    phase: GamePhase,
) -> Option<&'static str> {
    let rank = mv.to_rank();
    match phase {
        GamePhase::Opening => match mv.piece {
            Piece::Pawn if rank == 4 || rank == 5 => {
                Some("Good central control with this pawn.")
            }
            Piece::Knight | Piece::Bishop => {
                Some("Developing the minor pieces is key in the opening.")
            }
            Piece::Queen if ply < 6 => Some(
                "Careful bringing the queen out this early, it can become a target.",
            ),
            Piece::King if mv.flags.is_castle() => {
                Some("Castling keeps the king safe and connects the rooks.")
            }
            _ => None,
        },
        GamePhase::Middlegame => {
            if mv.flags.capture {
                Some("A capture: make sure the exchange of material favours you.")
            } else if mv.piece == Piece::Knight && (rank == 4 || rank == 5) {
                Some("Knights are strong on central squares.")
            } else if mv.piece == Piece::Rook && matches!(mv.to_file(), 'd' | 'e') {
                Some("Rooks on the central files control important parts of the board.")
            } else {
                None
            }
        }
        GamePhase::Endgame => {
            if mv.piece == Piece::King && !label.is_error() {
                Some("In the endgame the king should become an active piece.")
            } else if mv.piece == Piece::Pawn && (rank == 7 || rank == 2) {
                Some("Pushing pawns in the endgame can create decisive passed pawns.")
            } else {
                None
            }
        }
    }
}

pub fn label_comment(label: QualityLabel) -> &'static str {
    match label {
        QualityLabel::Blunder => {
            "This move loses significant material or position. Look at the alternatives."
        }
        QualityLabel::Mistake => {
            "Not the best choice. Check your opponent's threats before moving."
        }
        QualityLabel::Inaccuracy => "A stronger move was available. Try calculating more lines.",
        QualityLabel::Ok => "A reasonable move that keeps the balance.",
        QualityLabel::Good => "Excellent move that maximises your chances.",
    }
}
