//! Move quality classification: pure functions only
//! (No Board/Engine/Database dependencies)

use chess_core::Side;
use serde::{Deserialize, Serialize};

/// Classification thresholds (pawns lost by the mover). A delta exactly on a
/// threshold belongs to the milder label.
const THRESHOLD_BLUNDER: f64 = 2.0;
const THRESHOLD_MISTAKE: f64 = 1.0;
const THRESHOLD_INACCURACY: f64 = 0.5;
const THRESHOLD_OK: f64 = 0.2;

/// Move quality, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    Blunder,
    Mistake,
    Inaccuracy,
    Ok,
    Good,
}

impl QualityLabel {
    pub const ALL: [QualityLabel; 5] = [
        QualityLabel::Blunder,
        QualityLabel::Mistake,
        QualityLabel::Inaccuracy,
        QualityLabel::Ok,
        QualityLabel::Good,
    ];

    /// Per-move accuracy awarded for this label.
    pub fn accuracy(self) -> f64 {
        match self {
            QualityLabel::Blunder => 20.0,
            QualityLabel::Mistake => 50.0,
            QualityLabel::Inaccuracy => 70.0,
            QualityLabel::Ok => 85.0,
            QualityLabel::Good => 95.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityLabel::Blunder => "blunder",
            QualityLabel::Mistake => "mistake",
            QualityLabel::Inaccuracy => "inaccuracy",
            QualityLabel::Ok => "ok",
            QualityLabel::Good => "good",
        }
    }

    /// Mistakes and blunders.
    pub fn is_error(self) -> bool {
        self <= QualityLabel::Mistake
    }
}

impl std::fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: QualityLabel,
    pub accuracy: f64,
    /// Pawns lost by the mover (negative when the move improved their position)
    pub delta: f64,
}

/// Evaluation swing from the mover's point of view; positive means the move
/// made things worse for the mover. Both evals share one perspective (White's).
pub fn mover_delta(eval_before: f64, eval_after: f64, mover: Side) -> f64 {
    if mover.is_white() {
        eval_before - eval_after
    } else {
        eval_after - eval_before
    }
}

/// Label for a delta. Defined for every input, NaN included (treated as no loss).
pub fn label_for_delta(delta: f64) -> QualityLabel {
    if delta > THRESHOLD_BLUNDER {
        QualityLabel::Blunder
    } else if delta > THRESHOLD_MISTAKE {
        QualityLabel::Mistake
    } else if delta > THRESHOLD_INACCURACY {
        QualityLabel::Inaccuracy
    } else if delta > THRESHOLD_OK {
        QualityLabel::Ok
    } else {
        QualityLabel::Good
    }
}

pub fn classify(eval_before: f64, eval_after: f64, mover: Side) -> Classification {
    let delta = mover_delta(eval_before, eval_after, mover);
    let label = label_for_delta(delta);
    Classification {
        label,
        accuracy: label.accuracy(),
        delta,
    }
}
