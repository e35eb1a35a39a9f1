//! Narrative feedback built from a finished analysis.
//!
//! Everything here is pure and total: odd input (no records, NaN accuracy)
//! falls through to the generic advice rather than failing.

use serde::{Deserialize, Serialize};

use crate::analyzer::{GameAnalysis, MoveRecord};

const STRONG: f64 = 85.0;
const WEAK: f64 = 60.0;
/// Opening sub-accuracy covers this many plies
const OPENING_PLIES: usize = 10;
/// Share of analyzed games an error type must appear in to count as recurrent
const RECURRENCE_SHARE: f64 = 0.5;

const OPENING_ADVICE: &str =
    "Study the basic opening principles: control the centre, develop your pieces and keep your king safe.";
const TACTICS_ADVICE: &str =
    "Practise tactics puzzles to sharpen your board vision and calculation.";
const BLUNDER_ADVICE: &str =
    "Double-check each move before playing it and look for your opponent's threats.";
const DEPTH_ADVICE: &str = "Try to analyze each position more deeply before moving.";
const GENERIC_ADVICE: &str =
    "Keep practicing and studying different positions to improve even further.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn generate(analysis: &GameAnalysis) -> Feedback {
    let mut fb = Feedback::default();
    let comments = &analysis.comments;

    let opening = &comments[..comments.len().min(OPENING_PLIES)];
    if let Some(acc) = mean_accuracy(opening.iter()) {
        if acc > STRONG {
            fb.strengths.push("Good knowledge of openings".to_string());
        } else if acc < WEAK {
            fb.weaknesses.push("Struggles in the opening".to_string());
            fb.recommendations.push(OPENING_ADVICE.to_string());
        }
    }

    if let Some(acc) = mean_accuracy(comments.iter().filter(|r| r.is_forcing())) {
        if acc > STRONG {
            fb.strengths.push("Good tactical skills".to_string());
        } else if acc < WEAK {
            fb.weaknesses.push("Struggles with tactics".to_string());
            fb.recommendations.push(TACTICS_ADVICE.to_string());
        }
    }

    if analysis.blunders > 0 {
        fb.weaknesses
            .push(format!("{} blunder(s) made", analysis.blunders));
        fb.recommendations.push(BLUNDER_ADVICE.to_string());
    }

    if analysis.accuracy > STRONG {
        fb.strengths
            .push(format!("High overall accuracy ({:.1}%)", analysis.accuracy));
    } else if analysis.accuracy < WEAK {
        fb.weaknesses
            .push(format!("Low overall accuracy ({:.1}%)", analysis.accuracy));
        fb.recommendations.push(DEPTH_ADVICE.to_string());
    }

    if fb.recommendations.is_empty() {
        fb.recommendations.push(GENERIC_ADVICE.to_string());
    }

    fb
}

fn mean_accuracy<'a>(records: impl Iterator<Item = &'a MoveRecord>) -> Option<f64> {
    let (sum, n) = records.fold((0.0, 0usize), |(sum, n), r| (sum + r.accuracy, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecurrentError {
    /// Mistake or blunder within the first five moves
    OpeningMistakes,
    /// Mistake or blunder on a capture or check
    TacticalMisses,
    /// Mistake or blunder after move 20
    EndgameMistakes,
}

impl RecurrentError {
    pub const ALL: [RecurrentError; 3] = [
        RecurrentError::OpeningMistakes,
        RecurrentError::TacticalMisses,
        RecurrentError::EndgameMistakes,
    ];

    fn seen_in(self, analysis: &GameAnalysis) -> bool {
        analysis
            .comments
            .iter()
            .filter(|r| r.quality.is_error())
            .any(|r| match self {
                RecurrentError::OpeningMistakes => r.move_number <= 5,
                RecurrentError::TacticalMisses => r.is_forcing(),
                RecurrentError::EndgameMistakes => r.move_number > 20,
            })
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RecurrentError::OpeningMistakes => {
                "Focus on opening principles and avoid moving the same piece several times early on."
            }
            RecurrentError::TacticalMisses => {
                "Solve tactics exercises daily to improve your board vision."
            }
            RecurrentError::EndgameMistakes => {
                "Study basic endgame principles and practise common endgame positions."
            }
        }
    }

    fn resources(self) -> [LearningResource; 2] {
        match self {
            RecurrentError::OpeningMistakes => [
                LearningResource::article(
                    "Opening Principles",
                    "The fundamentals of a good start to the game",
                ),
                LearningResource::exercise(
                    "Opening Training",
                    "Practise the first 10 moves of popular openings",
                ),
            ],
            RecurrentError::TacticalMisses => [
                LearningResource::exercise(
                    "Tactics Exercises",
                    "Solve tactical problems to improve your board vision",
                ),
                LearningResource::article(
                    "Common Tactical Patterns",
                    "Learn to recognise forks, skewers and other patterns",
                ),
            ],
            RecurrentError::EndgameMistakes => [
                LearningResource::article(
                    "Endgame Fundamentals",
                    "Essential principles for playing the end of the game well",
                ),
                LearningResource::exercise(
                    "Basic Endgames",
                    "Practise king and pawn endings and other fundamental positions",
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Article,
    Exercise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningResource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub title: String,
    pub description: String,
}

impl LearningResource {
    fn article(title: &str, description: &str) -> Self {
        Self {
            kind: ResourceKind::Article,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    fn exercise(title: &str, description: &str) -> Self {
        Self {
            kind: ResourceKind::Exercise,
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveFeedback {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub recurrent_errors: Vec<RecurrentError>,
    pub learning_resources: Vec<LearningResource>,
}

/// Error types present in at least half of `history`. Empty history has none.
pub fn recurrent_errors(history: &[GameAnalysis]) -> Vec<RecurrentError> {
    if history.is_empty() {
        return Vec::new();
    }
    let threshold = history.len() as f64 * RECURRENCE_SHARE;
    RecurrentError::ALL
        .into_iter()
        .filter(|kind| {
            let games = history.iter().filter(|a| kind.seen_in(a)).count();
            games as f64 >= threshold
        })
        .collect()
}

/// Feedback for `analysis` enriched with patterns from the player's `history`
/// (their analyzed games, usually including this one).
pub fn generate_adaptive(analysis: &GameAnalysis, history: &[GameAnalysis]) -> AdaptiveFeedback {
    let mut feedback = generate(analysis);
    let recurrent = recurrent_errors(history);

    let mut resources = Vec::new();
    for kind in &recurrent {
        let advice = kind.recommendation();
        if !feedback.recommendations.iter().any(|r| r == advice) {
            feedback.recommendations.push(advice.to_string());
        }
        resources.extend(kind.resources());
    }

    if analysis.accuracy < WEAK {
        resources.push(LearningResource::exercise(
            "Calculating Variations",
            "Improve your ability to calculate future moves",
        ));
    }
    if analysis.blunders > 2 {
        resources.push(LearningResource::article(
            "How to Avoid Blunders",
            "Techniques for checking your moves before you play them",
        ));
    }

    AdaptiveFeedback {
        feedback,
        recurrent_errors: recurrent,
        learning_resources: resources,
    }
}
