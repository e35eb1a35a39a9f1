//! Per-user learning progress, folded from analyses with exponential smoothing.

use serde::{Deserialize, Serialize};

use crate::analyzer::GameAnalysis;

/// Weight of the newest game in the running average.
pub const SMOOTHING_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub openings: f64,
    pub middle_game: f64,
    pub end_game: f64,
    pub tactics: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LearningArea {
    Openings,
    MiddleGame,
    EndGame,
    Tactics,
}

impl LearningArea {
    pub const ALL: [LearningArea; 4] = [
        LearningArea::Openings,
        LearningArea::MiddleGame,
        LearningArea::EndGame,
        LearningArea::Tactics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LearningArea::Openings => "openings",
            LearningArea::MiddleGame => "middleGame",
            LearningArea::EndGame => "endGame",
            LearningArea::Tactics => "tactics",
        }
    }
}

impl LearningProgress {
    pub fn get(&self, area: LearningArea) -> f64 {
        match area {
            LearningArea::Openings => self.openings,
            LearningArea::MiddleGame => self.middle_game,
            LearningArea::EndGame => self.end_game,
            LearningArea::Tactics => self.tactics,
        }
    }

    /// Lowest-scoring area; ties go to the earlier area in [`LearningArea::ALL`].
    pub fn weakest_area(&self) -> LearningArea {
        LearningArea::ALL
            .into_iter()
            .fold(LearningArea::Openings, |weakest, area| {
                if self.get(area) < self.get(weakest) {
                    area
                } else {
                    weakest
                }
            })
    }

    fn from_analysis(analysis: &GameAnalysis) -> Self {
        Self {
            openings: sample(analysis.opening_score),
            middle_game: sample(analysis.middle_game_score),
            end_game: sample(analysis.end_game_score),
            tactics: sample(analysis.tactics_score),
        }
    }
}

/// Fold one analysis into the running progress.
///
/// Order matters: later games carry more weight than earlier ones.
pub fn fold_into(existing: Option<&LearningProgress>, analysis: &GameAnalysis) -> LearningProgress {
    let latest = LearningProgress::from_analysis(analysis);
    match existing {
        None => latest,
        Some(old) => LearningProgress {
            openings: smooth(old.openings, latest.openings),
            middle_game: smooth(old.middle_game, latest.middle_game),
            end_game: smooth(old.end_game, latest.end_game),
            tactics: smooth(old.tactics, latest.tactics),
        },
    }
}

fn smooth(old: f64, latest: f64) -> f64 {
    let old = sample(old);
    old * (1.0 - SMOOTHING_WEIGHT) + latest * SMOOTHING_WEIGHT
}

/// Clamp to [0, 100]; NaN counts as 0.
fn sample(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_with(opening: f64, middle: f64, end: f64, tactics: f64) -> GameAnalysis {
        GameAnalysis {
            comments: Vec::new(),
            mistakes: 0,
            blunders: 0,
            accuracy: 0.0,
            opening_score: opening,
            middle_game_score: middle,
            end_game_score: end,
            tactics_score: tactics,
        }
    }

    #[test]
    fn test_first_game_is_copied() {
        let p = fold_into(None, &analysis_with(80.0, 70.0, 60.0, 50.0));
        assert_eq!(
            p,
            LearningProgress {
                openings: 80.0,
                middle_game: 70.0,
                end_game: 60.0,
                tactics: 50.0,
            }
        );
    }

    #[test]
    fn test_smoothing() {
        let old = LearningProgress {
            openings: 50.0,
            middle_game: 50.0,
            end_game: 100.0,
            tactics: 0.0,
        };
        let p = fold_into(Some(&old), &analysis_with(100.0, 50.0, 0.0, 100.0));
        assert!((p.openings - 65.0).abs() < 1e-9);
        assert!((p.middle_game - 50.0).abs() < 1e-9);
        assert!((p.end_game - 70.0).abs() < 1e-9);
        assert!((p.tactics - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_inputs_clamped() {
        let p = fold_into(None, &analysis_with(140.0, -5.0, f64::NAN, 100.0));
        assert_eq!(p.openings, 100.0);
        assert_eq!(p.middle_game, 0.0);
        assert_eq!(p.end_game, 0.0);
    }

    #[test]
    fn test_weakest_area() {
        let p = LearningProgress {
            openings: 70.0,
            middle_game: 40.0,
            end_game: 55.0,
            tactics: 40.0,
        };
        assert_eq!(p.weakest_area(), LearningArea::MiddleGame);
        assert_eq!(LearningProgress::default().weakest_area(), LearningArea::Openings);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(LearningProgress::default()).unwrap();
        assert!(json.get("middleGame").is_some());
        assert!(json.get("endGame").is_some());
    }
}
