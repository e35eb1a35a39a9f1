//! Coaching helpers driven by a player's history: engine tier and study plan.

use serde::{Deserialize, Serialize};

use crate::evaluator::Difficulty;
use crate::progress::{LearningArea, LearningProgress};

/// Games considered when picking a difficulty
pub const RECENT_GAMES: usize = 5;
const MIN_GAMES: usize = 3;

/// Summary of one finished game, newest first when passed in a slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentGame {
    pub won: bool,
    /// Overall accuracy when the game has been analyzed
    pub accuracy: Option<f64>,
}

/// Engine tier matching the player's recent form.
pub fn adaptive_difficulty(recent: &[RecentGame]) -> Difficulty {
    let games = &recent[..recent.len().min(RECENT_GAMES)];
    if games.len() < MIN_GAMES {
        return Difficulty::Beginner;
    }

    let analyzed: Vec<f64> = games.iter().filter_map(|g| g.accuracy).collect();
    let accuracy = if analyzed.is_empty() {
        0.0
    } else {
        analyzed.iter().sum::<f64>() / analyzed.len() as f64
    };
    let wins = games.iter().filter(|g| g.won).count();
    let win_rate = wins as f64 / games.len() as f64 * 100.0;

    if accuracy > 85.0 && win_rate > 70.0 {
        Difficulty::Advanced
    } else if accuracy > 65.0 && win_rate > 40.0 {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlan {
    /// `fundamentals`, or the weakest learning area
    pub focus: String,
    pub recommendations: Vec<String>,
    pub exercises: Vec<String>,
}

impl StudyPlan {
    fn new(focus: &str, recommendations: [&str; 3], exercises: [&str; 3]) -> Self {
        Self {
            focus: focus.to_string(),
            recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
            exercises: exercises.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn study_plan(progress: Option<&LearningProgress>) -> StudyPlan {
    let Some(progress) = progress else {
        return StudyPlan::new(
            "fundamentals",
            [
                "Learn how each piece moves",
                "Practise the opening principles: control the centre, develop your pieces and keep your king safe",
                "Study simple tactical patterns such as forks and skewers",
            ],
            [
                "Practise basic king and pawn endings",
                "Solve mate-in-one puzzles",
                "Play games focusing on sound piece development",
            ],
        );
    };

    let area = progress.weakest_area();
    match area {
        LearningArea::Openings => StudyPlan::new(
            area.as_str(),
            [
                "Study the opening principles: control the centre, develop your pieces and keep your king safe",
                "Learn one solid opening with White, such as the Italian Game or the Ruy Lopez",
                "Learn a reliable answer to 1.e4, such as the Sicilian or the French Defence",
            ],
            [
                "Drill the first 10 moves of one opening",
                "Go through master games played in your chosen openings",
                "Play games focusing only on correct development",
            ],
        ),
        LearningArea::MiddleGame => StudyPlan::new(
            area.as_str(),
            [
                "Study strategic middlegame plans",
                "Learn to evaluate positions and spot weaknesses",
                "Practise piece coordination and king attacks",
            ],
            [
                "Solve medium-difficulty tactics puzzles",
                "Analyze middlegame positions and find the best plan",
                "Play thematic games built around a king attack",
            ],
        ),
        LearningArea::EndGame => StudyPlan::new(
            area.as_str(),
            [
                "Study the basic endgame principles",
                "Learn the essential king and pawn endings",
                "Practise activating your king in the endgame",
            ],
            [
                "Play out basic endgames against the computer",
                "Study classical endgame positions",
                "Solve endgame studies with precise solutions",
            ],
        ),
        LearningArea::Tactics => StudyPlan::new(
            area.as_str(),
            [
                "Study common tactical patterns: forks, skewers, double attacks",
                "Practise calculating variations",
                "Learn to recognise tactical opportunities",
            ],
            [
                "Solve tactics puzzles every day",
                "Do visualisation exercises",
                "Review your games for missed tactical chances",
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(won: bool, accuracy: f64) -> RecentGame {
        RecentGame {
            won,
            accuracy: Some(accuracy),
        }
    }

    #[test]
    fn test_too_few_games_is_beginner() {
        assert_eq!(adaptive_difficulty(&[]), Difficulty::Beginner);
        assert_eq!(
            adaptive_difficulty(&[game(true, 99.0), game(true, 99.0)]),
            Difficulty::Beginner
        );
    }

    #[test]
    fn test_tiers() {
        let strong = [game(true, 90.0); 4];
        assert_eq!(adaptive_difficulty(&strong), Difficulty::Advanced);

        let decent = [game(true, 70.0), game(false, 70.0), game(true, 70.0)];
        assert_eq!(adaptive_difficulty(&decent), Difficulty::Intermediate);

        // accurate but losing
        let losing = [game(false, 95.0); 3];
        assert_eq!(adaptive_difficulty(&losing), Difficulty::Beginner);
    }

    #[test]
    fn test_only_recent_games_count() {
        let mut history = vec![game(true, 90.0); RECENT_GAMES];
        history.extend([game(false, 10.0); 10]);
        assert_eq!(adaptive_difficulty(&history), Difficulty::Advanced);
    }

    #[test]
    fn test_unanalyzed_games_score_zero_accuracy() {
        let unanalyzed = [RecentGame {
            won: true,
            accuracy: None,
        }; 3];
        assert_eq!(adaptive_difficulty(&unanalyzed), Difficulty::Beginner);
    }

    #[test]
    fn test_study_plan_focus() {
        let plan = study_plan(None);
        assert_eq!(plan.focus, "fundamentals");
        assert_eq!(plan.recommendations.len(), 3);

        let progress = LearningProgress {
            openings: 80.0,
            middle_game: 75.0,
            end_game: 30.0,
            tactics: 60.0,
        };
        let plan = study_plan(Some(&progress));
        assert_eq!(plan.focus, "endGame");
        assert_eq!(plan.exercises.len(), 3);
    }
}
