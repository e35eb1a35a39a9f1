//! Integration tests: full game analysis against stub evaluators.

mod common;

use std::time::Duration;

use analysis_worker::analyzer::analyze_pgn;
use analysis_worker::{
    analyze_game, AnalyzeOptions, GamePhase, QualityLabel, WorkerError, MATE_SCORE,
};
use common::{knight_shuffle, CancelAfter, Constant, DiesAfter, Sequence, Stalled};
use tokio_util::sync::CancellationToken;

fn opts() -> AnalyzeOptions {
    AnalyzeOptions::default()
}

#[tokio::test]
async fn test_quiet_opening_all_good() {
    let mut engine = Constant::new(0.0);
    let moves = ["e4", "e5", "Nf3", "Nc6", "Bb5"];
    let a = analyze_game(&mut engine, &moves, &opts(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(a.comments.len(), 5);
    assert!(a.comments.iter().all(|r| r.quality == QualityLabel::Good));
    assert_eq!(a.accuracy, 95.0);
    assert_eq!(a.opening_score, 95.0);
    assert_eq!(a.middle_game_score, 0.0);
    assert_eq!(a.end_game_score, 0.0);
    assert_eq!(a.tactics_score, 0.0);
    assert_eq!(a.mistakes, 0);
    assert_eq!(a.blunders, 0);

    // one evaluation per position
    assert_eq!(engine.calls, 6);

    let plies: Vec<usize> = a.comments.iter().map(|r| r.ply).collect();
    assert_eq!(plies, vec![0, 1, 2, 3, 4]);
    assert_eq!(a.comments[4].move_number, 3);
    assert_eq!(a.comments[4].uci, "f1b5");
}

#[tokio::test]
async fn test_three_pawn_drop_is_blunder() {
    let mut engine = Sequence::new(vec![0.0, -3.0]);
    let a = analyze_game(&mut engine, &["e4"], &opts(), &CancellationToken::new())
        .await
        .unwrap();

    let record = &a.comments[0];
    assert_eq!(record.quality, QualityLabel::Blunder);
    assert_eq!(record.accuracy, 20.0);
    assert_eq!(record.evaluation, -3.0);
    assert_eq!(a.blunders, 1);
    assert_eq!(a.accuracy, 20.0);
}

#[tokio::test]
async fn test_black_judged_from_own_side() {
    // after 1...e5 white is suddenly +1.5: black made a mistake
    let mut engine = Sequence::new(vec![0.0, 0.0, 1.5]);
    let a = analyze_game(&mut engine, &["e4", "e5"], &opts(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(a.comments[0].quality, QualityLabel::Good);
    assert_eq!(a.comments[1].quality, QualityLabel::Mistake);
    assert_eq!(a.mistakes, 1);
}

#[tokio::test]
async fn test_illegal_move_rejects_whole_game() {
    let mut engine = Constant::new(0.0);
    let err = analyze_game(
        &mut engine,
        &["e4", "e5", "Qh5xx"],
        &opts(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        WorkerError::InvalidGameRecord { ply, san, .. } => {
            assert_eq!(ply, 2);
            assert_eq!(san, "Qh5xx");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.calls, 0, "no position may be evaluated");
}

#[tokio::test]
async fn test_phase_buckets_partition_long_game() {
    let moves = knight_shuffle(24);
    // white's 7th move (ply 12) drops three pawns, then the game stays there
    let mut scores = vec![0.0; 13];
    scores.push(-3.0);
    let mut engine = Sequence::new(scores);

    let a = analyze_game(&mut engine, &moves, &opts(), &CancellationToken::new())
        .await
        .unwrap();

    let phases: Vec<GamePhase> = a
        .comments
        .iter()
        .map(|r| GamePhase::of_ply(r.ply, moves.len()))
        .collect();
    let count = |p: GamePhase| phases.iter().filter(|&&q| q == p).count();
    assert_eq!(count(GamePhase::Opening), 10);
    assert_eq!(count(GamePhase::Middlegame), 4);
    assert_eq!(count(GamePhase::Endgame), 10);

    assert_eq!(a.comments[12].quality, QualityLabel::Blunder);
    assert_eq!(a.comments[13].quality, QualityLabel::Good);
    assert_eq!(a.opening_score, 95.0);
    assert_eq!(a.middle_game_score, (95.0 * 3.0 + 20.0) / 4.0);
    assert_eq!(a.end_game_score, 95.0);
    assert_eq!(a.tactics_score, 0.0);
    assert_eq!(a.accuracy, (95.0 * 23.0 + 20.0) / 24.0);
    assert_eq!(engine.fens.len(), 25);
}

#[tokio::test]
async fn test_short_game_has_no_endgame_score() {
    let mut engine = Constant::new(0.0);
    let moves = knight_shuffle(15);
    let a = analyze_game(&mut engine, &moves, &opts(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(a.comments.len(), 15);
    assert_eq!(a.opening_score, 95.0);
    assert_eq!(a.middle_game_score, 0.0);
    assert_eq!(a.end_game_score, 0.0);
    // every ply still counts toward the overall accuracy
    assert_eq!(a.accuracy, 95.0);
    assert_eq!(engine.calls, 16);
}

#[tokio::test]
async fn test_twenty_plies_still_short() {
    let mut engine = Constant::new(0.0);
    let a = analyze_game(&mut engine, &knight_shuffle(20), &opts(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(a.end_game_score, 0.0);

    let mut engine = Constant::new(0.0);
    let a = analyze_game(&mut engine, &knight_shuffle(21), &opts(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(a.end_game_score, 95.0);
    assert_eq!(a.middle_game_score, 95.0);
}

#[tokio::test]
async fn test_pgn_from_custom_position_rejected() {
    let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"]

1. e4 Kd7 2. e5 *"#;
    let mut engine = Constant::new(0.0);
    let err = analyze_pgn(&mut engine, pgn, &opts(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::InvalidGameRecord { ply: 0, .. }));
    assert!(err.is_client_error());
    assert_eq!(engine.calls, 0);
}

#[tokio::test]
async fn test_pgn_main_line_analyzed() {
    let pgn = r#"[White "A"]
[Black "B"]

1. e4 {best by test} e5 (1... c5 2. Nf3) 2. Nf3 $1 Nc6 *"#;
    let mut engine = Constant::new(0.0);
    let a = analyze_pgn(&mut engine, pgn, &opts(), &CancellationToken::new())
        .await
        .unwrap();
    let sans: Vec<&str> = a.comments.iter().map(|r| r.san.as_str()).collect();
    assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6"]);
}

#[tokio::test]
async fn test_captures_also_feed_tactics() {
    let mut engine = Constant::new(0.0);
    let moves = ["e4", "d5", "exd5", "Qxd5", "Nc3"];
    let a = analyze_game(&mut engine, &moves, &opts(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(a.tactics_score, 95.0);
    assert_eq!(a.opening_score, 95.0);
    assert!(a.comments[2].is_forcing());
}

#[tokio::test]
async fn test_mate_scored_without_engine() {
    let mut engine = Constant::new(0.0);
    let a = analyze_game(
        &mut engine,
        &["f3", "e5", "g4", "Qh4#"],
        &opts(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(engine.calls, 4, "mated position is not sent to the engine");
    let mate = &a.comments[3];
    assert_eq!(mate.san, "Qh4#");
    assert_eq!(mate.evaluation, -MATE_SCORE);
    assert_eq!(mate.quality, QualityLabel::Good);
    assert!(a
        .comments
        .iter()
        .all(|r| (0.0..=100.0).contains(&r.accuracy)));
}

#[tokio::test]
async fn test_empty_game() {
    let mut engine = Constant::new(0.0);
    let none: [&str; 0] = [];
    let a = analyze_game(&mut engine, &none, &opts(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(a.comments.is_empty());
    assert_eq!(a.accuracy, 0.0);
    assert_eq!(engine.calls, 0);
}

#[tokio::test]
async fn test_slow_evaluator_times_out() {
    let mut engine = Stalled(Duration::from_secs(5));
    let opts = AnalyzeOptions {
        eval_timeout: Duration::from_millis(20),
    };
    let err = analyze_game(&mut engine, &["e4", "e5"], &opts, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkerError::EvaluatorTimeout {
            ply: 0,
            timeout_ms: 20
        }
    ));
    assert_eq!(err.status_code(), 504);
}

#[tokio::test]
async fn test_engine_dying_mid_game_fails_analysis() {
    let mut engine = DiesAfter {
        fail_on: 4,
        calls: 0,
    };
    let err = analyze_game(&mut engine, &knight_shuffle(12), &opts(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::EvaluatorUnavailable(_)));
    assert_eq!(err.status_code(), 503);
    // nothing is evaluated past the failure
    assert_eq!(engine.calls, 4);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut engine = Constant::new(0.0);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = analyze_game(&mut engine, &["e4"], &opts(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Cancelled));
    assert_eq!(engine.calls, 0);
}

#[tokio::test]
async fn test_cancelled_mid_game() {
    let cancel = CancellationToken::new();
    let mut engine = CancelAfter {
        token: cancel.clone(),
        after: 3,
        calls: 0,
    };
    let err = analyze_game(&mut engine, &knight_shuffle(12), &opts(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Cancelled));
    assert_eq!(engine.calls, 3);
}

#[tokio::test]
async fn test_cancel_interrupts_stalled_call() {
    let cancel = CancellationToken::new();
    let mut engine = Stalled(Duration::from_secs(30));
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = analyze_game(&mut engine, &["e4"], &opts(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Cancelled));
}

#[tokio::test]
async fn test_analysis_json_shape() {
    let mut engine = Constant::new(0.0);
    let a = analyze_game(&mut engine, &["d4"], &opts(), &CancellationToken::new())
        .await
        .unwrap();
    let json = serde_json::to_value(&a).unwrap();
    for key in [
        "comments",
        "mistakes",
        "blunders",
        "accuracy",
        "openingScore",
        "middleGameScore",
        "endGameScore",
        "tacticsScore",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    let record = &json["comments"][0];
    assert_eq!(record["move"], "d4");
    assert_eq!(record["moveNumber"], 1);
    assert_eq!(record["color"], "white");
    assert_eq!(record["quality"], "good");
}
