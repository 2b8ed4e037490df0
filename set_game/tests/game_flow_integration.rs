//! End-to-end games running on real threads.
//!
//! Each test drives a full game through `GameHandle` and checks what the
//! board, the sessions and the final outcome look like.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use set_game::{
    Card, DisplayEvent, EventRecorder, FeatureOracle, GameConfig, GameError, GameHandle,
    SessionPhase, SetOracle, SlotIndex, Verdict,
};

/// Poll `condition` until it holds or five seconds pass
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn humans_only(human_players: usize) -> GameConfig {
    GameConfig {
        human_players,
        computer_players: 0,
        table_delay_millis: 0,
        point_freeze_millis: 10,
        penalty_freeze_millis: 10,
        ..GameConfig::default()
    }
}

/// Slots currently holding a combination the standard rules accept
/// (or reject, when `legal` is false)
fn find_selection(game: &GameHandle, legal: bool) -> Option<Vec<SlotIndex>> {
    let oracle = FeatureOracle::new(3, 4);
    let dealt = game.board().dealt();
    for (i, a) in dealt.iter().enumerate() {
        for (j, b) in dealt.iter().enumerate().skip(i + 1) {
            for c in dealt.iter().skip(j + 1) {
                if oracle.is_legal_set(&[a.1, b.1, c.1]) == legal {
                    return Some(vec![a.0, b.0, c.0]);
                }
            }
        }
    }
    None
}

// ============================================================================
// Human seats
// ============================================================================

#[test]
fn test_human_scores_legal_set_in_stopwatch_mode() {
    let recorder = Arc::new(EventRecorder::new());
    let mut game = GameHandle::start(
        GameConfig {
            turn_timeout_millis: 0,
            ..humans_only(1)
        },
        recorder.clone(),
    )
    .unwrap();

    // Stopwatch mode reshuffles until the grid holds a set
    let mut selection = None;
    assert!(wait_until(|| {
        selection = game
            .board()
            .placement_stable()
            .then(|| find_selection(&game, true))
            .flatten();
        selection.is_some()
    }));
    let selection = selection.unwrap();

    for &slot in &selection {
        assert!(game.toggle_move(0, slot).unwrap());
    }
    assert!(wait_until(|| game.session(0).unwrap().score() == 1));

    game.shutdown();
    let outcome = game.join().unwrap();
    assert_eq!(outcome.winners, vec![0]);
    assert_eq!(outcome.scores, vec![1]);
    assert_eq!(outcome.high_score, 1);

    assert!(
        recorder
            .events()
            .contains(&DisplayEvent::Score { seat: 0, score: 1 })
    );
    assert!(recorder.events().contains(&DisplayEvent::Winners { seats: vec![0] }));
    assert_eq!(game.board().count_dealt(), 0, "grid reclaimed on shutdown");
    assert!(game.board().tokens_of(0).is_empty());
}

#[test]
fn test_shutdown_interrupts_penalty_freeze() {
    let mut game = GameHandle::start(
        GameConfig {
            penalty_freeze_millis: 60_000,
            ..humans_only(2)
        },
        Arc::new(EventRecorder::new()),
    )
    .unwrap();

    assert!(wait_until(|| game.board().placement_stable()));
    let selection = find_selection(&game, false).expect("twelve cards hold an illegal triple");
    for &slot in &selection {
        game.toggle_move(1, slot).unwrap();
    }
    assert!(wait_until(|| {
        game.session(1).unwrap().snapshot().phase == SessionPhase::Resolved(Verdict::Penalized)
    }));

    let start = Instant::now();
    game.shutdown();
    let outcome = game.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));

    assert_eq!(outcome.high_score, 0);
    assert_eq!(outcome.winners, vec![0, 1], "everyone ties at zero");
    for session in game.sessions() {
        assert_eq!(session.snapshot().phase, SessionPhase::Terminated);
    }
}

#[test]
fn test_unknown_seat_and_double_join() {
    let mut game = GameHandle::start(humans_only(1), Arc::new(EventRecorder::new())).unwrap();
    assert!(matches!(
        game.toggle_move(7, 0),
        Err(GameError::UnknownSeat(7))
    ));

    game.shutdown();
    game.join().unwrap();
    assert!(game.is_finished());
    assert!(matches!(game.join(), Err(GameError::AlreadyJoined)));
}

#[test]
fn test_invalid_config_never_starts() {
    let result = GameHandle::start(
        GameConfig {
            human_players: 0,
            computer_players: 0,
            ..GameConfig::default()
        },
        Arc::new(EventRecorder::new()),
    );
    assert!(matches!(result, Err(GameError::Config(_))));
}

// ============================================================================
// Scripted legality
// ============================================================================

/// Claims the deck always holds a set but the grid never does
struct NeverOnTable {
    grid: usize,
}

impl SetOracle for NeverOnTable {
    fn is_legal_set(&self, _cards: &[Card]) -> bool {
        false
    }

    fn find_sets(&self, pool: &[Card], _limit: usize) -> Vec<Vec<Card>> {
        if pool.len() > self.grid {
            vec![pool[..3].to_vec()]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_stopwatch_keeps_reshuffling_grid_without_sets() {
    let mut game = GameHandle::start_with_oracle(
        GameConfig {
            feature_count: 2,
            deck_size: 9,
            rows: 1,
            columns: 3,
            turn_timeout_millis: 0,
            ..humans_only(1)
        },
        Arc::new(NeverOnTable { grid: 3 }),
        Arc::new(EventRecorder::new()),
    )
    .unwrap();

    assert!(wait_until(|| game.board().generation() >= 3));
    assert!(!game.is_finished());

    game.shutdown();
    let outcome = game.join().unwrap();
    assert_eq!(outcome.scores, vec![0]);
}

#[test]
fn test_countdown_expiry_forces_reshuffle() {
    let recorder = Arc::new(EventRecorder::new());
    let mut game = GameHandle::start(
        GameConfig {
            turn_timeout_millis: 50,
            turn_timeout_warning_millis: 20,
            ..humans_only(1)
        },
        recorder.clone(),
    )
    .unwrap();

    assert!(wait_until(|| game.board().generation() >= 2));
    game.shutdown();
    game.join().unwrap();

    let warnings = recorder.matching(|e| matches!(e, DisplayEvent::Countdown { warn: true, .. }));
    assert!(!warnings.is_empty());
}

// ============================================================================
// Computer seats
// ============================================================================

/// Accepts any combination of distinct cards
struct AnythingGoes;

impl SetOracle for AnythingGoes {
    fn is_legal_set(&self, cards: &[Card]) -> bool {
        let mut distinct = cards.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len() == 3
    }

    fn find_sets(&self, pool: &[Card], _limit: usize) -> Vec<Vec<Card>> {
        if pool.len() >= 3 {
            vec![pool[..3].to_vec()]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_computers_play_until_deck_exhausted() {
    let recorder = Arc::new(EventRecorder::new());
    let mut game = GameHandle::start_with_oracle(
        GameConfig {
            feature_count: 2,
            deck_size: 9,
            rows: 1,
            columns: 3,
            human_players: 0,
            computer_players: 2,
            point_freeze_millis: 0,
            penalty_freeze_millis: 0,
            table_delay_millis: 0,
            ..GameConfig::default()
        },
        Arc::new(AnythingGoes),
        recorder.clone(),
    )
    .unwrap();

    if !wait_until(|| game.is_finished()) {
        game.shutdown();
        panic!("game did not finish on its own");
    }
    let outcome = game.join().unwrap();

    assert_eq!(outcome.scores.iter().sum::<u32>(), 3, "nine cards, three sets");
    assert_eq!(outcome.high_score, *outcome.scores.iter().max().unwrap());
    for &seat in &outcome.winners {
        assert_eq!(outcome.scores[seat], outcome.high_score);
    }

    let scores = recorder.matching(|e| matches!(e, DisplayEvent::Score { .. }));
    assert_eq!(scores.len(), 3);
    for session in game.sessions() {
        assert_eq!(session.snapshot().phase, SessionPhase::Terminated);
    }
}
