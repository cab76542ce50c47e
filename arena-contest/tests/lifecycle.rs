mod common;

use arena_contest::{
    derive_randomness, CommitmentScheme, ContestError, ErrorKind, GameEvent, GameRegistry,
    Settlement, Sha256Scheme,
};
use arena_core::{Amount, ArenaConfig, EntropyBeacon};
use chrono::Duration;
use std::sync::Arc;
use common::{account, sats, Arena, SECRET};

#[test]
fn test_full_game_scenario() {
    let mut arena = Arena::new(&["p1", "p2", "p3"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1", "p2", "p3"]);
    assert_eq!(arena.escrow(), sats(3_000));

    let map_size = arena.registry.close(Arena::creator(), id).unwrap();
    assert_eq!(map_size, 13);

    arena.reveal(id);
    let game = arena.registry.game(id).unwrap();
    let entropy = game.commit_reveal().entropy().unwrap();
    assert_eq!(
        game.commit_reveal().randomness(),
        Some(derive_randomness(&entropy, SECRET))
    );

    let plan = arena
        .registry
        .payout(Arena::gm(), id, &[account("p1"), account("p2")])
        .unwrap();
    assert_eq!(plan.operator_cut, sats(30));
    assert_eq!(plan.per_winner, sats(1_485));
    assert_eq!(plan.remainder, Amount::ZERO);

    assert_eq!(arena.balance("p1"), sats(5_485));
    assert_eq!(arena.balance("p2"), sats(5_485));
    assert_eq!(arena.balance("p3"), sats(4_000));
    assert_eq!(arena.balance("operator"), sats(30));
    assert_eq!(arena.escrow(), Amount::ZERO);

    let info = arena.registry.info(id).unwrap();
    assert!(info.has_paid_out);
    assert_eq!(info.payout_per_winner, Some(sats(1_485)));
    assert_eq!(info.map_size, Some(13));

    let seed = arena.registry.map_seed(id).unwrap();
    assert_eq!(seed.players, vec![account("p1"), account("p2"), account("p3")]);

    let last = arena.registry.events().last().unwrap();
    assert!(matches!(
        &last.event,
        GameEvent::PayoutCompleted { per_winner, .. } if *per_winner == sats(1_485)
    ));
}

#[test]
fn test_dust_stays_in_escrow() {
    // 101 * 10 = 1010 -> cut 10, 1000 over 3 winners = 333, 1 sat left behind
    let players = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    let mut arena = Arena::new(&players, 1_000);
    let id = arena.open_game(101);
    arena.join_all(id, &players);
    arena.registry.close(Arena::creator(), id).unwrap();

    let plan = arena
        .registry
        .payout(Arena::gm(), id, &[account("a"), account("b"), account("c")])
        .unwrap();
    assert_eq!(plan.per_winner, sats(333));
    assert_eq!(plan.remainder, sats(1));
    assert_eq!(arena.escrow(), sats(1));
    assert_eq!(arena.balance("operator"), sats(10));
}

#[test]
fn test_failed_reveal_can_be_retried() {
    let mut arena = Arena::new(&[], 0);
    let id = arena.open_game(1_000);
    arena.beacon.advance(1);
    arena
        .registry
        .capture_entropy(Arena::gm(), id, "wss://game.example/1")
        .unwrap();

    let err = arena.registry.reveal(Arena::gm(), id, b"wrong").unwrap_err();
    assert!(matches!(err, ContestError::InvalidCommitment));
    assert!(!arena.registry.info(id).unwrap().has_revealed);

    arena.registry.reveal(Arena::gm(), id, SECRET).unwrap();
    assert!(arena.registry.info(id).unwrap().has_revealed);

    let err = arena.registry.reveal(Arena::gm(), id, SECRET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_reveal_blocked_when_capture_missed() {
    let mut arena = Arena::new(&[], 0);
    let id = arena.open_game(1_000);
    let checkpoint = arena.registry.info(id).unwrap().commit_checkpoint.unwrap();

    let err = arena
        .registry
        .capture_entropy(Arena::gm(), id, "wss://game.example/1")
        .unwrap_err();
    assert!(matches!(err, ContestError::CheckpointNotReached { .. }));

    arena.beacon.advance(100);
    assert!(arena.beacon.sample(checkpoint).is_none());

    let err = arena
        .registry
        .capture_entropy(Arena::gm(), id, "wss://game.example/1")
        .unwrap_err();
    assert!(matches!(err, ContestError::EntropyExpired(_)));

    let err = arena.registry.reveal(Arena::gm(), id, SECRET).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_commit_once() {
    let mut arena = Arena::new(&[], 0);
    let id = arena.open_game(1_000);
    let first = arena.registry.info(id).unwrap().committed_hash;

    let err = arena
        .registry
        .commit(Arena::gm(), id, Sha256Scheme::commit(b"another"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(arena.registry.info(id).unwrap().committed_hash, first);
}

#[test]
fn test_join_guards_leave_players_untouched() {
    let mut arena = Arena::new(&["p1", "p2"], 5_000);
    let id = arena
        .registry
        .create_game(Arena::creator(), Arena::gm(), sats(1_000))
        .unwrap();

    // not open yet
    let err = arena.registry.join(account("p1"), id, sats(1_000)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    arena
        .registry
        .commit(Arena::gm(), id, Sha256Scheme::commit(SECRET))
        .unwrap();

    let err = arena.registry.join(account("p1"), id, sats(999)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    arena.registry.join(account("p1"), id, sats(1_000)).unwrap();
    let err = arena.registry.join(account("p1"), id, sats(1_000)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    assert_eq!(arena.registry.players(id).unwrap(), &[account("p1")]);
    assert_eq!(arena.balance("p1"), sats(4_000));
    assert_eq!(arena.escrow(), sats(1_000));
}

#[test]
fn test_abandoned_game_can_be_closed_by_anyone() {
    let mut arena = Arena::new(&["p1"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1"]);

    arena.advance(Duration::minutes(30));
    let err = arena.registry.close(account("stranger"), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    arena.advance(Duration::minutes(31));
    assert_eq!(arena.registry.close(account("stranger"), id).unwrap(), 5);
}

#[test]
fn test_withdrawal_fallback_returns_every_stake() {
    let mut arena = Arena::new(&["p1", "p2"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1", "p2"]);
    arena.registry.close(Arena::creator(), id).unwrap();

    let err = arena.registry.withdraw(account("p1"), id).unwrap_err();
    assert!(matches!(err, ContestError::PayoutTimeoutNotElapsed));

    arena.advance(Duration::hours(25));
    assert_eq!(arena.registry.withdraw(account("p1"), id).unwrap(), sats(1_000));

    let err = arena
        .registry
        .payout(Arena::gm(), id, &[account("p2")])
        .unwrap_err();
    assert!(matches!(err, ContestError::WithdrawalModeActive));

    let err = arena.registry.withdraw(account("p1"), id).unwrap_err();
    assert!(matches!(err, ContestError::AlreadyWithdrawn(_)));

    let err = arena.registry.withdraw(account("outsider"), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    assert_eq!(arena.registry.withdraw(account("p2"), id).unwrap(), sats(1_000));
    assert_eq!(arena.balance("p1"), sats(5_000));
    assert_eq!(arena.balance("p2"), sats(5_000));
    assert_eq!(arena.escrow(), Amount::ZERO);

    let started: Vec<_> = arena
        .registry
        .events()
        .iter()
        .filter(|r| matches!(r.event, GameEvent::WithdrawalPeriodStarted { .. }))
        .collect();
    assert_eq!(started.len(), 1);
    assert!(matches!(
        arena.registry.game(id).unwrap().settlement(),
        Settlement::Withdrawing { .. }
    ));
}

#[test]
fn test_payout_blocks_withdrawal() {
    let mut arena = Arena::new(&["p1", "p2"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1", "p2"]);
    arena.registry.close(Arena::creator(), id).unwrap();
    arena
        .registry
        .payout(Arena::gm(), id, &[account("p1")])
        .unwrap();

    arena.advance(Duration::days(2));
    let err = arena.registry.withdraw(account("p2"), id).unwrap_err();
    assert!(matches!(err, ContestError::AlreadyPaidOut));

    let err = arena
        .registry
        .payout(Arena::gm(), id, &[account("p2")])
        .unwrap_err();
    assert!(matches!(err, ContestError::AlreadyPaidOut));
}

#[test]
fn test_refused_transfer_rolls_back_payout() {
    let mut arena = Arena::new(&["p1", "p2"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1", "p2"]);
    arena.registry.close(Arena::creator(), id).unwrap();
    let events_before = arena.registry.events().len();

    arena
        .registry
        .treasury_mut()
        .set_refusing(&account("p2"), true);
    let err = arena
        .registry
        .payout(Arena::gm(), id, &[account("p1"), account("p2")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FundTransfer);

    // nothing moved and the game is still unsettled
    assert_eq!(arena.escrow(), sats(2_000));
    assert_eq!(arena.balance("p1"), sats(4_000));
    assert_eq!(arena.balance("operator"), Amount::ZERO);
    assert!(!arena.registry.info(id).unwrap().has_paid_out);
    assert_eq!(arena.registry.events().len(), events_before);

    arena
        .registry
        .treasury_mut()
        .set_refusing(&account("p2"), false);
    arena
        .registry
        .payout(Arena::gm(), id, &[account("p1"), account("p2")])
        .unwrap();
    assert_eq!(arena.escrow(), Amount::ZERO);
}

#[test]
fn test_refused_withdrawal_does_not_start_withdrawal_mode() {
    let mut arena = Arena::new(&["p1"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1"]);
    arena.registry.close(Arena::creator(), id).unwrap();
    arena.advance(Duration::hours(25));

    arena
        .registry
        .treasury_mut()
        .set_refusing(&account("p1"), true);
    let err = arena.registry.withdraw(account("p1"), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FundTransfer);

    let info = arena.registry.info(id).unwrap();
    assert!(!info.withdrawal_mode_active);
    assert!(info.withdrawn.is_empty());

    // gamemaster can still settle normally
    arena
        .registry
        .payout(Arena::gm(), id, &[account("p1")])
        .unwrap_err();
    arena
        .registry
        .treasury_mut()
        .set_refusing(&account("p1"), false);
    arena
        .registry
        .payout(Arena::gm(), id, &[account("p1")])
        .unwrap();
}

#[test]
fn test_payout_requires_gamemaster_and_winners() {
    let mut arena = Arena::new(&["p1"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1"]);
    arena.registry.close(Arena::creator(), id).unwrap();

    let err = arena
        .registry
        .payout(Arena::creator(), id, &[account("p1")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = arena.registry.payout(Arena::gm(), id, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_zero_per_winner_is_arithmetic_error() {
    let mut arena = Arena::new(&["p1"], 5_000);
    let id = arena.open_game(1);
    arena.join_all(id, &["p1"]);
    arena.registry.close(Arena::creator(), id).unwrap();

    let err = arena
        .registry
        .payout(Arena::gm(), id, &[account("p1"), account("p2")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arithmetic);
    assert_eq!(arena.escrow(), sats(1));
}

#[test]
fn test_fee_divisor_is_fixed_at_creation() {
    let mut arena = Arena::new(&["p1", "p2"], 5_000);
    let id = arena.open_game(1_000);
    arena.join_all(id, &["p1", "p2"]);
    arena.registry.close(Arena::creator(), id).unwrap();

    let config = ArenaConfig {
        operator_fee_divisor: 10,
        ..ArenaConfig::default()
    };
    let mut registry = GameRegistry::restore(
        config,
        arena.registry.treasury().clone(),
        arena.clock.clone(),
        arena.beacon.clone(),
        arena.registry.games().cloned().collect(),
        arena.registry.next_game_id(),
    )
    .unwrap();
    assert_eq!(registry.game(id).unwrap().operator_fee_divisor(), 100);

    let plan = registry.payout(Arena::gm(), id, &[account("p1")]).unwrap();
    assert_eq!(plan.operator_cut, sats(20));
    assert_eq!(plan.per_winner, sats(1_980));

    let next = registry
        .create_game(Arena::creator(), Arena::gm(), sats(1_000))
        .unwrap();
    assert_eq!(registry.game(next).unwrap().operator_fee_divisor(), 10);
}
