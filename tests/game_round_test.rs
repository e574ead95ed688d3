//! Full rounds played against a persisted player account

use luxeplay::{
    account::AccountLedger,
    catalog::{GameCatalog, GameUpdate},
    common::Wallet,
    config::AccountConfig,
    errors::GameError,
    games::{
        blackjack::{BlackjackOutcome, BlackjackPhase, Card, Suit},
        mines::RevealOutcome,
        roulette::RouletteBet,
        rng::seeded,
        BetLimits, BlackjackEngine, MinesEngine, RouletteEngine, ScriptedRandom, SlotTheme, SlotsEngine,
    },
    storage::MemoryStore,
};
use std::sync::Arc;

fn player_with(balance: u64) -> AccountLedger<MemoryStore> {
    let config = AccountConfig {
        starting_balance: balance,
        ..Default::default()
    };
    let mut ledger = AccountLedger::open(Arc::new(MemoryStore::new()), config).unwrap();
    ledger.login("player", &mut seeded(1)).unwrap();
    ledger
}

fn deck(ranks: &[u8]) -> Vec<Card> {
    ranks.iter().map(|&rank| Card::new(rank, Suit::Spades)).collect()
}

#[test]
fn test_blackjack_stand_on_19_loses_to_dealer_20() {
    let mut ledger = player_with(1_000);
    let mut engine = BlackjackEngine::new(BetLimits::new(10, 10_000), seeded(2));

    let phase = engine
        .start_round_with_deck(&mut ledger, 100, deck(&[10, 9, 10, 6, 4]))
        .unwrap();
    assert_eq!(phase, BlackjackPhase::Playing);
    assert_eq!(engine.player_total(), 19);
    assert_eq!(ledger.balance(), 900);

    assert_eq!(engine.stand().unwrap(), BlackjackPhase::DealerTurn);
    let result = engine.play_dealer(&mut ledger).unwrap();
    assert_eq!(result.outcome, BlackjackOutcome::DealerWins);
    assert_eq!(result.dealer_total, 20);

    let account = ledger.account().unwrap();
    assert_eq!(account.balance, 900);
    assert_eq!(account.games_played, 1);
    assert_eq!(account.total_wins, 0);
}

#[test]
fn test_blackjack_stand_on_19_beats_dealer_18() {
    let mut ledger = player_with(1_000);
    let mut engine = BlackjackEngine::new(BetLimits::new(10, 10_000), seeded(2));

    engine
        .start_round_with_deck(&mut ledger, 100, deck(&[10, 9, 10, 6, 2]))
        .unwrap();
    let result = engine.stand_and_settle(&mut ledger).unwrap();
    assert_eq!(result.outcome, BlackjackOutcome::PlayerWins);
    assert_eq!(result.dealer_total, 18);

    let account = ledger.account().unwrap();
    assert_eq!(account.balance, 1_100);
    assert_eq!(account.total_wins, 1);
}

#[test]
fn test_roulette_straight_bet_against_account() {
    let mut ledger = player_with(10_000);
    // 7 / 37 lands on pocket 7
    let mut engine = RouletteEngine::new(BetLimits::new(10, 10_000), ScriptedRandom::new([7.5 / 37.0]));

    engine.place_bet(&mut ledger, RouletteBet::Straight(7), 100).unwrap();
    engine.place_bet(&mut ledger, RouletteBet::Black, 200).unwrap();
    assert_eq!(ledger.balance(), 9_700);

    let result = engine.spin(&mut ledger).unwrap();
    assert_eq!(result.number, 7);
    assert_eq!(result.winnings, 3_600);
    assert_eq!(ledger.balance(), 13_300);
    assert_eq!(ledger.account().unwrap().total_wins, 1);
}

#[test]
fn test_mines_round_cash_out() {
    let mut ledger = player_with(1_000);
    let mut engine = MinesEngine::new(BetLimits::new(10, 10_000), seeded(11));
    engine.start_round(&mut ledger, 100, 1).unwrap();

    let safe = engine
        .cells()
        .iter()
        .position(|cell| !cell.is_mine)
        .expect("a safe cell");
    assert!(matches!(
        engine.reveal(&mut ledger, safe).unwrap(),
        RevealOutcome::Safe { revealed: 1, .. }
    ));
    let settlement = engine.cash_out(&mut ledger).unwrap();
    assert_eq!(settlement.payout, 97);
    assert_eq!(ledger.balance(), 997);
}

#[test]
fn test_slots_reject_bet_above_balance() {
    let mut ledger = player_with(50);
    let mut engine = SlotsEngine::new(SlotTheme::Classic, BetLimits::new(10, 1_000), seeded(3));

    let err = engine.spin(&mut ledger, 100).unwrap_err();
    assert_eq!(
        err.as_game(),
        Some(&GameError::InsufficientFunds {
            needed: 100,
            available: 50
        })
    );
    assert_eq!(ledger.account().unwrap().games_played, 0);
}

#[test]
fn test_catalog_limits_gate_rounds() {
    let store = Arc::new(MemoryStore::new());
    let mut catalog = GameCatalog::open(store).unwrap();
    let limits = catalog.limits_for("blackjack", BetLimits::new(1, 1)).unwrap();
    assert_eq!(limits, BetLimits::new(500, 500_000));

    let mut ledger = player_with(10_000);
    let mut engine = BlackjackEngine::new(limits, seeded(4));
    let err = engine.start_round(&mut ledger, 100).unwrap_err();
    assert!(matches!(err.as_game(), Some(GameError::BetOutOfRange { .. })));

    let update = GameUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    catalog.update("blackjack", &update).unwrap();
    assert_eq!(
        catalog.limits_for("blackjack", BetLimits::new(1, 1)),
        Err(GameError::GameInactive("blackjack".to_string()))
    );
}
