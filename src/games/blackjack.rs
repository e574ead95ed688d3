//! Single-deck blackjack against a fixed dealer policy
//!
//! Stages:
//! Betting -> Playing -> DealerTurn -> Finished
//!
//! A fresh shuffled 52-card deck is used per round. Cards are dealt from the
//! top of the deck in the order player, player, dealer, dealer. The dealer's
//! second card stays hidden until the dealer plays or the round ends.

use crate::common::{scale_floor, Wallet};
use crate::errors::{GameError, LuxeResult};
use crate::games::rng::RandomSource;
use crate::games::types::{ensure_funds, settle, BetLimits, GameType, RoundSettlement};
use serde::{Deserialize, Serialize};
use std::fmt;

const BLACKJACK: u32 = 21;
const DEALER_STANDS_ON: u32 = 17;
const BLACKJACK_PAYOUT: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    fn symbol(&self) -> &'static str {
        match self {
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Spades => "♠",
        }
    }
}

/// Playing card; `rank` is 1 (ace) through 13 (king)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: u8, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn is_ace(&self) -> bool {
        self.rank == 1
    }

    /// Face cards count 10, aces 11 before soft reduction
    pub fn value(&self) -> u32 {
        match self.rank {
            1 => 11,
            11..=13 => 10,
            r => r as u32,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            r => r.to_string(),
        };
        write!(f, "{}{}", rank, self.suit.symbol())
    }
}

/// Best total for a hand: aces drop from 11 to 1 while the hand would bust
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(Card::value).sum();
    let mut soft_aces = cards.iter().filter(|c| c.is_ace()).count();
    while total > BLACKJACK && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total
}

/// Ordered 52-card deck, ace to king per suit
pub fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in 1..=13 {
            deck.push(Card::new(rank, suit));
        }
    }
    deck
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackPhase {
    Betting,
    Playing,
    DealerTurn,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackOutcome {
    /// Natural 21 on the deal, paid at 2.5x
    Blackjack,
    PlayerBust,
    DealerBust,
    PlayerWins,
    DealerWins,
    Push,
}

impl BlackjackOutcome {
    pub fn is_win(&self) -> bool {
        matches!(
            self,
            BlackjackOutcome::Blackjack | BlackjackOutcome::DealerBust | BlackjackOutcome::PlayerWins
        )
    }
}

/// Final state of a blackjack round
#[derive(Debug, Clone, Serialize)]
pub struct BlackjackResult {
    pub outcome: BlackjackOutcome,
    pub player_total: u32,
    pub dealer_total: u32,
    pub settlement: RoundSettlement,
}

pub struct BlackjackEngine<R: RandomSource> {
    limits: BetLimits,
    rng: R,
    phase: BlackjackPhase,
    deck: Vec<Card>,
    player: Vec<Card>,
    dealer: Vec<Card>,
    bet: u64,
    dealer_revealed: bool,
    result: Option<BlackjackResult>,
}

impl<R: RandomSource> BlackjackEngine<R> {
    pub fn new(limits: BetLimits, rng: R) -> Self {
        Self {
            limits,
            rng,
            phase: BlackjackPhase::Betting,
            deck: Vec::new(),
            player: Vec::new(),
            dealer: Vec::new(),
            bet: 0,
            dealer_revealed: false,
            result: None,
        }
    }

    pub fn phase(&self) -> BlackjackPhase {
        self.phase
    }

    /// Current stake, doubled after a double down
    pub fn bet(&self) -> u64 {
        self.bet
    }

    pub fn player_hand(&self) -> &[Card] {
        &self.player
    }

    /// Dealer cards visible to the player
    pub fn dealer_hand(&self) -> &[Card] {
        if self.dealer_revealed {
            &self.dealer
        } else {
            &self.dealer[..self.dealer.len().min(1)]
        }
    }

    pub fn player_total(&self) -> u32 {
        hand_value(&self.player)
    }

    /// Dealer total counting only the face-up cards
    pub fn visible_dealer_total(&self) -> u32 {
        hand_value(self.dealer_hand())
    }

    pub fn result(&self) -> Option<&BlackjackResult> {
        self.result.as_ref()
    }

    /// Debit the stake and deal from a freshly shuffled deck
    pub fn start_round<W: Wallet + ?Sized>(&mut self, wallet: &mut W, bet: u64) -> LuxeResult<BlackjackPhase> {
        let mut deck = create_deck();
        self.rng.shuffle(&mut deck);
        self.deal(wallet, bet, deck)
    }

    /// Deal from a stacked deck; `draw_order[0]` is the first card dealt.
    ///
    /// Used to replay a recorded round.
    pub fn start_round_with_deck<W: Wallet + ?Sized>(
        &mut self,
        wallet: &mut W,
        bet: u64,
        draw_order: Vec<Card>,
    ) -> LuxeResult<BlackjackPhase> {
        let mut deck = draw_order;
        deck.reverse();
        self.deal(wallet, bet, deck)
    }

    fn deal<W: Wallet + ?Sized>(&mut self, wallet: &mut W, bet: u64, deck: Vec<Card>) -> LuxeResult<BlackjackPhase> {
        if matches!(self.phase, BlackjackPhase::Playing | BlackjackPhase::DealerTurn) {
            return Err(GameError::RoundInProgress.into());
        }
        self.limits.check(bet)?;
        ensure_funds(wallet, bet)?;
        if deck.len() < 4 {
            return Err(GameError::DeckExhausted.into());
        }

        wallet.debit(bet)?;
        wallet.record_game_played()?;

        self.deck = deck;
        self.player.clear();
        self.dealer.clear();
        self.bet = bet;
        self.dealer_revealed = false;
        self.result = None;

        let p1 = self.draw()?;
        let p2 = self.draw()?;
        let d1 = self.draw()?;
        let d2 = self.draw()?;
        self.player.extend([p1, p2]);
        self.dealer.extend([d1, d2]);
        self.phase = BlackjackPhase::Playing;

        tracing::debug!(
            bet,
            player = self.player_total(),
            dealer_up = self.visible_dealer_total(),
            "Blackjack hand dealt"
        );

        if self.player_total() == BLACKJACK {
            let dealer_total = hand_value(&self.dealer);
            if dealer_total == BLACKJACK {
                self.finish(wallet, BlackjackOutcome::Push, bet)?;
            } else {
                self.finish(wallet, BlackjackOutcome::Blackjack, scale_floor(bet, BLACKJACK_PAYOUT))?;
            }
        }
        Ok(self.phase)
    }

    /// Draw one card; a bust ends the round, exactly 21 stands automatically
    pub fn hit<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<BlackjackPhase> {
        self.require_playing()?;
        let card = self.draw()?;
        self.player.push(card);
        self.after_player_draw(wallet)
    }

    pub fn stand(&mut self) -> LuxeResult<BlackjackPhase> {
        self.require_playing()?;
        self.phase = BlackjackPhase::DealerTurn;
        Ok(self.phase)
    }

    /// Match the stake, take exactly one card, then stand unless bust
    pub fn double_down<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<BlackjackPhase> {
        self.require_playing()?;
        if self.player.len() != 2 {
            return Err(GameError::InvalidMove("double down needs exactly two cards").into());
        }
        ensure_funds(wallet, self.bet)?;
        let card = self.draw()?;

        wallet.debit(self.bet)?;
        self.bet *= 2;
        self.player.push(card);
        tracing::debug!(bet = self.bet, card = %card, "Blackjack double down");

        if self.after_player_draw(wallet)? == BlackjackPhase::Playing {
            self.phase = BlackjackPhase::DealerTurn;
        }
        Ok(self.phase)
    }

    /// Reveal the hole card, draw to 17 and settle the round
    pub fn play_dealer<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<BlackjackResult> {
        match self.phase {
            BlackjackPhase::DealerTurn => {}
            BlackjackPhase::Playing => {
                return Err(GameError::InvalidMove("player has not finished").into())
            }
            _ => return Err(GameError::NoActiveRound.into()),
        }

        self.dealer_revealed = true;
        while hand_value(&self.dealer) < DEALER_STANDS_ON {
            let card = self.draw()?;
            self.dealer.push(card);
        }

        let player = self.player_total();
        let dealer = hand_value(&self.dealer);
        let (outcome, payout) = if dealer > BLACKJACK {
            (BlackjackOutcome::DealerBust, self.bet * 2)
        } else if player > dealer {
            (BlackjackOutcome::PlayerWins, self.bet * 2)
        } else if player == dealer {
            (BlackjackOutcome::Push, self.bet)
        } else {
            (BlackjackOutcome::DealerWins, 0)
        };
        self.finish(wallet, outcome, payout)
    }

    /// Stand and let the dealer play in one call
    pub fn stand_and_settle<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<BlackjackResult> {
        self.stand()?;
        self.play_dealer(wallet)
    }

    /// Clear a finished round back to betting
    pub fn reset(&mut self) -> LuxeResult<()> {
        if matches!(self.phase, BlackjackPhase::Playing | BlackjackPhase::DealerTurn) {
            return Err(GameError::RoundInProgress.into());
        }
        self.phase = BlackjackPhase::Betting;
        self.deck.clear();
        self.player.clear();
        self.dealer.clear();
        self.bet = 0;
        self.dealer_revealed = false;
        self.result = None;
        Ok(())
    }

    fn require_playing(&self) -> Result<(), GameError> {
        match self.phase {
            BlackjackPhase::Playing => Ok(()),
            BlackjackPhase::DealerTurn => Err(GameError::InvalidMove("dealer is playing")),
            _ => Err(GameError::NoActiveRound),
        }
    }

    fn draw(&mut self) -> Result<Card, GameError> {
        self.deck.pop().ok_or(GameError::DeckExhausted)
    }

    fn after_player_draw<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<BlackjackPhase> {
        let total = self.player_total();
        if total > BLACKJACK {
            self.finish(wallet, BlackjackOutcome::PlayerBust, 0)?;
        } else if total == BLACKJACK {
            self.phase = BlackjackPhase::DealerTurn;
        }
        Ok(self.phase)
    }

    fn finish<W: Wallet + ?Sized>(
        &mut self,
        wallet: &mut W,
        outcome: BlackjackOutcome,
        payout: u64,
    ) -> LuxeResult<BlackjackResult> {
        self.dealer_revealed = true;
        let settlement = settle(wallet, GameType::Blackjack, self.bet, payout, outcome.is_win())?;
        let result = BlackjackResult {
            outcome,
            player_total: self.player_total(),
            dealer_total: hand_value(&self.dealer),
            settlement,
        };
        tracing::info!(
            outcome = ?outcome,
            player = result.player_total,
            dealer = result.dealer_total,
            "Blackjack round finished"
        );
        self.phase = BlackjackPhase::Finished;
        self.result = Some(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::mocks::MockWallet;
    use crate::games::rng::seeded;
    use std::collections::HashSet;

    fn cards(ranks: &[u8]) -> Vec<Card> {
        ranks.iter().map(|r| Card::new(*r, Suit::Spades)).collect()
    }

    fn engine() -> BlackjackEngine<rand::rngs::StdRng> {
        BlackjackEngine::new(BetLimits::new(10, 10_000), seeded(1))
    }

    #[test]
    fn test_hand_value_soft_aces() {
        assert_eq!(hand_value(&cards(&[1, 1, 9])), 21);
        assert_eq!(hand_value(&cards(&[1, 13])), 21);
        assert_eq!(hand_value(&cards(&[1, 1])), 12);
        assert_eq!(hand_value(&cards(&[1, 5, 1, 5])), 12);
        assert_eq!(hand_value(&cards(&[13, 12, 5])), 25);
    }

    #[test]
    fn test_fresh_deck() {
        let mut deck = create_deck();
        seeded(3).shuffle(&mut deck);
        assert_eq!(deck.len(), 52);
        assert_eq!(deck.iter().collect::<HashSet<_>>().len(), 52);
    }

    #[test]
    fn test_natural_blackjack_pays_two_and_a_half() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        let phase = bj.start_round_with_deck(&mut wallet, 100, cards(&[1, 13, 9, 7])).unwrap();
        assert_eq!(phase, BlackjackPhase::Finished);
        assert_eq!(bj.result().unwrap().outcome, BlackjackOutcome::Blackjack);
        assert_eq!(wallet.balance, 1150);
        assert_eq!(wallet.wins, 1);
    }

    #[test]
    fn test_blackjack_push_refunds() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[1, 13, 1, 12])).unwrap();
        assert_eq!(bj.result().unwrap().outcome, BlackjackOutcome::Push);
        assert_eq!(wallet.balance, 1000);
        assert_eq!(wallet.wins, 0);
    }

    #[test]
    fn test_hit_bust_forfeits() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[10, 6, 10, 7, 13])).unwrap();
        assert_eq!(bj.hit(&mut wallet).unwrap(), BlackjackPhase::Finished);
        assert_eq!(bj.result().unwrap().outcome, BlackjackOutcome::PlayerBust);
        assert_eq!(wallet.balance, 900);
    }

    #[test]
    fn test_hit_to_21_stands() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[10, 6, 10, 7, 5])).unwrap();
        assert_eq!(bj.hit(&mut wallet).unwrap(), BlackjackPhase::DealerTurn);
        assert!(bj.hit(&mut wallet).is_err());

        let result = bj.play_dealer(&mut wallet).unwrap();
        assert_eq!(result.outcome, BlackjackOutcome::PlayerWins);
        assert_eq!(wallet.balance, 1100);
    }

    #[test]
    fn test_double_down() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[5, 6, 10, 7, 10])).unwrap();
        assert_eq!(bj.double_down(&mut wallet).unwrap(), BlackjackPhase::DealerTurn);
        assert_eq!(bj.bet(), 200);

        let result = bj.play_dealer(&mut wallet).unwrap();
        assert_eq!(result.outcome, BlackjackOutcome::PlayerWins);
        assert_eq!(result.settlement.wagered, 200);
        assert_eq!(wallet.balance, 1000 - 200 + 400);
    }

    #[test]
    fn test_double_down_rules() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(150);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[5, 6, 10, 7, 2, 3])).unwrap();
        let err = bj.double_down(&mut wallet).unwrap_err();
        assert_eq!(
            err.as_game(),
            Some(&GameError::InsufficientFunds { needed: 100, available: 50 })
        );
        assert_eq!(bj.bet(), 100);

        bj.hit(&mut wallet).unwrap();
        let err = bj.double_down(&mut wallet).unwrap_err();
        assert!(matches!(err.as_game(), Some(GameError::InvalidMove(_))));
    }

    #[test]
    fn test_dealer_draws_to_seventeen() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[10, 8, 10, 6, 10])).unwrap();
        let result = bj.stand_and_settle(&mut wallet).unwrap();
        assert_eq!(result.outcome, BlackjackOutcome::DealerBust);
        assert_eq!(result.dealer_total, 26);
        assert_eq!(wallet.balance, 1100);
    }

    #[test]
    fn test_equal_totals_push() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[10, 8, 10, 8])).unwrap();
        let result = bj.stand_and_settle(&mut wallet).unwrap();
        assert_eq!(result.outcome, BlackjackOutcome::Push);
        assert_eq!(wallet.balance, 1000);
        assert_eq!(wallet.wins, 0);
    }

    #[test]
    fn test_hole_card_hidden_until_dealer_plays() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[10, 8, 9, 9])).unwrap();
        assert_eq!(bj.dealer_hand().len(), 1);
        assert_eq!(bj.visible_dealer_total(), 9);
        bj.stand_and_settle(&mut wallet).unwrap();
        assert_eq!(bj.visible_dealer_total(), 18);
    }

    #[test]
    fn test_round_guards() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        assert_eq!(bj.hit(&mut wallet).unwrap_err().as_game(), Some(&GameError::NoActiveRound));

        bj.start_round(&mut wallet, 100).unwrap();
        if bj.phase() == BlackjackPhase::Playing {
            let err = bj.start_round(&mut wallet, 100).unwrap_err();
            assert_eq!(err.as_game(), Some(&GameError::RoundInProgress));
            assert!(bj.reset().is_err());
            bj.stand_and_settle(&mut wallet).unwrap();
        }
        bj.reset().unwrap();
        assert_eq!(bj.phase(), BlackjackPhase::Betting);
    }

    #[test]
    fn test_stacked_deck_exhaustion() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[2, 3, 10, 6])).unwrap();
        let err = bj.hit(&mut wallet).unwrap_err();
        assert_eq!(err.as_game(), Some(&GameError::DeckExhausted));
        assert_eq!(bj.phase(), BlackjackPhase::Playing);
    }

    #[test]
    fn test_failed_credit_lets_dealer_settle_again() {
        let mut bj = engine();
        let mut wallet = MockWallet::with_balance(1000);
        bj.start_round_with_deck(&mut wallet, 100, cards(&[10, 9, 10, 6, 2])).unwrap();
        bj.stand().unwrap();

        wallet.credit_fails = true;
        assert!(bj.play_dealer(&mut wallet).is_err());
        assert_eq!(bj.phase(), BlackjackPhase::DealerTurn);
        assert_eq!(wallet.balance, 900);

        wallet.credit_fails = false;
        let result = bj.play_dealer(&mut wallet).unwrap();
        assert_eq!(result.outcome, BlackjackOutcome::PlayerWins);
        assert_eq!(result.dealer_total, 18);
        assert_eq!(wallet.balance, 1_100);
    }
}
