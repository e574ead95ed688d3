//! European single-zero roulette
//!
//! Stakes leave the wallet when a bet is placed. One pocket in 0..=36 is
//! drawn per spin and every bet is settled against it; the table is then
//! cleared.

use crate::common::Wallet;
use crate::errors::{GameError, LuxeResult};
use crate::games::rng::RandomSource;
use crate::games::types::{ensure_funds, settle, BetLimits, GameType, RoundSettlement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const POCKETS: u8 = 37;

pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

const STRAIGHT_MULTIPLIER: u64 = 35;
const EVEN_MONEY_MULTIPLIER: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PocketColor {
    Green,
    Red,
    Black,
}

pub fn pocket_color(number: u8) -> PocketColor {
    if number == 0 {
        PocketColor::Green
    } else if RED_NUMBERS.contains(&number) {
        PocketColor::Red
    } else {
        PocketColor::Black
    }
}

/// Bet selection. Zero loses every outside bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouletteBet {
    Straight(u8),
    Red,
    Black,
    Odd,
    Even,
    /// 1 to 18
    Low,
    /// 19 to 36
    High,
}

impl RouletteBet {
    pub fn multiplier(&self) -> u64 {
        match self {
            RouletteBet::Straight(_) => STRAIGHT_MULTIPLIER,
            _ => EVEN_MONEY_MULTIPLIER,
        }
    }

    pub fn wins(&self, number: u8) -> bool {
        match self {
            RouletteBet::Straight(n) => *n == number,
            RouletteBet::Red => pocket_color(number) == PocketColor::Red,
            RouletteBet::Black => pocket_color(number) == PocketColor::Black,
            RouletteBet::Odd => number != 0 && number % 2 == 1,
            RouletteBet::Even => number != 0 && number % 2 == 0,
            RouletteBet::Low => (1..=18).contains(&number),
            RouletteBet::High => (19..=36).contains(&number),
        }
    }

    /// Total credit for a winning stake: the stake back plus `stake x multiplier`
    pub fn payout(&self, stake: u64) -> u64 {
        stake + stake * self.multiplier()
    }
}

impl fmt::Display for RouletteBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouletteBet::Straight(n) => write!(f, "{}", n),
            RouletteBet::Red => write!(f, "red"),
            RouletteBet::Black => write!(f, "black"),
            RouletteBet::Odd => write!(f, "odd"),
            RouletteBet::Even => write!(f, "even"),
            RouletteBet::Low => write!(f, "low"),
            RouletteBet::High => write!(f, "high"),
        }
    }
}

impl FromStr for RouletteBet {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(RouletteBet::Red),
            "black" => Ok(RouletteBet::Black),
            "odd" => Ok(RouletteBet::Odd),
            "even" => Ok(RouletteBet::Even),
            "low" => Ok(RouletteBet::Low),
            "high" => Ok(RouletteBet::High),
            other => match other.parse::<u8>() {
                Ok(n) if n < POCKETS => Ok(RouletteBet::Straight(n)),
                _ => Err(GameError::InvalidMove("unknown roulette bet")),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoulettePhase {
    Betting,
    Spinning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacedBet {
    pub bet: RouletteBet,
    pub stake: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BetResult {
    pub bet: RouletteBet,
    pub stake: u64,
    pub won: bool,
    pub payout: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpinResult {
    pub number: u8,
    pub color: PocketColor,
    pub bets: Vec<BetResult>,
    pub winnings: u64,
    pub settlement: RoundSettlement,
}

pub struct RouletteEngine<R: RandomSource> {
    limits: BetLimits,
    rng: R,
    phase: RoulettePhase,
    bets: Vec<PlacedBet>,
    /// Pocket drawn for the current spin, kept until it settles
    landed: Option<u8>,
}

impl<R: RandomSource> RouletteEngine<R> {
    pub fn new(limits: BetLimits, rng: R) -> Self {
        Self {
            limits,
            rng,
            phase: RoulettePhase::Betting,
            bets: Vec::new(),
            landed: None,
        }
    }

    pub fn phase(&self) -> RoulettePhase {
        self.phase
    }

    pub fn bets(&self) -> &[PlacedBet] {
        &self.bets
    }

    pub fn total_staked(&self) -> u64 {
        self.bets.iter().map(|b| b.stake).sum()
    }

    /// Debit `amount` and add it to the stake on `bet`.
    ///
    /// Returns the accumulated stake on that selection.
    pub fn place_bet<W: Wallet + ?Sized>(
        &mut self,
        wallet: &mut W,
        bet: RouletteBet,
        amount: u64,
    ) -> LuxeResult<u64> {
        self.require_betting()?;
        if let RouletteBet::Straight(n) = bet {
            if n >= POCKETS {
                return Err(GameError::InvalidMove("straight bet outside 0-36").into());
            }
        }
        self.limits.check(amount)?;
        ensure_funds(wallet, amount)?;
        wallet.debit(amount)?;

        let stake = match self.bets.iter_mut().find(|b| b.bet == bet) {
            Some(existing) => {
                existing.stake += amount;
                existing.stake
            }
            None => {
                self.bets.push(PlacedBet { bet, stake: amount });
                amount
            }
        };
        tracing::debug!(bet = %bet, amount, stake, "Roulette bet placed");
        Ok(stake)
    }

    /// Remove every pending bet and refund the stakes
    pub fn clear_bets<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<u64> {
        self.require_betting()?;
        let refund = self.total_staked();
        if refund > 0 {
            wallet.credit(refund)?;
        }
        self.bets.clear();
        tracing::debug!(refund, "Roulette bets cleared");
        Ok(refund)
    }

    /// Lock the table for a spin
    pub fn start_spin<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<u64> {
        self.require_betting()?;
        if self.bets.is_empty() {
            return Err(GameError::NoBetsPlaced.into());
        }
        wallet.record_game_played()?;
        self.phase = RoulettePhase::Spinning;
        Ok(self.total_staked())
    }

    /// Draw the winning pocket and settle every bet against it
    pub fn resolve_spin<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<SpinResult> {
        if self.phase != RoulettePhase::Spinning {
            return Err(GameError::NoActiveRound.into());
        }
        let number = match self.landed {
            Some(number) => number,
            None => {
                let number = self.rng.next_index(POCKETS as usize) as u8;
                self.landed = Some(number);
                number
            }
        };
        self.resolve_with(wallet, number)
    }

    /// Start and resolve a spin in one call
    pub fn spin<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<SpinResult> {
        self.start_spin(wallet)?;
        self.resolve_spin(wallet)
    }

    fn resolve_with<W: Wallet + ?Sized>(&mut self, wallet: &mut W, number: u8) -> LuxeResult<SpinResult> {
        let wagered = self.total_staked();
        let bets: Vec<BetResult> = self
            .bets
            .iter()
            .map(|placed| {
                let won = placed.bet.wins(number);
                BetResult {
                    bet: placed.bet,
                    stake: placed.stake,
                    won,
                    payout: if won { placed.bet.payout(placed.stake) } else { 0 },
                }
            })
            .collect();
        let winnings: u64 = bets.iter().map(|b| b.payout).sum();

        let settlement = settle(wallet, GameType::Roulette, wagered, winnings, winnings > 0)?;
        self.bets.clear();
        self.landed = None;
        self.phase = RoulettePhase::Betting;
        tracing::info!(number, color = ?pocket_color(number), winnings, "Roulette spin resolved");

        Ok(SpinResult {
            number,
            color: pocket_color(number),
            bets,
            winnings,
            settlement,
        })
    }

    fn require_betting(&self) -> Result<(), GameError> {
        if self.phase == RoulettePhase::Spinning {
            return Err(GameError::RoundInProgress);
        }
        Ok(())
    }
}
