use crate::common::Wallet;
use crate::errors::{GameError, LuxeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Slots,
    Blackjack,
    Roulette,
    Crash,
    Mines,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Slots => write!(f, "slots"),
            GameType::Blackjack => write!(f, "blackjack"),
            GameType::Roulette => write!(f, "roulette"),
            GameType::Crash => write!(f, "crash"),
            GameType::Mines => write!(f, "mines"),
        }
    }
}

/// Inclusive table limits for a single stake
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BetLimits {
    pub min: u64,
    pub max: u64,
}

impl BetLimits {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Reject zero stakes and stakes outside [min, max]
    pub fn check(&self, bet: u64) -> Result<(), GameError> {
        if bet == 0 {
            return Err(GameError::InvalidBet);
        }
        if bet < self.min || bet > self.max {
            return Err(GameError::BetOutOfRange {
                bet,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Final accounting of a finished round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundSettlement {
    pub game: GameType,
    /// Total stake debited for the round
    pub wagered: u64,
    /// Total credited back (0 on a loss)
    pub payout: u64,
    pub won: bool,
}

impl RoundSettlement {
    pub fn net(&self) -> i64 {
        self.payout as i64 - self.wagered as i64
    }
}

/// Reject a debit the wallet cannot cover
pub fn ensure_funds<W: Wallet + ?Sized>(wallet: &W, needed: u64) -> Result<(), GameError> {
    let available = wallet.balance();
    if available < needed {
        return Err(GameError::InsufficientFunds { needed, available });
    }
    Ok(())
}

/// Count the win and credit a terminal payout.
///
/// The credit goes last: when it fails the caller keeps the round open and
/// no money has moved.
pub(crate) fn settle<W: Wallet + ?Sized>(
    wallet: &mut W,
    game: GameType,
    wagered: u64,
    payout: u64,
    won: bool,
) -> LuxeResult<RoundSettlement> {
    if won {
        wallet.record_win()?;
    }
    if payout > 0 {
        wallet.credit(payout)?;
    }

    let settlement = RoundSettlement {
        game,
        wagered,
        payout,
        won,
    };
    tracing::info!(
        game = %game,
        wagered,
        payout,
        won,
        balance = wallet.balance(),
        "Round settled"
    );
    Ok(settlement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::mocks::MockWallet;

    #[test]
    fn test_limits() {
        let limits = BetLimits::new(100, 1000);
        assert_eq!(limits.check(0), Err(GameError::InvalidBet));
        assert!(limits.check(100).is_ok());
        assert!(limits.check(1000).is_ok());
        assert_eq!(
            limits.check(1001),
            Err(GameError::BetOutOfRange { bet: 1001, min: 100, max: 1000 })
        );
    }

    #[test]
    fn test_ensure_funds() {
        let wallet = MockWallet::with_balance(50);
        assert!(ensure_funds(&wallet, 50).is_ok());
        assert_eq!(
            ensure_funds(&wallet, 51),
            Err(GameError::InsufficientFunds { needed: 51, available: 50 })
        );
    }

    #[test]
    fn test_settle_push_is_not_a_win() {
        let mut wallet = MockWallet::with_balance(0);
        let settlement = settle(&mut wallet, GameType::Blackjack, 100, 100, false).unwrap();
        assert_eq!(settlement.net(), 0);
        assert_eq!(wallet.balance, 100);
        assert_eq!(wallet.wins, 0);
    }
}
