//! Crash: a multiplier grows as `e^(rate * t)` until a pre-drawn crash point
//!
//! Time is supplied by the caller as an `Instant`, so the authoritative
//! check is purely time based and independent of how often the display
//! polls `tick`.

use crate::common::{scale_floor, Wallet};
use crate::errors::{GameError, LuxeResult};
use crate::games::rng::RandomSource;
use crate::games::types::{ensure_funds, settle, BetLimits, GameType, RoundSettlement};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

pub const DEFAULT_GROWTH_RATE: f64 = 0.15;
pub const DEFAULT_HISTORY_LEN: usize = 10;

/// Draw a crash point from the fixed band mixture.
///
/// One uniform draw picks the band, a second places the point inside it:
/// 5% in [1.0, 1.2), 45% in [1.0, 2.5), 35% in [2.0, 5.0),
/// 13% in [5.0, 15.0) and 2% in [15.0, 100.0).
pub fn generate_crash_point<R: RandomSource + ?Sized>(rng: &mut R) -> f64 {
    let band = rng.next_unit();
    if band < 0.05 {
        rng.next_range(1.0, 1.2)
    } else if band < 0.5 {
        rng.next_range(1.0, 2.5)
    } else if band < 0.85 {
        rng.next_range(2.0, 5.0)
    } else if band < 0.98 {
        rng.next_range(5.0, 15.0)
    } else {
        rng.next_range(15.0, 100.0)
    }
}

/// Multiplier after `elapsed_secs` of flight
pub fn multiplier_at(elapsed_secs: f64, growth_rate: f64) -> f64 {
    (growth_rate * elapsed_secs.max(0.0)).exp()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashPhase {
    Waiting,
    Flying,
    Crashed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashOut {
    pub multiplier: f64,
    pub payout: u64,
    pub settlement: RoundSettlement,
}

#[derive(Debug, Clone)]
struct Flight {
    bet: u64,
    crash_point: f64,
    started_at: Instant,
    cashed_out: Option<f64>,
}

pub struct CrashEngine<R: RandomSource> {
    limits: BetLimits,
    rng: R,
    growth_rate: f64,
    history_len: usize,
    phase: CrashPhase,
    flight: Option<Flight>,
    history: VecDeque<f64>,
}

impl<R: RandomSource> CrashEngine<R> {
    pub fn new(limits: BetLimits, rng: R) -> Self {
        Self {
            limits,
            rng,
            growth_rate: DEFAULT_GROWTH_RATE,
            history_len: DEFAULT_HISTORY_LEN,
            phase: CrashPhase::Waiting,
            flight: None,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_LEN),
        }
    }

    pub fn with_growth_rate(mut self, growth_rate: f64) -> Self {
        self.growth_rate = growth_rate;
        self
    }

    pub fn with_history_len(mut self, history_len: usize) -> Self {
        self.history_len = history_len;
        self
    }

    pub fn phase(&self) -> CrashPhase {
        self.phase
    }

    /// Past crash points, most recent first
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    /// Multiplier at the player's cash-out, if they have left the round
    pub fn cashed_out_at(&self) -> Option<f64> {
        self.flight.as_ref().and_then(|f| f.cashed_out)
    }

    /// Crash point of the current round; only revealed once it crashed
    pub fn revealed_crash_point(&self) -> Option<f64> {
        match (self.phase, &self.flight) {
            (CrashPhase::Crashed, Some(flight)) => Some(flight.crash_point),
            _ => None,
        }
    }

    /// Debit the stake, draw the crash point and take off
    pub fn start_round<W: Wallet + ?Sized>(&mut self, wallet: &mut W, bet: u64, now: Instant) -> LuxeResult<()> {
        if self.phase == CrashPhase::Flying {
            return Err(GameError::RoundInProgress.into());
        }
        self.limits.check(bet)?;
        ensure_funds(wallet, bet)?;
        wallet.debit(bet)?;
        wallet.record_game_played()?;

        let crash_point = generate_crash_point(&mut self.rng);
        self.start_flight(bet, crash_point, now);
        Ok(())
    }

    fn start_flight(&mut self, bet: u64, crash_point: f64, now: Instant) {
        self.flight = Some(Flight {
            bet,
            crash_point,
            started_at: now,
            cashed_out: None,
        });
        self.phase = CrashPhase::Flying;
        tracing::debug!(bet, "Crash round started");
    }

    /// Displayed multiplier at `now`, capped at the crash point once crashed
    pub fn current_multiplier(&self, now: Instant) -> f64 {
        match &self.flight {
            Some(flight) => {
                let elapsed = now.saturating_duration_since(flight.started_at).as_secs_f64();
                multiplier_at(elapsed, self.growth_rate).min(flight.crash_point)
            }
            None => 1.0,
        }
    }

    /// Advance the round to `now`; crashes it once the multiplier reaches the crash point
    pub fn tick<W: Wallet + ?Sized>(&mut self, wallet: &mut W, now: Instant) -> LuxeResult<CrashPhase> {
        if self.phase != CrashPhase::Flying {
            return Ok(self.phase);
        }
        let Some(flight) = self.flight.clone() else {
            return Ok(self.phase);
        };

        let elapsed = now.saturating_duration_since(flight.started_at).as_secs_f64();
        if multiplier_at(elapsed, self.growth_rate) < flight.crash_point {
            return Ok(self.phase);
        }

        self.phase = CrashPhase::Crashed;
        self.history.push_front(flight.crash_point);
        self.history.truncate(self.history_len);
        tracing::info!(crash_point = flight.crash_point, cashed_out = ?flight.cashed_out, "Crash round crashed");

        if flight.cashed_out.is_none() {
            settle(wallet, GameType::Crash, flight.bet, 0, false)?;
        }
        Ok(self.phase)
    }

    /// Take `floor(bet x multiplier)` at `now`. The round keeps flying.
    pub fn cash_out<W: Wallet + ?Sized>(&mut self, wallet: &mut W, now: Instant) -> LuxeResult<CashOut> {
        if self.tick(wallet, now)? == CrashPhase::Crashed {
            if let Some(flight) = self.flight.as_ref().filter(|f| f.cashed_out.is_none()) {
                return Err(GameError::RoundCrashed {
                    crash_point: flight.crash_point,
                }
                .into());
            }
        }
        if self.phase != CrashPhase::Flying {
            return Err(GameError::NoActiveRound.into());
        }

        let multiplier = self.current_multiplier(now);
        let bet = match &self.flight {
            Some(flight) if flight.cashed_out.is_some() => return Err(GameError::NothingToCashOut.into()),
            Some(flight) => flight.bet,
            None => return Err(GameError::NoActiveRound.into()),
        };

        let payout = scale_floor(bet, multiplier);
        let settlement = settle(wallet, GameType::Crash, bet, payout, true)?;
        if let Some(flight) = self.flight.as_mut() {
            flight.cashed_out = Some(multiplier);
        }
        tracing::debug!(multiplier, payout, "Crash cash out");
        Ok(CashOut {
            multiplier,
            payout,
            settlement,
        })
    }

    /// Back to waiting after a crash
    pub fn reset(&mut self) -> LuxeResult<()> {
        if self.phase == CrashPhase::Flying {
            return Err(GameError::RoundInProgress.into());
        }
        self.phase = CrashPhase::Waiting;
        self.flight = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::mocks::MockWallet;
    use crate::games::rng::{seeded, ScriptedRandom};
    use std::time::Duration;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Band draw 0.6 lands in [2.0, 5.0); 0.5 places the point at 3.5x
    fn engine_crashing_at_3_5() -> CrashEngine<ScriptedRandom> {
        CrashEngine::new(BetLimits::new(10, 10_000), ScriptedRandom::new(vec![0.6, 0.5]))
    }

    #[test]
    fn test_crash_point_bands() {
        let mut rng = ScriptedRandom::new(vec![0.01, 0.5]);
        assert!((generate_crash_point(&mut rng) - 1.1).abs() < 1e-9);
        let mut rng = ScriptedRandom::new(vec![0.99, 0.0]);
        assert_eq!(generate_crash_point(&mut rng), 15.0);

        let mut rng = seeded(11);
        for _ in 0..1000 {
            let point = generate_crash_point(&mut rng);
            assert!((1.0..100.0).contains(&point));
        }
    }

    #[test]
    fn test_multiplier_curve() {
        assert_eq!(multiplier_at(0.0, 0.15), 1.0);
        assert!((multiplier_at(10.0, 0.15) - 1.5f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_cash_out_before_crash() {
        let mut crash = engine_crashing_at_3_5();
        let mut wallet = MockWallet::with_balance(1000);
        let t0 = Instant::now();
        crash.start_round(&mut wallet, 100, t0).unwrap();
        assert_eq!(wallet.balance, 900);

        // e^(0.15 * 5) ~ 2.117
        let cash = crash.cash_out(&mut wallet, t0 + secs(5.0)).unwrap();
        assert_eq!(cash.payout, (100.0 * (0.75f64).exp()).floor() as u64);
        assert_eq!(wallet.balance, 900 + cash.payout);
        assert_eq!(wallet.wins, 1);

        // The round flies on; crashing later costs nothing more
        assert_eq!(crash.tick(&mut wallet, t0 + secs(6.0)).unwrap(), CrashPhase::Flying);
        assert_eq!(crash.tick(&mut wallet, t0 + secs(20.0)).unwrap(), CrashPhase::Crashed);
        assert_eq!(wallet.balance, 900 + cash.payout);
        assert_eq!(crash.revealed_crash_point(), Some(3.5));
    }

    #[test]
    fn test_crash_forfeits_bet() {
        let mut crash = engine_crashing_at_3_5();
        let mut wallet = MockWallet::with_balance(1000);
        let t0 = Instant::now();
        crash.start_round(&mut wallet, 100, t0).unwrap();

        let err = crash.cash_out(&mut wallet, t0 + secs(30.0)).unwrap_err();
        assert_eq!(err.as_game(), Some(&GameError::RoundCrashed { crash_point: 3.5 }));
        assert_eq!(crash.phase(), CrashPhase::Crashed);
        assert_eq!(wallet.balance, 900);
        assert_eq!(wallet.wins, 0);
    }

    #[test]
    fn test_double_cash_out_rejected() {
        let mut crash = engine_crashing_at_3_5();
        let mut wallet = MockWallet::with_balance(1000);
        let t0 = Instant::now();
        crash.start_round(&mut wallet, 100, t0).unwrap();
        crash.cash_out(&mut wallet, t0 + secs(1.0)).unwrap();
        let err = crash.cash_out(&mut wallet, t0 + secs(2.0)).unwrap_err();
        assert_eq!(err.as_game(), Some(&GameError::NothingToCashOut));
    }

    #[test]
    fn test_round_guard_and_reset() {
        let mut crash = engine_crashing_at_3_5();
        let mut wallet = MockWallet::with_balance(1000);
        let t0 = Instant::now();
        crash.start_round(&mut wallet, 100, t0).unwrap();
        let err = crash.start_round(&mut wallet, 100, t0).unwrap_err();
        assert_eq!(err.as_game(), Some(&GameError::RoundInProgress));
        assert!(crash.reset().is_err());

        crash.tick(&mut wallet, t0 + secs(60.0)).unwrap();
        crash.reset().unwrap();
        assert_eq!(crash.phase(), CrashPhase::Waiting);
        assert_eq!(crash.current_multiplier(t0), 1.0);
    }

    #[test]
    fn test_history_is_capped_most_recent_first() {
        let mut crash = CrashEngine::new(BetLimits::new(1, 100), seeded(4)).with_history_len(3);
        let mut wallet = MockWallet::with_balance(10_000);
        let mut points = Vec::new();
        for _ in 0..5 {
            let t0 = Instant::now();
            crash.start_round(&mut wallet, 10, t0).unwrap();
            crash.tick(&mut wallet, t0 + secs(1_000.0)).unwrap();
            points.push(crash.revealed_crash_point().unwrap());
        }
        let history: Vec<f64> = crash.history().collect();
        assert_eq!(history, vec![points[4], points[3], points[2]]);
    }
    #[test]
    fn test_failed_credit_leaves_bet_riding() {
        let mut crash = engine_crashing_at_3_5();
        let mut wallet = MockWallet::with_balance(1000);
        let t0 = Instant::now();
        crash.start_round(&mut wallet, 100, t0).unwrap();

        wallet.credit_fails = true;
        assert!(crash.cash_out(&mut wallet, t0 + secs(2.0)).is_err());
        assert_eq!(wallet.balance, 900);

        wallet.credit_fails = false;
        let cash = crash.cash_out(&mut wallet, t0 + secs(3.0)).unwrap();
        assert_eq!(wallet.balance, 900 + cash.payout);
        assert!(cash.payout > 100);
    }
}
