//! Mines: a 5x5 grid with hidden mines and a growing cash-out multiplier

use crate::common::{scale_floor, Wallet};
use crate::errors::{GameError, LuxeResult};
use crate::games::rng::RandomSource;
use crate::games::types::{ensure_funds, settle, BetLimits, GameType, RoundSettlement};
use serde::Serialize;

pub const GRID_SIZE: usize = 5;
pub const TOTAL_CELLS: usize = GRID_SIZE * GRID_SIZE;
pub const MIN_MINES: usize = 1;
pub const MAX_MINES: usize = TOTAL_CELLS - 1;
pub const DEFAULT_HOUSE_EDGE: f64 = 0.97;

/// Cash-out multiplier after `revealed` safe cells:
/// `house_edge / prod_{i < revealed} (safe - i) / (cells - mines - i)`
pub fn mines_multiplier(revealed: usize, mines: usize, house_edge: f64) -> f64 {
    let safe = TOTAL_CELLS.saturating_sub(mines);
    let odds: f64 = (0..revealed.min(safe))
        .map(|i| (safe - i) as f64 / (TOTAL_CELLS - mines - i) as f64)
        .product();
    house_edge / odds
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MinesPhase {
    Betting,
    Playing,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub is_mine: bool,
    pub revealed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum RevealOutcome {
    Safe { multiplier: f64, revealed: usize },
    Mine { settlement: RoundSettlement },
    /// Every safe cell found; the round cashed out automatically
    Cleared { payout: u64, settlement: RoundSettlement },
}

pub struct MinesEngine<R: RandomSource> {
    limits: BetLimits,
    rng: R,
    house_edge: f64,
    phase: MinesPhase,
    grid: [Cell; TOTAL_CELLS],
    mines: usize,
    bet: u64,
    revealed: usize,
    multiplier: f64,
}

impl<R: RandomSource> MinesEngine<R> {
    pub fn new(limits: BetLimits, rng: R) -> Self {
        Self {
            limits,
            rng,
            house_edge: DEFAULT_HOUSE_EDGE,
            phase: MinesPhase::Betting,
            grid: [Cell::default(); TOTAL_CELLS],
            mines: 0,
            bet: 0,
            revealed: 0,
            multiplier: 1.0,
        }
    }

    pub fn with_house_edge(mut self, house_edge: f64) -> Self {
        self.house_edge = house_edge;
        self
    }

    pub fn phase(&self) -> MinesPhase {
        self.phase
    }

    pub fn cells(&self) -> &[Cell] {
        &self.grid
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed
    }

    pub fn current_multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Payout if the player cashed out now
    pub fn potential_payout(&self) -> u64 {
        scale_floor(self.bet, self.multiplier)
    }

    /// Debit the stake and bury `mines_count` mines
    pub fn start_round<W: Wallet + ?Sized>(
        &mut self,
        wallet: &mut W,
        bet: u64,
        mines_count: usize,
    ) -> LuxeResult<()> {
        if self.phase == MinesPhase::Playing {
            return Err(GameError::RoundInProgress.into());
        }
        if !(MIN_MINES..=MAX_MINES).contains(&mines_count) {
            return Err(GameError::InvalidMinesCount(mines_count).into());
        }
        self.limits.check(bet)?;
        ensure_funds(wallet, bet)?;
        wallet.debit(bet)?;
        wallet.record_game_played()?;

        let mut positions: Vec<usize> = (0..TOTAL_CELLS).collect();
        self.rng.shuffle(&mut positions);
        self.grid = [Cell::default(); TOTAL_CELLS];
        for &idx in &positions[..mines_count] {
            self.grid[idx].is_mine = true;
        }

        self.mines = mines_count;
        self.bet = bet;
        self.revealed = 0;
        self.multiplier = 1.0;
        self.phase = MinesPhase::Playing;
        tracing::debug!(bet, mines = mines_count, "Mines round started");
        Ok(())
    }

    pub fn reveal<W: Wallet + ?Sized>(&mut self, wallet: &mut W, index: usize) -> LuxeResult<RevealOutcome> {
        if self.phase != MinesPhase::Playing {
            return Err(GameError::NoActiveRound.into());
        }
        let cell = self
            .grid
            .get_mut(index)
            .ok_or(GameError::CellOutOfRange(index))?;
        if cell.revealed {
            return Err(GameError::CellAlreadyRevealed(index).into());
        }
        cell.revealed = true;

        if cell.is_mine {
            self.phase = MinesPhase::Lost;
            self.uncover(|c| c.is_mine);
            tracing::info!(index, revealed = self.revealed, "Mines round lost");
            let settlement = settle(wallet, GameType::Mines, self.bet, 0, false)?;
            return Ok(RevealOutcome::Mine { settlement });
        }

        self.revealed += 1;
        self.multiplier = mines_multiplier(self.revealed, self.mines, self.house_edge);
        if self.revealed >= TOTAL_CELLS - self.mines {
            let settlement = self.cash_out(wallet)?;
            return Ok(RevealOutcome::Cleared {
                payout: settlement.payout,
                settlement,
            });
        }
        Ok(RevealOutcome::Safe {
            multiplier: self.multiplier,
            revealed: self.revealed,
        })
    }

    /// Collect `floor(bet x multiplier)`; needs at least one safe reveal
    pub fn cash_out<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<RoundSettlement> {
        if self.phase != MinesPhase::Playing {
            return Err(GameError::NoActiveRound.into());
        }
        if self.revealed == 0 {
            return Err(GameError::NothingToCashOut.into());
        }

        let payout = self.potential_payout();
        let settlement = settle(wallet, GameType::Mines, self.bet, payout, true)?;
        self.phase = MinesPhase::Won;
        self.uncover(|_| true);
        tracing::info!(revealed = self.revealed, multiplier = self.multiplier, payout, "Mines cash out");
        Ok(settlement)
    }

    pub fn reset(&mut self) -> LuxeResult<()> {
        if self.phase == MinesPhase::Playing {
            return Err(GameError::RoundInProgress.into());
        }
        self.phase = MinesPhase::Betting;
        self.grid = [Cell::default(); TOTAL_CELLS];
        self.mines = 0;
        self.bet = 0;
        self.revealed = 0;
        self.multiplier = 1.0;
        Ok(())
    }

    fn uncover(&mut self, pick: impl Fn(&Cell) -> bool) {
        for cell in self.grid.iter_mut().filter(|c| pick(c)) {
            cell.revealed = true;
        }
    }
}
