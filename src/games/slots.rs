//! Three-reel slot machine with themed paytables
//!
//! A spin draws 3 reels x 3 visible rows uniformly from the theme's symbol
//! set. Payout rules are checked in a fixed order and the first rule that
//! matches decides the payout.

use crate::common::{scale_floor, Wallet};
use crate::errors::{GameError, LuxeResult};
use crate::games::rng::RandomSource;
use crate::games::types::{ensure_funds, settle, BetLimits, GameType, RoundSettlement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbols that pay when two or more land on the middle row
pub const SPECIAL_SYMBOLS: [&str; 6] = ["💎", "7️⃣", "⭐", "👑", "🐉", "🔱"];

const STREAK_STEP: f64 = 0.5;
const STREAK_CAP: f64 = 5.0;
const FALLBACK_MULTIPLIER: u32 = 2;

/// Visible window, indexed `[reel][row]`; row 1 is the pay line
pub type Reels = [[&'static str; 3]; 3];

/// Theme-specific feature layered on the base rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BonusFeature {
    /// Three or more scatters grant free spins
    FreeSpins,
    /// Fixed extra factor when `symbol` completes the wild line
    SymbolMultiplier { symbol: &'static str, factor: u32 },
    /// Wild reels are highlighted; payouts unchanged
    ExpandingWilds,
    /// Consecutive wild-line wins raise a streak multiplier
    ProgressiveMultiplier,
    /// Near misses are flagged for a re-spin animation; payouts unchanged
    Respin,
}

/// Paytable and special symbols of one theme
#[derive(Debug, Clone, Copy)]
pub struct ThemeConfig {
    pub name: &'static str,
    pub symbols: &'static [&'static str],
    pub multipliers: &'static [u32],
    pub wild: Option<&'static str>,
    pub scatter: Option<&'static str>,
    pub bonus: Option<BonusFeature>,
}

impl ThemeConfig {
    /// Paytable entry for `symbol`, falling back to 2 for unknown or zero entries
    pub fn multiplier_for(&self, symbol: &str) -> u32 {
        self.symbols
            .iter()
            .position(|s| *s == symbol)
            .and_then(|idx| self.multipliers.get(idx).copied())
            .filter(|m| *m > 0)
            .unwrap_or(FALLBACK_MULTIPLIER)
    }

    fn is_progressive(&self) -> bool {
        matches!(self.bonus, Some(BonusFeature::ProgressiveMultiplier))
    }
}

static CLASSIC: ThemeConfig = ThemeConfig {
    name: "Classic",
    symbols: &["🍒", "🍋", "🍊", "💎", "7️⃣", "⭐", "🔔", "🍀"],
    multipliers: &[2, 2, 3, 5, 10, 4, 3, 4],
    wild: None,
    scatter: None,
    bonus: None,
};

static FRUITS: ThemeConfig = ThemeConfig {
    name: "Fruits",
    symbols: &["🍎", "🍇", "🍉", "🍓", "🍌", "🥝", "🍑", "🍍"],
    multipliers: &[2, 3, 2, 4, 2, 3, 5, 6],
    wild: None,
    scatter: None,
    bonus: None,
};

static DIAMONDS: ThemeConfig = ThemeConfig {
    name: "Diamonds",
    symbols: &["💎", "💍", "👑", "🏆", "💰", "🎰", "⭐", "🌟"],
    multipliers: &[3, 4, 5, 6, 8, 10, 4, 4],
    wild: Some("💎"),
    scatter: None,
    bonus: None,
};

static EGYPT: ThemeConfig = ThemeConfig {
    name: "Egypt",
    symbols: &["🏺", "🐫", "🦂", "👁️", "⚱️", "🌴", "☀️", "🔺"],
    multipliers: &[2, 3, 4, 5, 3, 2, 6, 8],
    wild: None,
    scatter: Some("🔺"),
    bonus: Some(BonusFeature::FreeSpins),
};

static SPACE: ThemeConfig = ThemeConfig {
    name: "Space",
    symbols: &["🚀", "👽", "🛸", "🌍", "🌙", "⭐", "☄️", "🪐"],
    multipliers: &[3, 5, 4, 3, 2, 4, 6, 5],
    wild: Some("🛸"),
    scatter: None,
    bonus: None,
};

static LUCKY777: ThemeConfig = ThemeConfig {
    name: "Lucky 777",
    symbols: &["7️⃣", "🎰", "💵", "💴", "🍀", "⭐", "🔔", "💎"],
    multipliers: &[15, 10, 5, 5, 4, 3, 3, 8],
    wild: Some("7️⃣"),
    scatter: None,
    bonus: Some(BonusFeature::SymbolMultiplier {
        symbol: "7️⃣",
        factor: 3,
    }),
};

static AZTEC: ThemeConfig = ThemeConfig {
    name: "Aztec",
    symbols: &["🗿", "🦅", "🐆", "🌽", "💀", "🌺", "🔶", "👑"],
    multipliers: &[4, 5, 6, 2, 8, 3, 10, 12],
    wild: Some("👑"),
    scatter: Some("🗿"),
    bonus: Some(BonusFeature::FreeSpins),
};

static OCEAN: ThemeConfig = ThemeConfig {
    name: "Ocean",
    symbols: &["🐙", "🦈", "🐠", "🦀", "🐚", "⚓", "🧜‍♀️", "🔱"],
    multipliers: &[4, 6, 3, 3, 2, 4, 8, 15],
    wild: Some("🧜‍♀️"),
    scatter: Some("🔱"),
    bonus: Some(BonusFeature::ExpandingWilds),
};

static DRAGON: ThemeConfig = ThemeConfig {
    name: "Dragon",
    symbols: &["🐉", "🔥", "🏯", "⚔️", "🎎", "🧧", "🀄", "💰"],
    multipliers: &[10, 6, 4, 5, 3, 8, 4, 5],
    wild: Some("🐉"),
    scatter: None,
    bonus: Some(BonusFeature::ProgressiveMultiplier),
};

static NEON: ThemeConfig = ThemeConfig {
    name: "Neon",
    symbols: &["💜", "💙", "💚", "💛", "🔮", "🎮", "🕹️", "💿"],
    multipliers: &[3, 3, 3, 3, 6, 5, 4, 8],
    wild: Some("🔮"),
    scatter: None,
    bonus: Some(BonusFeature::Respin),
};

/// Available slot themes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotTheme {
    #[default]
    Classic,
    Fruits,
    Diamonds,
    Egypt,
    Space,
    Lucky777,
    Aztec,
    Ocean,
    Dragon,
    Neon,
}

impl SlotTheme {
    pub const ALL: [SlotTheme; 10] = [
        SlotTheme::Classic,
        SlotTheme::Fruits,
        SlotTheme::Diamonds,
        SlotTheme::Egypt,
        SlotTheme::Space,
        SlotTheme::Lucky777,
        SlotTheme::Aztec,
        SlotTheme::Ocean,
        SlotTheme::Dragon,
        SlotTheme::Neon,
    ];

    pub fn config(&self) -> &'static ThemeConfig {
        match self {
            SlotTheme::Classic => &CLASSIC,
            SlotTheme::Fruits => &FRUITS,
            SlotTheme::Diamonds => &DIAMONDS,
            SlotTheme::Egypt => &EGYPT,
            SlotTheme::Space => &SPACE,
            SlotTheme::Lucky777 => &LUCKY777,
            SlotTheme::Aztec => &AZTEC,
            SlotTheme::Ocean => &OCEAN,
            SlotTheme::Dragon => &DRAGON,
            SlotTheme::Neon => &NEON,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            SlotTheme::Classic => "classic",
            SlotTheme::Fruits => "fruits",
            SlotTheme::Diamonds => "diamonds",
            SlotTheme::Egypt => "egypt",
            SlotTheme::Space => "space",
            SlotTheme::Lucky777 => "lucky777",
            SlotTheme::Aztec => "aztec",
            SlotTheme::Ocean => "ocean",
            SlotTheme::Dragon => "dragon",
            SlotTheme::Neon => "neon",
        }
    }
}

impl fmt::Display for SlotTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SlotTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SlotTheme::ALL
            .into_iter()
            .find(|theme| theme.key() == wanted)
            .ok_or_else(|| format!("Unknown slot theme: {}", s))
    }
}

/// Which payout rule decided a spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum WinRule {
    Scatter { count: usize },
    WildLine { symbol: &'static str },
    ThreeOfAKind { symbol: &'static str },
    WildCombo,
    AdjacentPair,
    SpecialSymbols { count: usize },
    NoWin,
}

/// Payout of a reel window before any wallet effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub payout: u64,
    pub rule: WinRule,
}

/// Resolve a reel window against a theme's paytable.
///
/// `streak` is the current progressive multiplier and only affects
/// progressive themes.
pub fn evaluate(theme: &ThemeConfig, reels: &Reels, bet: u64, streak: f64) -> Evaluation {
    let middle = [reels[0][1], reels[1][1], reels[2][1]];
    let streak = if theme.is_progressive() { streak } else { 1.0 };

    if let Some(scatter) = theme.scatter {
        let count = reels.iter().flatten().filter(|s| **s == scatter).count();
        if count >= 3 {
            return Evaluation {
                payout: bet * count as u64 * 2,
                rule: WinRule::Scatter { count },
            };
        }
    }

    if let Some(wild) = theme.wild {
        for &symbol in theme.symbols {
            let count = middle.iter().filter(|s| **s == symbol || **s == wild).count();
            if count < 3 {
                continue;
            }
            let mut factor = theme.multiplier_for(symbol) as f64 * streak;
            if let Some(BonusFeature::SymbolMultiplier { symbol: boosted, factor: boost }) =
                theme.bonus
            {
                if boosted == symbol {
                    factor *= boost as f64;
                }
            }
            return Evaluation {
                payout: scale_floor(bet, factor),
                rule: WinRule::WildLine { symbol },
            };
        }
    }

    if middle[0] == middle[1] && middle[1] == middle[2] {
        let factor = theme.multiplier_for(middle[0]) as f64 * streak;
        return Evaluation {
            payout: scale_floor(bet, factor),
            rule: WinRule::ThreeOfAKind { symbol: middle[0] },
        };
    }

    if let Some(wild) = theme.wild.filter(|w| middle.contains(w)) {
        let mut non_wild = middle.iter().filter(|s| **s != wild);
        if let Some(first) = non_wild.next() {
            if non_wild.all(|s| s == first) {
                return Evaluation {
                    payout: bet * 2,
                    rule: WinRule::WildCombo,
                };
            }
        }
    } else if middle[0] == middle[1] || middle[1] == middle[2] {
        return Evaluation {
            payout: scale_floor(bet, 1.5),
            rule: WinRule::AdjacentPair,
        };
    }

    let count = middle.iter().filter(|s| SPECIAL_SYMBOLS.contains(*s)).count();
    if count >= 2 {
        return Evaluation {
            payout: bet * 2,
            rule: WinRule::SpecialSymbols { count },
        };
    }

    Evaluation {
        payout: 0,
        rule: WinRule::NoWin,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotsPhase {
    Idle,
    Spinning,
    Resolved,
}

/// Result of a resolved spin
#[derive(Debug, Clone, Serialize)]
pub struct SpinOutcome {
    pub reels: Reels,
    pub bet: u64,
    pub payout: u64,
    pub rule: WinRule,
    /// Spin was paid from the free-spin balance
    pub free_spin: bool,
    pub free_spins_awarded: u32,
    /// Streak multiplier applied to this spin
    pub streak_multiplier: f64,
    /// First reel showing a wild, for expanding-wild themes
    pub expanded_wild_reel: Option<usize>,
    /// Two distinct symbols on a losing pay line, for re-spin themes
    pub respin_hint: bool,
    pub settlement: RoundSettlement,
}

#[derive(Debug, Clone, Copy)]
struct PendingSpin {
    bet: u64,
    reels: Reels,
    free_spin: bool,
}

/// Slot machine for one theme
pub struct SlotsEngine<R: RandomSource> {
    theme: SlotTheme,
    limits: BetLimits,
    free_spins_award: u32,
    rng: R,
    phase: SlotsPhase,
    pending: Option<PendingSpin>,
    free_spins: u32,
    streak: f64,
}

impl<R: RandomSource> SlotsEngine<R> {
    pub fn new(theme: SlotTheme, limits: BetLimits, rng: R) -> Self {
        Self {
            theme,
            limits,
            free_spins_award: 10,
            rng,
            phase: SlotsPhase::Idle,
            pending: None,
            free_spins: 0,
            streak: 1.0,
        }
    }

    pub fn with_free_spins_award(mut self, award: u32) -> Self {
        self.free_spins_award = award;
        self
    }

    pub fn theme(&self) -> SlotTheme {
        self.theme
    }

    pub fn phase(&self) -> SlotsPhase {
        self.phase
    }

    pub fn free_spins(&self) -> u32 {
        self.free_spins
    }

    pub fn streak_multiplier(&self) -> f64 {
        self.streak
    }

    /// Take the stake (or a free spin) and draw the reels.
    ///
    /// The reels are returned for display; the payout is applied by
    /// `resolve_spin`.
    pub fn start_spin<W: Wallet + ?Sized>(&mut self, wallet: &mut W, bet: u64) -> LuxeResult<Reels> {
        if self.phase == SlotsPhase::Spinning {
            return Err(GameError::RoundInProgress.into());
        }
        self.limits.check(bet)?;

        let free_spin = self.free_spins > 0;
        if free_spin {
            self.free_spins -= 1;
        } else {
            ensure_funds(wallet, bet)?;
            wallet.debit(bet)?;
        }
        wallet.record_game_played()?;

        let reels = self.draw_reels();
        self.pending = Some(PendingSpin {
            bet,
            reels,
            free_spin,
        });
        self.phase = SlotsPhase::Spinning;

        tracing::debug!(
            theme = %self.theme,
            bet,
            free_spin,
            free_spins_left = self.free_spins,
            "Slots spin started"
        );
        Ok(reels)
    }

    /// Apply the payout rules to the pending spin and credit any win
    pub fn resolve_spin<W: Wallet + ?Sized>(&mut self, wallet: &mut W) -> LuxeResult<SpinOutcome> {
        let pending = self.pending.take().ok_or(GameError::NoActiveRound)?;
        let config = self.theme.config();
        let applied_streak = self.streak;
        let evaluation = evaluate(config, &pending.reels, pending.bet, applied_streak);

        let free_spins_awarded = if matches!(evaluation.rule, WinRule::Scatter { .. })
            && matches!(config.bonus, Some(BonusFeature::FreeSpins))
        {
            self.free_spins_award
        } else {
            0
        };

        let next_streak = if !config.is_progressive() {
            self.streak
        } else if evaluation.payout == 0 {
            1.0
        } else if matches!(evaluation.rule, WinRule::WildLine { .. }) {
            (self.streak + STREAK_STEP).min(STREAK_CAP)
        } else {
            self.streak
        };

        let expanded_wild_reel = match (config.bonus, config.wild) {
            (Some(BonusFeature::ExpandingWilds), Some(wild)) => {
                pending.reels.iter().position(|reel| reel.contains(&wild))
            }
            _ => None,
        };
        let respin_hint = matches!(config.bonus, Some(BonusFeature::Respin))
            && evaluation.payout == 0
            && distinct_on_line(&pending.reels) == 2;

        let wagered = if pending.free_spin { 0 } else { pending.bet };
        let settlement = match settle(
            wallet,
            GameType::Slots,
            wagered,
            evaluation.payout,
            evaluation.payout > 0,
        ) {
            Ok(settlement) => settlement,
            Err(e) => {
                // Still spinning; the same spin can be resolved again
                self.pending = Some(pending);
                return Err(e);
            }
        };
        self.free_spins += free_spins_awarded;
        self.streak = next_streak;
        self.phase = SlotsPhase::Resolved;

        tracing::info!(
            theme = %self.theme,
            payout = evaluation.payout,
            rule = ?evaluation.rule,
            free_spins_awarded,
            "Slots spin resolved"
        );

        Ok(SpinOutcome {
            reels: pending.reels,
            bet: pending.bet,
            payout: evaluation.payout,
            rule: evaluation.rule,
            free_spin: pending.free_spin,
            free_spins_awarded,
            streak_multiplier: applied_streak,
            expanded_wild_reel,
            respin_hint,
            settlement,
        })
    }

    /// Start and resolve a spin in one call
    pub fn spin<W: Wallet + ?Sized>(&mut self, wallet: &mut W, bet: u64) -> LuxeResult<SpinOutcome> {
        self.start_spin(wallet, bet)?;
        self.resolve_spin(wallet)
    }

    fn draw_reels(&mut self) -> Reels {
        let symbols = self.theme.config().symbols;
        let mut reels: Reels = [[""; 3]; 3];
        for reel in reels.iter_mut() {
            for cell in reel.iter_mut() {
                *cell = symbols[self.rng.next_index(symbols.len())];
            }
        }
        reels
    }
}

fn distinct_on_line(reels: &Reels) -> usize {
    let (a, b, c) = (reels[0][1], reels[1][1], reels[2][1]);
    if a == b && b == c {
        1
    } else if a == b || b == c || a == c {
        2
    } else {
        3
    }
}
