//! Configuration management with validation and defaults
//!
//! Loaded from TOML; every section has defaults so a partial file is valid.

use crate::errors::{ConfigurationError, LuxeResult};
use crate::games::BetLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LuxeConfig {
    pub account: AccountConfig,
    pub storage: StorageConfig,
    pub games: GamesConfig,
    pub logging: LoggingConfig,
}

/// Player account economy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub starting_balance: u64,
    /// XP earned per unit of balance change
    pub xp_rate: f64,
    pub xp_per_level: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            starting_balance: 100_000,
            xp_rate: 0.01,
            xp_per_level: 1000.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    JsonFile,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::JsonFile,
            data_directory: PathBuf::from("./luxeplay_data"),
        }
    }
}

/// Engine tunables and fallback table limits for games without a catalog entry
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GamesConfig {
    pub slots_limits: BetLimits,
    pub blackjack_limits: BetLimits,
    pub roulette_limits: BetLimits,
    pub crash_limits: BetLimits,
    pub mines_limits: BetLimits,
    pub crash_history_len: usize,
    pub crash_growth_rate: f64,
    pub free_spins_award: u32,
    pub mines_house_edge: f64,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            slots_limits: BetLimits::new(100, 100_000),
            blackjack_limits: BetLimits::new(100, 500_000),
            roulette_limits: BetLimits::new(100, 200_000),
            crash_limits: BetLimits::new(100, 100_000),
            mines_limits: BetLimits::new(10, 100_000),
            crash_history_len: 10,
            crash_growth_rate: 0.15,
            free_spins_award: 10,
            mines_house_edge: 0.97,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "luxeplay=info".to_string(),
        }
    }
}

impl LuxeConfig {
    /// In-memory storage, everything else default
    pub fn testing() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: "luxeplay=debug".to_string(),
            },
            ..Default::default()
        }
    }

    /// Load and validate a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> LuxeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("{}: {}", path.display(), e))
        })?;
        let config: LuxeConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.account.xp_per_level > 0.0) {
            return Err(ConfigurationError::InvalidValue {
                field: "account.xp_per_level".to_string(),
                value: self.account.xp_per_level.to_string(),
                reason: "must be > 0".to_string(),
            });
        }

        if self.account.xp_rate < 0.0 {
            return Err(ConfigurationError::InvalidValue {
                field: "account.xp_rate".to_string(),
                value: self.account.xp_rate.to_string(),
                reason: "must be >= 0".to_string(),
            });
        }

        let limits = [
            ("games.slots_limits", &self.games.slots_limits),
            ("games.blackjack_limits", &self.games.blackjack_limits),
            ("games.roulette_limits", &self.games.roulette_limits),
            ("games.crash_limits", &self.games.crash_limits),
            ("games.mines_limits", &self.games.mines_limits),
        ];
        for (field, limit) in limits {
            if limit.min == 0 || limit.min > limit.max {
                return Err(ConfigurationError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{}..={}", limit.min, limit.max),
                    reason: "min must be > 0 and <= max".to_string(),
                });
            }
        }

        if self.games.crash_history_len == 0 {
            return Err(ConfigurationError::ValidationFailed(
                "crash_history_len must be > 0".to_string(),
            ));
        }

        if !(self.games.crash_growth_rate > 0.0) {
            return Err(ConfigurationError::ValidationFailed(
                "crash_growth_rate must be > 0".to_string(),
            ));
        }

        if !(self.games.mines_house_edge > 0.0 && self.games.mines_house_edge <= 1.0) {
            return Err(ConfigurationError::ValidationFailed(
                "mines_house_edge must be in (0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}
