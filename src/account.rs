//! Player account ledger
//!
//! Holds the logged-in player's balance, XP and counters. Every mutation is
//! written to the store before the in-memory copy changes, so a failed write
//! leaves the account exactly as it was.

use crate::common::{current_timestamp, random_avatar, KeyValueStore, Wallet};
use crate::config::AccountConfig;
use crate::errors::{GameError, LuxeResult};
use crate::games::RandomSource;
use crate::storage::{load_snapshot, store_snapshot, PLAYER_ACCOUNT_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted player snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAccount {
    pub username: String,
    pub balance: u64,
    pub avatar: String,
    pub level: u32,
    pub xp: f64,
    pub join_date: DateTime<Utc>,
    pub games_played: u64,
    pub total_wins: u64,
}

impl PlayerAccount {
    pub fn new(username: impl Into<String>, balance: u64, avatar: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            balance,
            avatar: avatar.into(),
            level: 1,
            xp: 0.0,
            join_date: current_timestamp(),
            games_played: 0,
            total_wins: 0,
        }
    }

    /// Rounded percentage of played rounds that paid out
    pub fn win_rate(&self) -> u32 {
        if self.games_played == 0 {
            return 0;
        }
        ((self.total_wins as f64 / self.games_played as f64) * 100.0).round() as u32
    }

    /// Percentage of the way to the next level
    pub fn xp_progress(&self, xp_per_level: f64) -> f64 {
        if xp_per_level <= 0.0 {
            return 0.0;
        }
        (self.xp % xp_per_level) / xp_per_level * 100.0
    }
}

pub struct AccountLedger<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    config: AccountConfig,
    account: Option<PlayerAccount>,
}

impl<S: KeyValueStore + ?Sized> AccountLedger<S> {
    /// Open the ledger and resume the persisted session, if any
    pub fn open(store: Arc<S>, config: AccountConfig) -> LuxeResult<Self> {
        let account: Option<PlayerAccount> = load_snapshot(store.as_ref(), PLAYER_ACCOUNT_KEY)?;
        if let Some(account) = &account {
            tracing::debug!(user = %account.username, balance = account.balance, "Resumed player session");
        }
        Ok(Self {
            store,
            config,
            account,
        })
    }

    pub fn account(&self) -> Option<&PlayerAccount> {
        self.account.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.account.is_some()
    }

    /// Resume the stored account when the username matches, otherwise start
    /// a fresh one with the starting balance.
    pub fn login<R: RandomSource + ?Sized>(
        &mut self,
        username: &str,
        rng: &mut R,
    ) -> LuxeResult<&PlayerAccount> {
        let username = username.trim();
        if username.is_empty() {
            return Err(GameError::InvalidUsername(username.to_string()).into());
        }

        let stored: Option<PlayerAccount> = load_snapshot(self.store.as_ref(), PLAYER_ACCOUNT_KEY)?;
        let account = match stored {
            Some(existing) if existing.username == username => {
                tracing::info!(user = %username, balance = existing.balance, "Player logged in");
                existing
            }
            _ => {
                let fresh = PlayerAccount::new(username, self.config.starting_balance, random_avatar(rng));
                store_snapshot(self.store.as_ref(), PLAYER_ACCOUNT_KEY, &fresh)?;
                tracing::info!(user = %username, balance = fresh.balance, "Created player account");
                fresh
            }
        };
        Ok(self.account.insert(account))
    }

    /// End the session; the stored snapshot is kept for the next login
    pub fn logout(&mut self) {
        if let Some(account) = self.account.take() {
            tracing::info!(user = %account.username, "Player logged out");
        }
    }

    /// Apply a signed balance change, clamping at zero and earning XP on `|delta|`
    pub fn update_balance(&mut self, delta: i64) -> LuxeResult<()> {
        let xp_rate = self.config.xp_rate;
        let xp_per_level = self.config.xp_per_level;
        self.modify(|account| {
            account.balance = if delta >= 0 {
                account.balance.saturating_add(delta as u64)
            } else {
                account.balance.saturating_sub(delta.unsigned_abs())
            };
            account.xp += delta.unsigned_abs() as f64 * xp_rate;
            account.level = (account.xp / xp_per_level).floor() as u32 + 1;
        })
    }

    /// Add play money without earning XP
    pub fn top_up(&mut self, amount: u64) -> LuxeResult<()> {
        self.modify(|account| account.balance = account.balance.saturating_add(amount))?;
        tracing::info!(amount, balance = self.balance(), "Balance topped up");
        Ok(())
    }

    pub fn xp_progress(&self) -> f64 {
        self.account
            .as_ref()
            .map(|a| a.xp_progress(self.config.xp_per_level))
            .unwrap_or(0.0)
    }

    pub fn win_rate(&self) -> u32 {
        self.account.as_ref().map(PlayerAccount::win_rate).unwrap_or(0)
    }

    fn modify(&mut self, apply: impl FnOnce(&mut PlayerAccount)) -> LuxeResult<()> {
        let mut next = self.account.clone().ok_or(GameError::NotLoggedIn)?;
        apply(&mut next);
        store_snapshot(self.store.as_ref(), PLAYER_ACCOUNT_KEY, &next)?;
        self.account = Some(next);
        Ok(())
    }
}

fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

impl<S: KeyValueStore + ?Sized> Wallet for AccountLedger<S> {
    fn balance(&self) -> u64 {
        self.account.as_ref().map(|a| a.balance).unwrap_or(0)
    }

    fn credit(&mut self, amount: u64) -> LuxeResult<()> {
        self.update_balance(signed(amount))
    }

    fn debit(&mut self, amount: u64) -> LuxeResult<()> {
        self.update_balance(-signed(amount))
    }

    fn record_game_played(&mut self) -> LuxeResult<()> {
        self.modify(|account| account.games_played += 1)
    }

    fn record_win(&mut self) -> LuxeResult<()> {
        self.modify(|account| account.total_wins += 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{LuxeError, StorageError};
    use crate::games::rng::seeded;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ledger() -> AccountLedger<MemoryStore> {
        AccountLedger::open(Arc::new(MemoryStore::new()), AccountConfig::default()).unwrap()
    }

    /// Store whose writes can be switched off
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> LuxeResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> LuxeResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::WriteFailed("disk full".to_string()).into());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> LuxeResult<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> LuxeResult<Vec<String>> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_login_creates_account() {
        let mut ledger = ledger();
        let account = ledger.login("  alice ", &mut seeded(1)).unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.balance, 100_000);
        assert_eq!(account.level, 1);
        assert!(crate::common::AVATARS.contains(&account.avatar.as_str()));
    }

    #[test]
    fn test_login_resumes_matching_user_only() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = AccountLedger::open(store.clone(), AccountConfig::default()).unwrap();
        ledger.login("alice", &mut seeded(1)).unwrap();
        ledger.debit(40_000).unwrap();
        ledger.logout();
        assert!(!ledger.is_logged_in());

        assert_eq!(ledger.login("alice", &mut seeded(2)).unwrap().balance, 60_000);
        assert_eq!(ledger.login("bob", &mut seeded(3)).unwrap().balance, 100_000);

        let reopened = AccountLedger::open(store, AccountConfig::default()).unwrap();
        assert_eq!(reopened.account().map(|a| a.username.as_str()), Some("bob"));
    }

    #[test]
    fn test_empty_username_rejected() {
        let mut ledger = ledger();
        let err = ledger.login("   ", &mut seeded(1)).unwrap_err();
        assert!(matches!(err.as_game(), Some(GameError::InvalidUsername(_))));
    }

    #[test]
    fn test_debit_clamps_at_zero_and_earns_xp() {
        let mut ledger = ledger();
        ledger.login("carol", &mut seeded(1)).unwrap();
        ledger.debit(150_000).unwrap();
        let account = ledger.account().unwrap();
        assert_eq!(account.balance, 0);
        assert!((account.xp - 1500.0).abs() < 1e-9);
        assert_eq!(account.level, 2);
    }

    #[test]
    fn test_top_up_earns_no_xp() {
        let mut ledger = ledger();
        ledger.login("dave", &mut seeded(1)).unwrap();
        ledger.top_up(50_000).unwrap();
        let account = ledger.account().unwrap();
        assert_eq!(account.balance, 150_000);
        assert_eq!(account.xp, 0.0);
    }

    #[test]
    fn test_counters_and_views() {
        let mut ledger = ledger();
        ledger.login("erin", &mut seeded(1)).unwrap();
        for _ in 0..3 {
            ledger.record_game_played().unwrap();
        }
        ledger.record_win().unwrap();
        ledger.credit(25_000).unwrap();
        assert_eq!(ledger.win_rate(), 33);
        assert!((ledger.xp_progress() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_logged_out_wallet_rejects() {
        let mut ledger = ledger();
        assert_eq!(ledger.balance(), 0);
        let err = ledger.credit(10).unwrap_err();
        assert_eq!(err.as_game(), Some(&GameError::NotLoggedIn));
    }

    #[test]
    fn test_failed_write_leaves_account_untouched() {
        let store = Arc::new(FlakyStore::default());
        let mut ledger = AccountLedger::open(store.clone(), AccountConfig::default()).unwrap();
        ledger.login("frank", &mut seeded(1)).unwrap();
        let before = ledger.account().cloned();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = ledger.debit(500).unwrap_err();
        assert!(matches!(err, LuxeError::Storage(StorageError::WriteFailed(_))));
        assert_eq!(ledger.account().cloned(), before);
    }

    #[test]
    fn test_snapshot_json_uses_camel_case() {
        let account = PlayerAccount::new("gina", 10, "🎲");
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("gamesPlayed").is_some());
        assert!(json.get("joinDate").is_some());
        let back: PlayerAccount = serde_json::from_value(json).unwrap();
        assert_eq!(back, account);
    }
}
