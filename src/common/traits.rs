//! Shared traits and interfaces
//!
//! Engines never touch global state: persistence, the remote catalog and the
//! player's balance all arrive through these seams.

use crate::catalog::{GameCatalogEntry, GameUpdate};
use crate::errors::LuxeResult;
use async_trait::async_trait;

/// Durable key-value store holding whole serialized snapshots.
///
/// Writes replace the full document under a key; there is no partial patch.
pub trait KeyValueStore: Send + Sync {
    /// Read the snapshot stored under `key`
    fn get(&self, key: &str) -> LuxeResult<Option<String>>;

    /// Replace the snapshot stored under `key`
    fn set(&self, key: &str, value: &str) -> LuxeResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> LuxeResult<()>;

    /// All keys currently stored
    fn keys(&self) -> LuxeResult<Vec<String>>;
}

/// Remote store for catalog metadata
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Fetch every catalog entry, ordered by name
    async fn fetch_all(&self) -> LuxeResult<Vec<GameCatalogEntry>>;

    /// Apply a partial update; `Ok(false)` when the backend rejected it
    async fn update(&self, id: &str, update: &GameUpdate) -> LuxeResult<bool>;
}

/// Balance seam consumed by every game engine.
///
/// Callers check `balance()` before debiting; `debit` itself never rejects.
pub trait Wallet {
    fn balance(&self) -> u64;

    fn credit(&mut self, amount: u64) -> LuxeResult<()>;

    fn debit(&mut self, amount: u64) -> LuxeResult<()>;

    /// Count a started round
    fn record_game_played(&mut self) -> LuxeResult<()>;

    /// Count a winning round
    fn record_win(&mut self) -> LuxeResult<()>;
}
