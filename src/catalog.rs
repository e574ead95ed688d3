//! Game catalog: metadata, table limits and the active flag per game
//!
//! The catalog is kept as one local snapshot and can be synchronised with a
//! remote `CatalogBackend`. Engines ask it for table limits before a round.

use crate::common::{CatalogBackend, KeyValueStore};
use crate::errors::{AdminError, GameError, LuxeResult, StorageError};
use crate::games::BetLimits;
use crate::storage::{load_snapshot, store_snapshot, GAMES_KEY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

const REMOTE_DEFAULT_RTP: f64 = 96.0;
const REMOTE_DEFAULT_MIN_BET: u64 = 100;
const REMOTE_DEFAULT_MAX_BET: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameCategory {
    Slots,
    Table,
    Crash,
    Live,
}

/// Artwork for one reel symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSymbol {
    pub id: String,
    pub image: String,
    pub name: String,
}

impl GameSymbol {
    fn named(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            image: String::new(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCatalogEntry {
    pub id: String,
    pub name: String,
    pub category: GameCategory,
    pub cover_image: String,
    pub background_image: String,
    pub symbols: Vec<GameSymbol>,
    pub is_active: bool,
    /// Theoretical return to player, in percent
    pub rtp: f64,
    pub min_bet: u64,
    pub max_bet: u64,
}

impl GameCatalogEntry {
    pub fn limits(&self) -> BetLimits {
        BetLimits::new(self.min_bet, self.max_bet)
    }
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<GameSymbol>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_bet: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bet: Option<u64>,
}

impl GameUpdate {
    pub fn is_empty(&self) -> bool {
        *self == GameUpdate::default()
    }

    pub fn apply_to(&self, entry: &mut GameCatalogEntry) {
        if let Some(cover) = &self.cover_image {
            entry.cover_image = cover.clone();
        }
        if let Some(background) = &self.background_image {
            entry.background_image = background.clone();
        }
        if let Some(symbols) = &self.symbols {
            entry.symbols = symbols.clone();
        }
        if let Some(active) = self.is_active {
            entry.is_active = active;
        }
        if let Some(rtp) = self.rtp {
            entry.rtp = rtp;
        }
        if let Some(min) = self.min_bet {
            entry.min_bet = min;
        }
        if let Some(max) = self.max_bet {
            entry.max_bet = max;
        }
    }
}

/// Catalog row as stored by the remote backend; most columns are nullable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteGameRecord {
    pub id: String,
    pub name: String,
    pub category: GameCategory,
    pub cover_image: Option<String>,
    pub background_image: Option<String>,
    pub symbols: Option<Vec<GameSymbol>>,
    pub is_active: Option<bool>,
    pub rtp: Option<f64>,
    pub min_bet: Option<u64>,
    pub max_bet: Option<u64>,
}

impl From<RemoteGameRecord> for GameCatalogEntry {
    fn from(record: RemoteGameRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            category: record.category,
            cover_image: record.cover_image.unwrap_or_default(),
            background_image: record.background_image.unwrap_or_default(),
            symbols: record.symbols.unwrap_or_default(),
            is_active: record.is_active.unwrap_or(true),
            rtp: record.rtp.filter(|r| *r > 0.0).unwrap_or(REMOTE_DEFAULT_RTP),
            min_bet: record.min_bet.filter(|m| *m > 0).unwrap_or(REMOTE_DEFAULT_MIN_BET),
            max_bet: record.max_bet.filter(|m| *m > 0).unwrap_or(REMOTE_DEFAULT_MAX_BET),
        }
    }
}

impl RemoteGameRecord {
    fn apply(&mut self, update: &GameUpdate) {
        if let Some(cover) = &update.cover_image {
            self.cover_image = Some(cover.clone());
        }
        if let Some(background) = &update.background_image {
            self.background_image = Some(background.clone());
        }
        if let Some(symbols) = &update.symbols {
            self.symbols = Some(symbols.clone());
        }
        if let Some(active) = update.is_active {
            self.is_active = Some(active);
        }
        if let Some(rtp) = update.rtp {
            self.rtp = Some(rtp);
        }
        if let Some(min) = update.min_bet {
            self.min_bet = Some(min);
        }
        if let Some(max) = update.max_bet {
            self.max_bet = Some(max);
        }
    }
}

/// Remote catalog held in process memory
#[derive(Clone, Default)]
pub struct InMemoryCatalogBackend {
    rows: Arc<RwLock<Vec<RemoteGameRecord>>>,
}

impl InMemoryCatalogBackend {
    pub fn new(rows: Vec<RemoteGameRecord>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    pub async fn rows(&self) -> Vec<RemoteGameRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl CatalogBackend for InMemoryCatalogBackend {
    async fn fetch_all(&self) -> LuxeResult<Vec<GameCatalogEntry>> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows.into_iter().map(GameCatalogEntry::from).collect())
    }

    async fn update(&self, id: &str, update: &GameUpdate) -> LuxeResult<bool> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(false);
        };
        let mut next = row.clone();
        next.apply(update);
        if check_limits(&GameCatalogEntry::from(next.clone())).is_err() {
            return Ok(false);
        }
        *row = next;
        Ok(true)
    }
}

/// Catalog shipped with a fresh install
pub fn default_games() -> Vec<GameCatalogEntry> {
    let entry = |id: &str, name: &str, category, symbols: Vec<GameSymbol>, rtp, min_bet, max_bet| {
        GameCatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            category,
            cover_image: String::new(),
            background_image: String::new(),
            symbols,
            is_active: true,
            rtp,
            min_bet,
            max_bet,
        }
    };
    let symbols = |names: [&str; 5]| -> Vec<GameSymbol> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| GameSymbol::named(&format!("s{}", i + 1), name))
            .collect()
    };

    vec![
        entry(
            "classic-slots",
            "Classic Slots",
            GameCategory::Slots,
            symbols(["🍒", "🍋", "🍊", "7️⃣", "💎"]),
            96.5,
            100,
            100_000,
        ),
        entry(
            "fruits-slots",
            "Tropical Fruits",
            GameCategory::Slots,
            symbols(["🍇", "🍓", "🍌", "🥝", "🌟"]),
            95.8,
            50,
            50_000,
        ),
        entry("blackjack", "Blackjack", GameCategory::Table, Vec::new(), 99.5, 500, 500_000),
        entry("roulette", "European Roulette", GameCategory::Table, Vec::new(), 97.3, 100, 200_000),
        entry("aviator", "Aviator Crash", GameCategory::Crash, Vec::new(), 97.0, 100, 100_000),
    ]
}

pub struct GameCatalog<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    games: Vec<GameCatalogEntry>,
}

impl<S: KeyValueStore + ?Sized> GameCatalog<S> {
    /// Load the stored catalog, seeding the defaults on first use
    pub fn open(store: Arc<S>) -> LuxeResult<Self> {
        let games = match load_snapshot(store.as_ref(), GAMES_KEY)? {
            Some(games) => games,
            None => {
                let games = default_games();
                store_snapshot(store.as_ref(), GAMES_KEY, &games)?;
                tracing::info!(count = games.len(), "Seeded default game catalog");
                games
            }
        };
        Ok(Self { store, games })
    }

    pub fn entries(&self) -> &[GameCatalogEntry] {
        &self.games
    }

    pub fn get(&self, id: &str) -> Option<&GameCatalogEntry> {
        self.games.iter().find(|g| g.id == id)
    }

    /// Catalog with `update` applied to `id`, checked for `min_bet <= max_bet`
    fn staged(&self, id: &str, update: &GameUpdate) -> LuxeResult<(usize, Vec<GameCatalogEntry>)> {
        let idx = self
            .games
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| AdminError::GameNotFound(id.to_string()))?;

        let mut next = self.games.clone();
        update.apply_to(&mut next[idx]);
        check_limits(&next[idx])?;
        Ok((idx, next))
    }

    fn commit(&mut self, idx: usize, next: Vec<GameCatalogEntry>) -> LuxeResult<&GameCatalogEntry> {
        store_snapshot(self.store.as_ref(), GAMES_KEY, &next)?;
        self.games = next;
        Ok(&self.games[idx])
    }

    /// Apply a partial update; the result must keep `min_bet <= max_bet`
    pub fn update(&mut self, id: &str, update: &GameUpdate) -> LuxeResult<&GameCatalogEntry> {
        let (idx, next) = self.staged(id, update)?;
        let entry = self.commit(idx, next)?;
        tracing::info!(game = %id, update = ?update, "Catalog entry updated");
        Ok(entry)
    }

    pub fn toggle_active(&mut self, id: &str) -> LuxeResult<bool> {
        let active = self
            .get(id)
            .map(|g| g.is_active)
            .ok_or_else(|| AdminError::GameNotFound(id.to_string()))?;
        let update = GameUpdate {
            is_active: Some(!active),
            ..Default::default()
        };
        Ok(self.update(id, &update)?.is_active)
    }

    /// Table limits for a round of `id`; unknown games use `fallback`
    pub fn limits_for(&self, id: &str, fallback: BetLimits) -> Result<BetLimits, GameError> {
        match self.get(id) {
            Some(entry) if !entry.is_active => Err(GameError::GameInactive(id.to_string())),
            Some(entry) => Ok(entry.limits()),
            None => Ok(fallback),
        }
    }

    /// Replace the local catalog with the backend's copy.
    ///
    /// Rows with inverted limits are skipped.
    pub async fn sync_from<B: CatalogBackend + ?Sized>(&mut self, backend: &B) -> LuxeResult<usize> {
        let fetched = backend.fetch_all().await.map_err(|e| {
            tracing::warn!(error = %e, "Catalog fetch failed");
            StorageError::Remote(e.to_string())
        })?;
        let mut games = Vec::with_capacity(fetched.len());
        for entry in fetched {
            match check_limits(&entry) {
                Ok(()) => games.push(entry),
                Err(e) => tracing::warn!(game = %entry.id, error = %e, "Skipping remote catalog row"),
            }
        }
        store_snapshot(self.store.as_ref(), GAMES_KEY, &games)?;
        self.games = games;
        tracing::info!(count = self.games.len(), "Catalog synchronised from backend");
        Ok(self.games.len())
    }

    /// Send an update to the backend and mirror it locally once accepted
    pub async fn push_update<B: CatalogBackend + ?Sized>(
        &mut self,
        backend: &B,
        id: &str,
        update: &GameUpdate,
    ) -> LuxeResult<bool> {
        let (idx, next) = self.staged(id, update)?;
        let accepted = backend.update(id, update).await.map_err(|e| {
            tracing::warn!(game = %id, error = %e, "Catalog update failed");
            StorageError::Remote(e.to_string())
        })?;
        if !accepted {
            tracing::warn!(game = %id, "Backend rejected catalog update");
            return Ok(false);
        }
        self.commit(idx, next)?;
        tracing::info!(game = %id, update = ?update, "Catalog entry pushed");
        Ok(true)
    }
}

fn check_limits(entry: &GameCatalogEntry) -> Result<(), AdminError> {
    if entry.min_bet > entry.max_bet {
        return Err(AdminError::InvalidBetLimits {
            min: entry.min_bet,
            max: entry.max_bet,
        });
    }
    Ok(())
}
