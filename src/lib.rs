//! LuxePlay - play-money casino engine
//!
//! Five game engines (slots, blackjack, roulette, crash, mines) settle against
//! a persisted player account. A back-office ledger lets admins and cashiers
//! adjust balances with an audit trail and edit the game catalog.

pub mod account;
pub mod admin;
pub mod catalog;
pub mod common;
pub mod config;
pub mod errors;
pub mod games;
pub mod storage;

pub use account::{AccountLedger, PlayerAccount};
pub use admin::{AdminLedger, Role, SystemUser, TransactionRecord, TransactionType};
pub use catalog::{GameCatalog, GameCatalogEntry, GameUpdate};
pub use config::LuxeConfig;
pub use errors::{LuxeError, LuxeResult};
