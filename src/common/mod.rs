//! Shared ports and helpers used across the engine

pub mod traits;
pub mod types;

pub use traits::*;
pub use types::*;
