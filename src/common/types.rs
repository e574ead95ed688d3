//! Shared type definitions and small helpers
//!
//! Timestamps, identifiers and referral codes used by the account and admin
//! subsystems.

use crate::games::RandomSource;
use chrono::{DateTime, Utc};

/// Currency amount in whole play-money units
pub type Amount = u64;

/// Avatar set handed out to new accounts
pub const AVATARS: [&str; 8] = ["🎰", "🃏", "🎲", "💎", "🏆", "⭐", "🔥", "💰"];

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERRAL_CODE_LEN: usize = 8;

/// Current wall-clock time in UTC
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Generate a unique record identifier
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate an 8-character upper-case alphanumeric referral code
pub fn generate_referral_code<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.next_index(REFERRAL_ALPHABET.len())] as char)
        .collect()
}

/// Pick an avatar uniformly from the fixed set
pub fn random_avatar<R: RandomSource + ?Sized>(rng: &mut R) -> String {
    AVATARS[rng.next_index(AVATARS.len())].to_string()
}

/// Apply `amount * factor` and round down to whole units
pub fn scale_floor(amount: Amount, factor: f64) -> Amount {
    let scaled = (amount as f64 * factor).floor();
    if scaled <= 0.0 {
        0
    } else {
        scaled as Amount
    }
}
