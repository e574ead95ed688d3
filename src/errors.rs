//! Error types for the LuxePlay engine
//!
//! Every fallible operation returns `LuxeResult<T>`. Domain errors are kept in
//! their own enums so callers can match on the precise rejection.

use crate::admin::Role;

/// Root error type for all LuxePlay operations
#[derive(Debug, thiserror::Error)]
pub enum LuxeError {
    /// Game round rejections (bet validation, illegal moves, funds)
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Back-office rejections (roles, teams, reasons)
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Persistence collaborator failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration loading and validation
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Game round errors. None of these are fatal: the round simply does not advance.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("Bet {bet} outside table limits [{min}, {max}]")]
    BetOutOfRange { bet: u64, min: u64, max: u64 },

    #[error("Bet amount must be positive")]
    InvalidBet,

    #[error("A round is already in progress")]
    RoundInProgress,

    #[error("No active round")]
    NoActiveRound,

    #[error("Invalid move: {0}")]
    InvalidMove(&'static str),

    #[error("No bets placed")]
    NoBetsPlaced,

    #[error("Cell {0} is outside the grid")]
    CellOutOfRange(usize),

    #[error("Cell {0} already revealed")]
    CellAlreadyRevealed(usize),

    #[error("Mines count {0} must be between 1 and 24")]
    InvalidMinesCount(usize),

    #[error("Nothing to cash out")]
    NothingToCashOut,

    #[error("Round crashed at {crash_point:.2}x")]
    RoundCrashed { crash_point: f64 },

    #[error("Deck exhausted")]
    DeckExhausted,

    #[error("Game '{0}' is not active")]
    GameInactive(String),

    #[error("No player logged in")]
    NotLoggedIn,

    #[error("Invalid username: '{0}'")]
    InvalidUsername(String),
}

/// Admin ledger errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdminError {
    #[error("No admin session")]
    NotLoggedIn,

    #[error("Role {role} may not {action}")]
    Unauthorized { role: Role, action: &'static str },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User {0} is not in the cashier's team")]
    NotTeamMember(String),

    #[error("A reason is required")]
    EmptyReason,

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("User already has role {0}")]
    RoleUnchanged(Role),

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Invalid bet limits: min {min} > max {max}")]
    InvalidBetLimits { min: u64, max: u64 },

    #[error("Login rejected for {0}")]
    LoginRejected(String),

    #[error("Unknown referral code: {0}")]
    UnknownReferralCode(String),

    #[error("Username already taken: {0}")]
    DuplicateUsername(String),
}

/// Storage system errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Remote backend failed: {0}")]
    Remote(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

impl From<std::io::Error> for LuxeError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => LuxeError::Storage(StorageError::ReadFailed(e.to_string())),
            _ => LuxeError::Storage(StorageError::WriteFailed(e.to_string())),
        }
    }
}

impl From<serde_json::Error> for LuxeError {
    fn from(e: serde_json::Error) -> Self {
        LuxeError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<toml::de::Error> for LuxeError {
    fn from(e: toml::de::Error) -> Self {
        LuxeError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type LuxeResult<T> = Result<T, LuxeError>;

impl LuxeError {
    /// The game rejection wrapped by this error, if any
    pub fn as_game(&self) -> Option<&GameError> {
        match self {
            LuxeError::Game(e) => Some(e),
            _ => None,
        }
    }

    /// The admin rejection wrapped by this error, if any
    pub fn as_admin(&self) -> Option<&AdminError> {
        match self {
            LuxeError::Admin(e) => Some(e),
            _ => None,
        }
    }
}
