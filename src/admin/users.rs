//! Back-office user records and roles

use crate::common::current_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Cashier,
    Admin,
}

impl Role {
    /// Roles allowed into the back office
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Cashier | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Cashier => write!(f, "cashier"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "cashier" => Ok(Role::Cashier),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub balance: u64,
    pub xp: f64,
    pub level: u32,
    pub role: Role,
    /// Assigned once and never changed
    pub referral_code: String,
    pub referred_by: Option<String>,
    /// Users this cashier may credit and debit
    pub team_members: Vec<String>,
    pub join_date: DateTime<Utc>,
    pub avatar: String,
    pub games_played: u64,
    pub total_wins: u64,
}

impl SystemUser {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            balance: 0,
            xp: 0.0,
            level: 1,
            role: Role::User,
            referral_code: String::new(),
            referred_by: None,
            team_members: Vec::new(),
            join_date: current_timestamp(),
            avatar: String::new(),
            games_played: 0,
            total_wins: 0,
        }
    }

    pub fn has_team_member(&self, user_id: &str) -> bool {
        self.team_members.iter().any(|id| id == user_id)
    }
}

/// Profile fields editable from the back office.
///
/// Balance and role only change through ledger operations, which leave an
/// audit record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl UserUpdate {
    pub fn apply_to(&self, user: &mut SystemUser) {
        if let Some(username) = &self.username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(avatar) = &self.avatar {
            user.avatar = avatar.clone();
        }
    }
}
