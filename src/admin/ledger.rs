//! Admin transaction ledger
//!
//! Balance changes made from the back office are mirrored by an immutable
//! audit record. The user list and the record log are written to the store
//! before either changes in memory.

use super::query::{filter_transactions, filter_users, Page, TransactionQuery, UserQuery};
use super::seed::default_users;
use super::users::{Role, SystemUser, UserUpdate};
use crate::catalog::{GameCatalog, GameCatalogEntry, GameUpdate};
use crate::common::{current_timestamp, generate_id, generate_referral_code, random_avatar, KeyValueStore};
use crate::errors::{AdminError, LuxeResult};
use crate::games::RandomSource;
use crate::storage::{load_snapshot, store_snapshot, ADMIN_USERS_KEY, CURRENT_ADMIN_KEY, TRANSACTIONS_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_ADD_REASON: &str = "Admin credit";
pub const DEFAULT_TRANSFER_REASON: &str = "Balance transfer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    Add,
    Deduct,
    RoleChange,
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "transfer" => Ok(TransactionType::Transfer),
            "add" => Ok(TransactionType::Add),
            "deduct" => Ok(TransactionType::Deduct),
            "role_change" => Ok(TransactionType::RoleChange),
            other => Err(format!("Unknown transaction type: {}", other)),
        }
    }
}

/// Audit record of one back-office action. Never modified once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub from_user_id: String,
    pub from_username: String,
    pub to_user_id: String,
    pub to_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_role: Option<Role>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        kind: TransactionType,
        from: &SystemUser,
        to: &SystemUser,
        amount: Option<u64>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            kind,
            from_user_id: from.id.clone(),
            from_username: from.username.clone(),
            to_user_id: to.id.clone(),
            to_username: to.username.clone(),
            amount,
            reason: reason.into(),
            previous_role: None,
            new_role: None,
            timestamp: current_timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminSession {
    user_id: String,
    logged_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub total_balance: u64,
    pub total_cashiers: usize,
    pub last_transaction: Option<TransactionRecord>,
}

fn required_reason(reason: &str) -> Result<String, AdminError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AdminError::EmptyReason);
    }
    Ok(reason.to_string())
}

fn reason_or(reason: Option<&str>, fallback: &str) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn positive(amount: u64) -> Result<u64, AdminError> {
    if amount == 0 {
        return Err(AdminError::InvalidAmount);
    }
    Ok(amount)
}

pub struct AdminLedger<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    users: Vec<SystemUser>,
    /// Newest first
    transactions: Vec<TransactionRecord>,
    session: Option<String>,
}

impl<S: KeyValueStore + ?Sized> AdminLedger<S> {
    /// Load the directory, log and session. An empty store is seeded with the
    /// default directory.
    pub fn open<R: RandomSource + ?Sized>(store: Arc<S>, rng: &mut R) -> LuxeResult<Self> {
        let users = match load_snapshot(store.as_ref(), ADMIN_USERS_KEY)? {
            Some(users) => users,
            None => {
                let users = default_users(rng);
                store_snapshot(store.as_ref(), ADMIN_USERS_KEY, &users)?;
                tracing::info!(count = users.len(), "Seeded admin user directory");
                users
            }
        };
        let transactions: Vec<TransactionRecord> =
            load_snapshot(store.as_ref(), TRANSACTIONS_KEY)?.unwrap_or_default();

        let mut ledger = Self {
            store,
            users,
            transactions,
            session: None,
        };

        if let Some(session) = load_snapshot::<AdminSession, _>(ledger.store.as_ref(), CURRENT_ADMIN_KEY)? {
            match ledger.user(&session.user_id) {
                Some(user) if user.role.is_staff() => {
                    tracing::debug!(admin = %user.username, "Resumed admin session");
                    ledger.session = Some(session.user_id);
                }
                _ => {
                    tracing::warn!(user_id = %session.user_id, "Discarding stale admin session");
                    ledger.store.remove(CURRENT_ADMIN_KEY)?;
                }
            }
        }

        Ok(ledger)
    }

    pub fn users(&self) -> &[SystemUser] {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&SystemUser> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// The logged-in staff member, read from the live directory
    pub fn current_admin(&self) -> Option<&SystemUser> {
        self.session.as_deref().and_then(|id| self.user(id))
    }

    pub fn is_admin(&self) -> bool {
        self.current_admin().is_some_and(|u| u.role == Role::Admin)
    }

    pub fn is_cashier(&self) -> bool {
        self.current_admin().is_some_and(|u| u.role == Role::Cashier)
    }

    /// Case-insensitive username match against staff accounts
    pub fn login_as_admin(&mut self, username: &str) -> LuxeResult<&SystemUser> {
        let wanted = username.trim().to_lowercase();
        let Some(user) = self
            .users
            .iter()
            .find(|u| u.role.is_staff() && u.username.to_lowercase() == wanted)
        else {
            tracing::warn!(username = %username, "Admin login rejected");
            return Err(AdminError::LoginRejected(username.to_string()).into());
        };

        let session = AdminSession {
            user_id: user.id.clone(),
            logged_in_at: current_timestamp(),
        };
        store_snapshot(self.store.as_ref(), CURRENT_ADMIN_KEY, &session)?;
        tracing::info!(admin = %user.username, role = %user.role, "Admin logged in");

        let id = session.user_id;
        self.session = Some(id.clone());
        self.user(&id)
            .ok_or_else(|| AdminError::UserNotFound(id).into())
    }

    pub fn logout_admin(&mut self) -> LuxeResult<()> {
        self.store.remove(CURRENT_ADMIN_KEY)?;
        if let Some(id) = self.session.take() {
            tracing::info!(admin_id = %id, "Admin logged out");
        }
        Ok(())
    }

    /// Credit a user from the house. Admin only.
    pub fn add_balance(
        &mut self,
        user_id: &str,
        amount: u64,
        reason: Option<&str>,
    ) -> LuxeResult<&TransactionRecord> {
        let actor = self.require_role(Role::Admin, "add balance")?;
        let amount = positive(amount)?;
        let reason = reason_or(reason, DEFAULT_ADD_REASON);

        let mut users = self.users.clone();
        let target = Self::find_mut(&mut users, user_id)?;
        target.balance = target.balance.saturating_add(amount);
        let record = TransactionRecord::new(TransactionType::Add, &actor, target, Some(amount), reason);

        self.commit(users, record)
    }

    /// Debit a user, clamping at zero. Admin only; a reason is mandatory.
    pub fn deduct_balance(&mut self, user_id: &str, amount: u64, reason: &str) -> LuxeResult<&TransactionRecord> {
        let actor = self.require_role(Role::Admin, "deduct balance")?;
        let reason = required_reason(reason)?;
        let amount = positive(amount)?;

        let mut users = self.users.clone();
        let target = Self::find_mut(&mut users, user_id)?;
        target.balance = target.balance.saturating_sub(amount);
        let record = TransactionRecord::new(TransactionType::Deduct, &actor, target, Some(amount), reason);

        self.commit(users, record)
    }

    /// Move funds from the logged-in cashier to one of their team members
    pub fn transfer_to_team_member(
        &mut self,
        user_id: &str,
        amount: u64,
        reason: Option<&str>,
    ) -> LuxeResult<&TransactionRecord> {
        let actor = self.require_role(Role::Cashier, "transfer to team members")?;
        Self::require_team_member(&actor, user_id)?;
        let amount = positive(amount)?;
        if amount > actor.balance {
            return Err(AdminError::InsufficientFunds {
                needed: amount,
                available: actor.balance,
            }
            .into());
        }
        let reason = reason_or(reason, DEFAULT_TRANSFER_REASON);

        let mut users = self.users.clone();
        Self::find_mut(&mut users, &actor.id)?.balance -= amount;
        let target = Self::find_mut(&mut users, user_id)?;
        target.balance = target.balance.saturating_add(amount);
        let record = TransactionRecord::new(TransactionType::Transfer, &actor, target, Some(amount), reason);

        self.commit(users, record)
    }

    /// Pull funds from a team member back to the logged-in cashier.
    ///
    /// The member's balance clamps at zero and the cashier receives only what
    /// was actually removed.
    pub fn deduct_from_team_member(
        &mut self,
        user_id: &str,
        amount: u64,
        reason: &str,
    ) -> LuxeResult<&TransactionRecord> {
        let actor = self.require_role(Role::Cashier, "deduct from team members")?;
        let reason = required_reason(reason)?;
        Self::require_team_member(&actor, user_id)?;
        let amount = positive(amount)?;

        let mut users = self.users.clone();
        let target = Self::find_mut(&mut users, user_id)?;
        let taken = amount.min(target.balance);
        target.balance -= taken;
        let record = TransactionRecord::new(TransactionType::Deduct, &actor, target, Some(taken), reason);
        let cashier = Self::find_mut(&mut users, &actor.id)?;
        cashier.balance = cashier.balance.saturating_add(taken);

        self.commit(users, record)
    }

    /// Admin only. Promoting to cashier assigns a referral code when the user
    /// has none.
    pub fn change_role<R: RandomSource + ?Sized>(
        &mut self,
        user_id: &str,
        new_role: Role,
        reason: &str,
        rng: &mut R,
    ) -> LuxeResult<&TransactionRecord> {
        let actor = self.require_role(Role::Admin, "change roles")?;
        let reason = required_reason(reason)?;

        let mut users = self.users.clone();
        let target = Self::find_mut(&mut users, user_id)?;
        let previous = target.role;
        if previous == new_role {
            return Err(AdminError::RoleUnchanged(new_role).into());
        }
        target.role = new_role;
        if new_role == Role::Cashier && target.referral_code.is_empty() {
            target.referral_code = generate_referral_code(rng);
        }

        let mut record = TransactionRecord::new(TransactionType::RoleChange, &actor, target, None, reason);
        record.previous_role = Some(previous);
        record.new_role = Some(new_role);

        self.commit(users, record)
    }

    /// Edit profile fields. Admin only; leaves no audit record.
    pub fn update_user(&mut self, user_id: &str, update: &UserUpdate) -> LuxeResult<&SystemUser> {
        self.require_role(Role::Admin, "edit users")?;

        let mut users = self.users.clone();
        let idx = users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| AdminError::UserNotFound(user_id.to_string()))?;
        if let Some(username) = &update.username {
            self.check_username(username, Some(user_id))?;
        }
        update.apply_to(&mut users[idx]);

        store_snapshot(self.store.as_ref(), ADMIN_USERS_KEY, &users)?;
        self.users = users;
        tracing::info!(user_id = %user_id, "User profile updated");
        Ok(&self.users[idx])
    }

    pub fn team_members(&self, cashier_id: &str) -> Vec<&SystemUser> {
        let Some(cashier) = self.user(cashier_id) else {
            return Vec::new();
        };
        cashier
            .team_members
            .iter()
            .filter_map(|id| self.user(id))
            .collect()
    }

    /// Add a player to the directory, optionally joining the team of whoever
    /// owns `referral_code`.
    pub fn register_user<R: RandomSource + ?Sized>(
        &mut self,
        username: &str,
        email: &str,
        referral_code: Option<&str>,
        starting_balance: u64,
        rng: &mut R,
    ) -> LuxeResult<&SystemUser> {
        let username = self.check_username(username, None)?;

        let mut users = self.users.clone();
        // Only staff hand out referral codes
        let referrer = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                users
                    .iter()
                    .position(|u| u.role.is_staff() && u.referral_code.eq_ignore_ascii_case(code))
                    .ok_or_else(|| AdminError::UnknownReferralCode(code.to_string()))?,
            ),
            None => None,
        };

        let mut user = SystemUser::new(format!("user-{}", generate_id()), username, email.trim());
        user.balance = starting_balance;
        user.referral_code = generate_referral_code(rng);
        user.avatar = random_avatar(rng);
        if let Some(idx) = referrer {
            user.referred_by = Some(users[idx].id.clone());
            users[idx].team_members.push(user.id.clone());
        }
        let id = user.id.clone();
        users.push(user);

        store_snapshot(self.store.as_ref(), ADMIN_USERS_KEY, &users)?;
        self.users = users;
        tracing::info!(user_id = %id, username = %username, "Registered user");
        self.user(&id)
            .ok_or_else(|| AdminError::UserNotFound(id).into())
    }

    pub fn stats(&self) -> AdminStats {
        AdminStats {
            total_users: self.users.len(),
            total_balance: self.users.iter().map(|u| u.balance).sum(),
            total_cashiers: self.users.iter().filter(|u| u.role == Role::Cashier).count(),
            last_transaction: self.transactions.first().cloned(),
        }
    }

    /// Requires a staff session; cashiers are scoped to their own records
    pub fn query_transactions(&self, query: &TransactionQuery) -> LuxeResult<Page<&TransactionRecord>> {
        let viewer = self.current_admin().ok_or(AdminError::NotLoggedIn)?;
        Ok(filter_transactions(&self.transactions, viewer, query))
    }

    pub fn query_users(&self, query: &UserQuery) -> LuxeResult<Page<&SystemUser>> {
        self.require_role(Role::Admin, "list users")?;
        Ok(filter_users(&self.users, query))
    }

    /// Admin-gated catalog edit
    pub fn update_game<'c, C: KeyValueStore + ?Sized>(
        &self,
        catalog: &'c mut GameCatalog<C>,
        game_id: &str,
        update: &GameUpdate,
    ) -> LuxeResult<&'c GameCatalogEntry> {
        self.require_role(Role::Admin, "edit games")?;
        catalog.update(game_id, update)
    }

    /// Trimmed `username` if it is non-empty and unused by anyone but `owner`
    fn check_username<'a>(&self, username: &'a str, owner: Option<&str>) -> Result<&'a str, AdminError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AdminError::LoginRejected(username.to_string()));
        }
        let lowered = username.to_lowercase();
        let taken = self
            .users
            .iter()
            .filter(|u| Some(u.id.as_str()) != owner)
            .any(|u| u.username.to_lowercase() == lowered);
        if taken {
            return Err(AdminError::DuplicateUsername(username.to_string()));
        }
        Ok(username)
    }

    fn require_role(&self, role: Role, action: &'static str) -> Result<SystemUser, AdminError> {
        let actor = self.current_admin().ok_or(AdminError::NotLoggedIn)?;
        if actor.role != role {
            return Err(AdminError::Unauthorized {
                role: actor.role,
                action,
            });
        }
        Ok(actor.clone())
    }

    fn require_team_member(cashier: &SystemUser, user_id: &str) -> Result<(), AdminError> {
        if !cashier.has_team_member(user_id) {
            return Err(AdminError::NotTeamMember(user_id.to_string()));
        }
        Ok(())
    }

    fn find_mut<'u>(users: &'u mut [SystemUser], id: &str) -> Result<&'u mut SystemUser, AdminError> {
        users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AdminError::UserNotFound(id.to_string()))
    }

    fn commit(&mut self, users: Vec<SystemUser>, record: TransactionRecord) -> LuxeResult<&TransactionRecord> {
        let mut transactions = Vec::with_capacity(self.transactions.len() + 1);
        transactions.push(record);
        transactions.extend(self.transactions.iter().cloned());

        store_snapshot(self.store.as_ref(), ADMIN_USERS_KEY, &users)?;
        store_snapshot(self.store.as_ref(), TRANSACTIONS_KEY, &transactions)?;
        self.users = users;
        self.transactions = transactions;

        let record = &self.transactions[0];
        tracing::info!(
            kind = ?record.kind,
            from = %record.from_username,
            to = %record.to_username,
            amount = ?record.amount,
            "Recorded admin transaction"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LuxeError;
    use crate::games::rng::seeded;
    use crate::storage::MemoryStore;

    fn ledger() -> AdminLedger<MemoryStore> {
        AdminLedger::open(Arc::new(MemoryStore::new()), &mut seeded(1)).unwrap()
    }

    fn admin_err(err: LuxeError) -> AdminError {
        err.as_admin().cloned().expect("admin error")
    }

    fn balance(ledger: &AdminLedger<MemoryStore>, id: &str) -> u64 {
        ledger.user(id).unwrap().balance
    }

    #[test]
    fn test_open_seeds_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let ledger = AdminLedger::open(store.clone(), &mut seeded(1)).unwrap();
        assert_eq!(ledger.users().len(), 6);
        assert!(ledger.transactions().is_empty());
        assert!(store.get(ADMIN_USERS_KEY).unwrap().is_some());

        let reopened = AdminLedger::open(store, &mut seeded(2)).unwrap();
        assert_eq!(reopened.users(), ledger.users());
    }

    #[test]
    fn test_login_rules() {
        let mut ledger = ledger();
        assert_eq!(ledger.login_as_admin("admin").unwrap().id, "admin-001");
        assert!(ledger.is_admin());

        let err = admin_err(ledger.login_as_admin("Sara").unwrap_err());
        assert_eq!(err, AdminError::LoginRejected("Sara".to_string()));
        // A rejected login keeps the previous session
        assert!(ledger.is_admin());

        ledger.login_as_admin("MOHAMMED THE CASHIER").unwrap();
        assert!(ledger.is_cashier());
        ledger.logout_admin().unwrap();
        assert!(ledger.current_admin().is_none());
    }

    #[test]
    fn test_session_survives_reopen() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = AdminLedger::open(store.clone(), &mut seeded(1)).unwrap();
        ledger.login_as_admin("Admin").unwrap();

        let reopened = AdminLedger::open(store.clone(), &mut seeded(1)).unwrap();
        assert_eq!(reopened.current_admin().map(|u| u.id.as_str()), Some("admin-001"));

        ledger.logout_admin().unwrap();
        let reopened = AdminLedger::open(store, &mut seeded(1)).unwrap();
        assert!(reopened.current_admin().is_none());
    }

    #[test]
    fn test_add_and_deduct() {
        let mut ledger = ledger();
        ledger.login_as_admin("Admin").unwrap();

        let record = ledger.add_balance("user-002", 20_000, None).unwrap();
        assert_eq!(record.kind, TransactionType::Add);
        assert_eq!(record.reason, DEFAULT_ADD_REASON);
        assert_eq!(balance(&ledger, "user-002"), 100_000);

        ledger.deduct_balance("user-002", 250_000, "chargeback").unwrap();
        assert_eq!(balance(&ledger, "user-002"), 0);
        assert_eq!(ledger.transactions().len(), 2);
        assert_eq!(ledger.transactions()[0].kind, TransactionType::Deduct);

        let err = admin_err(ledger.deduct_balance("user-001", 10, "  ").unwrap_err());
        assert_eq!(err, AdminError::EmptyReason);
        let err = admin_err(ledger.add_balance("user-001", 0, None).unwrap_err());
        assert_eq!(err, AdminError::InvalidAmount);
        let err = admin_err(ledger.add_balance("ghost", 10, None).unwrap_err());
        assert_eq!(err, AdminError::UserNotFound("ghost".to_string()));
        assert_eq!(ledger.transactions().len(), 2);
    }

    #[test]
    fn test_role_gates() {
        let mut ledger = ledger();
        let err = admin_err(ledger.add_balance("user-001", 10, None).unwrap_err());
        assert_eq!(err, AdminError::NotLoggedIn);

        ledger.login_as_admin("Mohammed the Cashier").unwrap();
        let err = admin_err(ledger.add_balance("user-001", 10, None).unwrap_err());
        assert!(matches!(err, AdminError::Unauthorized { role: Role::Cashier, .. }));
        let err = admin_err(
            ledger
                .change_role("user-001", Role::Cashier, "promotion", &mut seeded(1))
                .unwrap_err(),
        );
        assert_eq!(err.to_string(), "Role cashier may not change roles");

        ledger.login_as_admin("Admin").unwrap();
        let err = admin_err(ledger.transfer_to_team_member("user-001", 10, None).unwrap_err());
        assert!(matches!(err, AdminError::Unauthorized { role: Role::Admin, .. }));
    }

    #[test]
    fn test_cashier_transfer() {
        let mut ledger = ledger();
        ledger.login_as_admin("Mohammed the Cashier").unwrap();

        let record = ledger.transfer_to_team_member("user-001", 50_000, Some("")).unwrap();
        assert_eq!(record.reason, DEFAULT_TRANSFER_REASON);
        assert_eq!(record.from_user_id, "cashier-001");
        assert_eq!(balance(&ledger, "cashier-001"), 450_000);
        assert_eq!(balance(&ledger, "user-001"), 200_000);
        // The session reads the live directory
        assert_eq!(ledger.current_admin().unwrap().balance, 450_000);

        let err = admin_err(ledger.transfer_to_team_member("user-003", 10, None).unwrap_err());
        assert_eq!(err, AdminError::NotTeamMember("user-003".to_string()));

        let err = admin_err(ledger.transfer_to_team_member("user-002", 450_001, None).unwrap_err());
        assert_eq!(
            err,
            AdminError::InsufficientFunds {
                needed: 450_001,
                available: 450_000
            }
        );
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[test]
    fn test_deduct_from_team_member() {
        let mut ledger = ledger();
        ledger.login_as_admin("Mohammed the Cashier").unwrap();

        let err = admin_err(ledger.deduct_from_team_member("user-002", 1_000, "").unwrap_err());
        assert_eq!(err, AdminError::EmptyReason);
        assert_eq!(balance(&ledger, "user-002"), 80_000);
        assert_eq!(balance(&ledger, "cashier-001"), 500_000);
        assert!(ledger.transactions().is_empty());

        let record = ledger.deduct_from_team_member("user-002", 100_000, "closing account").unwrap();
        assert_eq!(record.amount, Some(80_000));
        assert_eq!(balance(&ledger, "user-002"), 0);
        assert_eq!(balance(&ledger, "cashier-001"), 580_000);
    }

    #[test]
    fn test_change_role() {
        let mut ledger = ledger();
        ledger.login_as_admin("Admin").unwrap();

        let mut users = ledger.users.clone();
        AdminLedger::<MemoryStore>::find_mut(&mut users, "user-002").unwrap().referral_code.clear();
        ledger.users = users;

        let record = ledger
            .change_role("user-002", Role::Cashier, "promoted", &mut seeded(4))
            .unwrap();
        assert_eq!(record.kind, TransactionType::RoleChange);
        assert_eq!(record.previous_role, Some(Role::User));
        assert_eq!(record.new_role, Some(Role::Cashier));
        assert!(record.amount.is_none());

        let promoted = ledger.user("user-002").unwrap();
        assert_eq!(promoted.role, Role::Cashier);
        assert_eq!(promoted.referral_code.len(), 8);

        let err = admin_err(
            ledger
                .change_role("user-002", Role::Cashier, "again", &mut seeded(4))
                .unwrap_err(),
        );
        assert_eq!(err, AdminError::RoleUnchanged(Role::Cashier));
        let err = admin_err(
            ledger
                .change_role("user-002", Role::User, "", &mut seeded(4))
                .unwrap_err(),
        );
        assert_eq!(err, AdminError::EmptyReason);
    }

    #[test]
    fn test_register_with_referral() {
        let mut ledger = ledger();
        let user = ledger
            .register_user("newbie", "new@example.com", Some("cash002"), 100_000, &mut seeded(3))
            .unwrap();
        let id = user.id.clone();
        assert_eq!(user.referred_by.as_deref(), Some("cashier-002"));
        assert_eq!(user.balance, 100_000);
        assert!(ledger.user("cashier-002").unwrap().has_team_member(&id));
        assert_eq!(ledger.team_members("cashier-002").len(), 2);

        let err = admin_err(
            ledger
                .register_user("other", "o@example.com", Some("NOPE"), 0, &mut seeded(3))
                .unwrap_err(),
        );
        assert_eq!(err, AdminError::UnknownReferralCode("NOPE".to_string()));
        let err = admin_err(
            ledger
                .register_user("NEWBIE", "n@example.com", None, 0, &mut seeded(3))
                .unwrap_err(),
        );
        assert_eq!(err, AdminError::DuplicateUsername("NEWBIE".to_string()));
        assert_eq!(ledger.users().len(), 7);
    }

    #[test]
    fn test_update_user_and_stats() {
        let mut ledger = ledger();
        ledger.login_as_admin("Admin").unwrap();
        let update = UserUpdate {
            email: Some("sara@luxeplay.com".to_string()),
            ..Default::default()
        };
        assert_eq!(ledger.update_user("user-002", &update).unwrap().email, "sara@luxeplay.com");

        let stats = ledger.stats();
        assert_eq!(stats.total_users, 6);
        assert_eq!(stats.total_cashiers, 2);
        assert_eq!(stats.total_balance, 11_330_000);
        assert!(stats.last_transaction.is_none());

        ledger.add_balance("user-001", 1_000, Some("promo")).unwrap();
        let stats = ledger.stats();
        assert_eq!(stats.total_balance, 11_331_000);
        assert_eq!(stats.last_transaction.unwrap().reason, "promo");
    }

    #[test]
    fn test_queries_require_session() {
        let mut ledger = ledger();
        let err = admin_err(ledger.query_transactions(&TransactionQuery::default()).unwrap_err());
        assert_eq!(err, AdminError::NotLoggedIn);

        ledger.login_as_admin("Mohammed the Cashier").unwrap();
        assert!(ledger.query_transactions(&TransactionQuery::default()).is_ok());
        assert!(ledger.query_users(&UserQuery::default()).is_err());
    }

    #[test]
    fn test_record_json_shape() {
        let users = default_users(&mut seeded(1));
        let mut record = TransactionRecord::new(TransactionType::RoleChange, &users[0], &users[3], None, "promo");
        record.new_role = Some(Role::Cashier);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "role_change");
        assert_eq!(json["newRole"], "cashier");
        assert!(json.get("amount").is_none());
        assert!(json.get("previousRole").is_none());
    }

    #[test]
    fn test_player_codes_do_not_refer() {
        let mut ledger = ledger();
        let code = ledger.user("user-001").unwrap().referral_code.clone();
        let err = admin_err(
            ledger
                .register_user("friend", "friend@example.com", Some(&code), 0, &mut seeded(4))
                .unwrap_err(),
        );
        assert_eq!(err, AdminError::UnknownReferralCode(code));
        assert!(ledger.user("user-001").unwrap().team_members.is_empty());
        assert_eq!(ledger.users().len(), 6);

        // Admin codes still work
        let user = ledger
            .register_user("friend", "friend@example.com", Some("admin001"), 0, &mut seeded(4))
            .unwrap();
        assert_eq!(user.referred_by.as_deref(), Some("admin-001"));
    }

    #[test]
    fn test_rename_keeps_usernames_unique() {
        let mut ledger = ledger();
        ledger.login_as_admin("Admin").unwrap();
        let rename = |name: &str| UserUpdate {
            username: Some(name.to_string()),
            ..Default::default()
        };

        let err = admin_err(ledger.update_user("user-002", &rename("mohammed the cashier")).unwrap_err());
        assert_eq!(err, AdminError::DuplicateUsername("mohammed the cashier".to_string()));
        let err = admin_err(ledger.update_user("user-003", &rename("   ")).unwrap_err());
        assert!(matches!(err, AdminError::LoginRejected(_)));
        assert_eq!(ledger.user("user-002").unwrap().username, "Sara");
        assert_eq!(ledger.user("user-003").unwrap().username, "Khaled the Pro");

        // Changing only the case of your own name is fine
        let user = ledger.update_user("user-002", &rename(" SARA ")).unwrap();
        assert_eq!(user.username, "SARA");
    }
}
