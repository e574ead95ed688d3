//! Filtered, paginated views over the transaction log and user directory

use super::ledger::{TransactionRecord, TransactionType};
use super::users::{Role, SystemUser};
use serde::Serialize;

pub const TRANSACTIONS_PER_PAGE: usize = 15;
pub const USERS_PER_PAGE: usize = 10;

/// One page of results. `page` is 1-based and clamped into range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let total_items = items.len();
    let per_page = per_page.max(1);
    let total_pages = total_items.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    pub search: Option<String>,
    pub kind: Option<TransactionType>,
    /// Only honoured for admins
    pub issuer: Option<String>,
    pub page: usize,
}

/// Cashiers only ever see records they sent or received.
pub fn filter_transactions<'a>(
    records: &'a [TransactionRecord],
    viewer: &SystemUser,
    query: &TransactionQuery,
) -> Page<&'a TransactionRecord> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let issuer = query
        .issuer
        .as_deref()
        .filter(|_| viewer.role == Role::Admin);

    let matched = records
        .iter()
        .filter(|r| {
            viewer.role != Role::Cashier || r.from_user_id == viewer.id || r.to_user_id == viewer.id
        })
        .filter(|r| {
            needle.as_deref().map_or(true, |n| {
                contains_ci(&r.from_username, n)
                    || contains_ci(&r.to_username, n)
                    || contains_ci(&r.reason, n)
            })
        })
        .filter(|r| query.kind.map_or(true, |kind| r.kind == kind))
        .filter(|r| issuer.map_or(true, |id| r.from_user_id == id))
        .collect();

    paginate(matched, query.page, TRANSACTIONS_PER_PAGE)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    Balance,
    Level,
    #[default]
    JoinDate,
}

impl std::str::FromStr for UserSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balance" => Ok(UserSort::Balance),
            "level" => Ok(UserSort::Level),
            "joindate" | "join-date" | "joined" => Ok(UserSort::JoinDate),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub sort: UserSort,
    pub page: usize,
}

/// Search covers username, email and referral code; results sort descending.
pub fn filter_users<'a>(users: &'a [SystemUser], query: &UserQuery) -> Page<&'a SystemUser> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut matched: Vec<&SystemUser> = users
        .iter()
        .filter(|u| {
            needle.as_deref().map_or(true, |n| {
                contains_ci(&u.username, n) || contains_ci(&u.email, n) || contains_ci(&u.referral_code, n)
            })
        })
        .filter(|u| query.role.map_or(true, |role| u.role == role))
        .collect();

    match query.sort {
        UserSort::Balance => matched.sort_by(|a, b| b.balance.cmp(&a.balance)),
        UserSort::Level => matched.sort_by(|a, b| b.level.cmp(&a.level)),
        UserSort::JoinDate => matched.sort_by(|a, b| b.join_date.cmp(&a.join_date)),
    }

    paginate(matched, query.page, USERS_PER_PAGE)
}
