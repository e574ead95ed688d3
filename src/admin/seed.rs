//! Default back-office directory used when the store has no user list yet

use super::users::{Role, SystemUser};
use crate::common::{current_timestamp, generate_referral_code, AVATARS};
use crate::games::RandomSource;
use chrono::{DateTime, TimeZone, Utc};

fn joined(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_else(current_timestamp)
}

struct SeedUser {
    id: &'static str,
    username: &'static str,
    email: &'static str,
    role: Role,
    balance: u64,
    xp: f64,
    level: u32,
    referral_code: Option<&'static str>,
    referred_by: Option<&'static str>,
    team_members: &'static [&'static str],
    join_date: (i32, u32, u32),
    avatar: &'static str,
    games_played: u64,
    total_wins: u64,
}

const SEED_USERS: [SeedUser; 6] = [
    SeedUser {
        id: "admin-001",
        username: "Admin",
        email: "admin@luxeplay.com",
        role: Role::Admin,
        balance: 10_000_000,
        xp: 50_000.0,
        level: 50,
        referral_code: Some("ADMIN001"),
        referred_by: None,
        team_members: &[],
        join_date: (2024, 1, 1),
        avatar: "👑",
        games_played: 0,
        total_wins: 0,
    },
    SeedUser {
        id: "cashier-001",
        username: "Mohammed the Cashier",
        email: "cashier1@luxeplay.com",
        role: Role::Cashier,
        balance: 500_000,
        xp: 15_000.0,
        level: 15,
        referral_code: Some("CASH001"),
        referred_by: Some("admin-001"),
        team_members: &["user-001", "user-002"],
        join_date: (2024, 6, 1),
        avatar: "💼",
        games_played: 0,
        total_wins: 0,
    },
    SeedUser {
        id: "cashier-002",
        username: "Ahmed the Cashier",
        email: "cashier2@luxeplay.com",
        role: Role::Cashier,
        balance: 350_000,
        xp: 12_000.0,
        level: 12,
        referral_code: Some("CASH002"),
        referred_by: Some("admin-001"),
        team_members: &["user-003"],
        join_date: (2024, 7, 15),
        avatar: "💳",
        games_played: 0,
        total_wins: 0,
    },
    SeedUser {
        id: "user-001",
        username: "Ali the Player",
        email: "ali@example.com",
        role: Role::User,
        balance: 150_000,
        xp: 5_000.0,
        level: 5,
        referral_code: None,
        referred_by: Some("cashier-001"),
        team_members: &[],
        join_date: (2024, 8, 1),
        avatar: AVATARS[0],
        games_played: 45,
        total_wins: 18,
    },
    SeedUser {
        id: "user-002",
        username: "Sara",
        email: "sara@example.com",
        role: Role::User,
        balance: 80_000,
        xp: 3_000.0,
        level: 3,
        referral_code: None,
        referred_by: Some("cashier-001"),
        team_members: &[],
        join_date: (2024, 9, 10),
        avatar: AVATARS[3],
        games_played: 22,
        total_wins: 8,
    },
    SeedUser {
        id: "user-003",
        username: "Khaled the Pro",
        email: "khaled@example.com",
        role: Role::User,
        balance: 250_000,
        xp: 8_000.0,
        level: 8,
        referral_code: None,
        referred_by: Some("cashier-002"),
        team_members: &[],
        join_date: (2024, 7, 20),
        avatar: AVATARS[4],
        games_played: 120,
        total_wins: 55,
    },
];

/// One admin, two cashiers and three players wired into the cashiers' teams.
/// Players get random referral codes; staff codes are fixed.
pub fn default_users<R: RandomSource + ?Sized>(rng: &mut R) -> Vec<SystemUser> {
    SEED_USERS
        .iter()
        .map(|seed| {
            let (year, month, day) = seed.join_date;
            SystemUser {
                id: seed.id.to_string(),
                username: seed.username.to_string(),
                email: seed.email.to_string(),
                balance: seed.balance,
                xp: seed.xp,
                level: seed.level,
                role: seed.role,
                referral_code: seed
                    .referral_code
                    .map(str::to_string)
                    .unwrap_or_else(|| generate_referral_code(rng)),
                referred_by: seed.referred_by.map(str::to_string),
                team_members: seed.team_members.iter().map(|id| id.to_string()).collect(),
                join_date: joined(year, month, day),
                avatar: seed.avatar.to_string(),
                games_played: seed.games_played,
                total_wins: seed.total_wins,
            }
        })
        .collect()
}
