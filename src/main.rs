//! LuxePlay command-line front end
//!
//! Each invocation opens the stores, runs one command against the player
//! account or the back office, and exits.

use clap::{Parser, Subcommand};
use luxeplay::{
    account::AccountLedger,
    admin::{AdminLedger, Role, TransactionQuery, TransactionType, UserQuery, UserSort},
    catalog::{GameCatalog, GameUpdate},
    common::{KeyValueStore, Wallet},
    config::{LuxeConfig, StorageBackend},
    errors::{GameError, LuxeResult},
    games::{
        blackjack::BlackjackPhase, crash::CrashPhase, mines::RevealOutcome, roulette::RouletteBet,
        BlackjackEngine, CrashEngine, MinesEngine, RouletteEngine, SlotTheme, SlotsEngine,
    },
    storage::{JsonFileStore, MemoryStore},
};
use rand::rngs::ThreadRng;
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

type Store = dyn KeyValueStore;

/// LuxePlay casino CLI
#[derive(Parser)]
#[command(name = "luxeplay")]
#[command(about = "Play-money casino engine with player and back-office ledgers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Data directory for persisted snapshots
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in as a player, creating the account if needed
    Login { username: String },

    /// Show the player's balance and progress
    Balance,

    /// Add play money to the player's balance
    TopUp { amount: u64 },

    /// List the game catalog
    Games,

    /// Spin a slot machine
    Slots {
        #[arg(short, long, default_value = "classic")]
        theme: SlotTheme,

        #[arg(short, long, default_value = "100")]
        bet: u64,

        /// Number of consecutive spins
        #[arg(short, long, default_value = "1")]
        spins: u32,
    },

    /// Place roulette bets as BET=STAKE (e.g. red=500 17=100) and spin
    Roulette {
        #[arg(required = true)]
        bets: Vec<String>,
    },

    /// Ride a crash round, cashing out at the target multiplier
    Crash {
        #[arg(short, long, default_value = "100")]
        bet: u64,

        #[arg(short = 'x', long, default_value = "2.0")]
        cash_out_at: f64,
    },

    /// Play a mines round: reveal the given cells, then cash out
    Mines {
        #[arg(short, long, default_value = "100")]
        bet: u64,

        #[arg(short, long, default_value = "3")]
        mines: usize,

        /// Cell indices 0-24 to reveal in order
        #[arg(short, long, value_delimiter = ',')]
        reveal: Vec<usize>,
    },

    /// Play a blackjack hand
    Blackjack {
        #[arg(short, long, default_value = "100")]
        bet: u64,

        /// Moves to play: h = hit, s = stand, d = double. Empty hits below 17.
        #[arg(short, long, default_value = "")]
        moves: String,
    },

    /// Back-office commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Start a staff session
    Login { username: String },

    /// End the staff session
    Logout,

    /// Directory totals and the latest transaction
    Stats,

    /// Browse the transaction log
    Transactions {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short = 't', long)]
        kind: Option<TransactionType>,

        /// Only records issued by this user id (admins only)
        #[arg(short, long)]
        issuer: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Browse the user directory
    Users {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        role: Option<Role>,

        #[arg(long, default_value = "joindate")]
        sort: UserSort,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Credit a user
    Add {
        user_id: String,
        amount: u64,
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Debit a user
    Deduct {
        user_id: String,
        amount: u64,
        #[arg(short, long)]
        reason: String,
    },

    /// Cashier: send funds to a team member
    Transfer {
        user_id: String,
        amount: u64,
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Cashier: take funds back from a team member
    Reclaim {
        user_id: String,
        amount: u64,
        #[arg(short, long)]
        reason: String,
    },

    /// Change a user's role
    Role {
        user_id: String,
        role: Role,
        #[arg(short, long)]
        reason: String,
    },

    /// List a cashier's team
    Team { cashier_id: String },

    /// Register a user, optionally under a referral code
    Register {
        username: String,
        email: String,
        #[arg(short, long)]
        referral: Option<String>,
    },

    /// Enable or disable a game
    ToggleGame { game_id: String },

    /// Change a game's table limits
    SetLimits { game_id: String, min: u64, max: u64 },
}

fn main() -> LuxeResult<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LuxeConfig::from_file(path)?,
        None => LuxeConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_directory = dir;
    }

    let directive = if cli.verbose {
        "luxeplay=debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)))
        .with_target(false)
        .init();

    let store: Arc<Store> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::JsonFile => Arc::new(JsonFileStore::open(&config.storage.data_directory)?),
    };
    tracing::debug!(backend = ?config.storage.backend, "Storage ready");

    let mut rng = rand::thread_rng();
    match cli.command {
        Commands::Admin { command } => run_admin(store, &config, command, &mut rng),
        command => run_player(store, &config, command, &mut rng),
    }
}

fn run_player(store: Arc<Store>, config: &LuxeConfig, command: Commands, rng: &mut ThreadRng) -> LuxeResult<()> {
    let mut ledger = AccountLedger::open(store.clone(), config.account.clone())?;
    let catalog = GameCatalog::open(store)?;
    let games = &config.games;

    match &command {
        Commands::Login { username } => {
            let account = ledger.login(username, rng)?;
            println!("{} {} | balance {} | level {}", account.avatar, account.username, account.balance, account.level);
            return Ok(());
        }
        Commands::Games => {
            for game in catalog.entries() {
                println!(
                    "{:<14} {:<20} {:?} rtp {:.1}% limits {}-{}{}",
                    game.id,
                    game.name,
                    game.category,
                    game.rtp,
                    game.min_bet,
                    game.max_bet,
                    if game.is_active { "" } else { " (inactive)" }
                );
            }
            return Ok(());
        }
        _ => {}
    }

    if !ledger.is_logged_in() {
        return Err(GameError::NotLoggedIn.into());
    }

    match command {
        Commands::Balance => {}
        Commands::TopUp { amount } => ledger.top_up(amount)?,
        Commands::Slots { theme, bet, spins } => {
            let limits = catalog.limits_for(&format!("{}-slots", theme), games.slots_limits)?;
            let mut engine = SlotsEngine::new(theme, limits, rng.clone()).with_free_spins_award(games.free_spins_award);
            for _ in 0..spins {
                let outcome = engine.spin(&mut ledger, bet)?;
                let line: Vec<&str> = outcome.reels.iter().map(|reel| reel[1]).collect();
                println!(
                    "{} | {:?} | payout {}{}",
                    line.join(" "),
                    outcome.rule,
                    outcome.payout,
                    if outcome.free_spin { " (free spin)" } else { "" }
                );
                if outcome.free_spins_awarded > 0 {
                    println!("Won {} free spins", outcome.free_spins_awarded);
                }
            }
        }
        Commands::Roulette { bets } => {
            let limits = catalog.limits_for("roulette", games.roulette_limits)?;
            let mut engine = RouletteEngine::new(limits, rng.clone());
            for entry in &bets {
                let (bet, stake) = parse_roulette_bet(entry)?;
                engine.place_bet(&mut ledger, bet, stake)?;
            }
            let result = engine.spin(&mut ledger)?;
            println!("Ball landed on {} ({:?})", result.number, result.color);
            for bet in &result.bets {
                let verdict = if bet.won { format!("won {}", bet.payout) } else { "lost".to_string() };
                println!("  {:<6} stake {:<8} {}", bet.bet.to_string(), bet.stake, verdict);
            }
        }
        Commands::Crash { bet, cash_out_at } => {
            let limits = catalog.limits_for("aviator", games.crash_limits)?;
            let mut engine = CrashEngine::new(limits, rng.clone())
                .with_growth_rate(games.crash_growth_rate)
                .with_history_len(games.crash_history_len);
            play_crash(&mut engine, &mut ledger, bet, cash_out_at)?;
        }
        Commands::Mines { bet, mines, reveal } => {
            let limits = catalog.limits_for("mines", games.mines_limits)?;
            let mut engine = MinesEngine::new(limits, rng.clone()).with_house_edge(games.mines_house_edge);
            play_mines(&mut engine, &mut ledger, bet, mines, &reveal)?;
        }
        Commands::Blackjack { bet, moves } => {
            let limits = catalog.limits_for("blackjack", games.blackjack_limits)?;
            let mut engine = BlackjackEngine::new(limits, rng.clone());
            play_blackjack(&mut engine, &mut ledger, bet, &moves)?;
        }
        Commands::Login { .. } | Commands::Games | Commands::Admin { .. } => {}
    }

    if let Some(account) = ledger.account() {
        println!(
            "{} balance {} | level {} ({:.0}% to next) | win rate {}%",
            account.username,
            account.balance,
            account.level,
            ledger.xp_progress(),
            ledger.win_rate()
        );
    }
    Ok(())
}

fn parse_roulette_bet(entry: &str) -> LuxeResult<(RouletteBet, u64)> {
    let (bet, stake) = entry
        .split_once('=')
        .ok_or(GameError::InvalidMove("roulette bets are written BET=STAKE"))?;
    let stake = stake.trim().parse::<u64>().map_err(|_| GameError::InvalidBet)?;
    Ok((bet.parse()?, stake))
}

/// Step the flight in 100ms ticks of simulated time
fn play_crash<W: Wallet + ?Sized>(
    engine: &mut CrashEngine<ThreadRng>,
    wallet: &mut W,
    bet: u64,
    target: f64,
) -> LuxeResult<()> {
    let start = Instant::now();
    engine.start_round(wallet, bet, start)?;
    let mut now = start;
    loop {
        now += Duration::from_millis(100);
        if engine.tick(wallet, now)? == CrashPhase::Crashed {
            break;
        }
        if engine.cashed_out_at().is_none() && engine.current_multiplier(now) >= target {
            let cash_out = engine.cash_out(wallet, now)?;
            println!("Cashed out at {:.2}x for {}", cash_out.multiplier, cash_out.payout);
        }
    }
    if let Some(point) = engine.revealed_crash_point() {
        println!("Crashed at {:.2}x", point);
    }
    if engine.cashed_out_at().is_none() {
        println!("Lost {}", bet);
    }
    Ok(())
}

fn play_mines<W: Wallet + ?Sized>(
    engine: &mut MinesEngine<ThreadRng>,
    wallet: &mut W,
    bet: u64,
    mines: usize,
    cells: &[usize],
) -> LuxeResult<()> {
    engine.start_round(wallet, bet, mines)?;
    for &cell in cells {
        match engine.reveal(wallet, cell)? {
            RevealOutcome::Safe { multiplier, revealed } => {
                println!("Cell {} safe ({} revealed, {:.2}x)", cell, revealed, multiplier);
            }
            RevealOutcome::Mine { .. } => {
                println!("Cell {} was a mine", cell);
                return Ok(());
            }
            RevealOutcome::Cleared { payout, .. } => {
                println!("Board cleared, paid {}", payout);
                return Ok(());
            }
        }
    }
    if engine.revealed_count() > 0 {
        let settlement = engine.cash_out(wallet)?;
        println!("Cashed out {}", settlement.payout);
    } else {
        println!("No cells revealed; the stake stays on the table");
    }
    Ok(())
}

fn play_blackjack<W: Wallet + ?Sized>(
    engine: &mut BlackjackEngine<ThreadRng>,
    wallet: &mut W,
    bet: u64,
    moves: &str,
) -> LuxeResult<()> {
    let mut phase = engine.start_round(wallet, bet)?;
    let mut scripted = moves.chars().filter(|c| !c.is_whitespace());
    while phase == BlackjackPhase::Playing {
        let hand: Vec<String> = engine.player_hand().iter().map(ToString::to_string).collect();
        println!("You: {} ({}) | Dealer shows {}", hand.join(" "), engine.player_total(), engine.visible_dealer_total());
        let next = match scripted.next() {
            Some(c) => c.to_ascii_lowercase(),
            None if moves.is_empty() && engine.player_total() < 17 => 'h',
            None => 's',
        };
        phase = match next {
            'h' => engine.hit(wallet)?,
            'd' => engine.double_down(wallet)?,
            's' => engine.stand()?,
            _ => return Err(GameError::InvalidMove("moves are h, s or d").into()),
        };
    }
    if phase == BlackjackPhase::DealerTurn {
        engine.play_dealer(wallet)?;
    }

    let dealer: Vec<String> = engine.dealer_hand().iter().map(ToString::to_string).collect();
    if let Some(result) = engine.result() {
        println!(
            "{:?}: you {} vs dealer {} ({}) | paid {}",
            result.outcome,
            result.player_total,
            result.dealer_total,
            dealer.join(" "),
            result.settlement.payout
        );
    }
    Ok(())
}

fn run_admin(store: Arc<Store>, config: &LuxeConfig, command: AdminCommands, rng: &mut ThreadRng) -> LuxeResult<()> {
    let mut ledger = AdminLedger::open(store.clone(), rng)?;

    match command {
        AdminCommands::Login { username } => {
            let admin = ledger.login_as_admin(&username)?;
            println!("{} {} ({})", admin.avatar, admin.username, admin.role);
        }
        AdminCommands::Logout => {
            ledger.logout_admin()?;
            println!("Logged out");
        }
        AdminCommands::Stats => {
            let stats = ledger.stats();
            println!("Users: {}", stats.total_users);
            println!("Total balance: {}", stats.total_balance);
            println!("Cashiers: {}", stats.total_cashiers);
            if let Some(last) = stats.last_transaction {
                println!("Last transaction: {:?} {} -> {} ({})", last.kind, last.from_username, last.to_username, last.reason);
            }
        }
        AdminCommands::Transactions { search, kind, issuer, page } => {
            let query = TransactionQuery { search, kind, issuer, page };
            let page = ledger.query_transactions(&query)?;
            for record in &page.items {
                println!(
                    "{} {:<11} {} -> {} {} | {}",
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    format!("{:?}", record.kind),
                    record.from_username,
                    record.to_username,
                    record.amount.map(|a| a.to_string()).unwrap_or_default(),
                    record.reason
                );
            }
            println!("Page {}/{} ({} records)", page.page, page.total_pages, page.total_items);
        }
        AdminCommands::Users { search, role, sort, page } => {
            let query = UserQuery { search, role, sort, page };
            let page = ledger.query_users(&query)?;
            for user in &page.items {
                println!(
                    "{:<12} {:<22} {:<8} balance {:<10} level {:<3} code {}",
                    user.id, user.username, user.role, user.balance, user.level, user.referral_code
                );
            }
            println!("Page {}/{} ({} users)", page.page, page.total_pages, page.total_items);
        }
        AdminCommands::Add { user_id, amount, reason } => {
            print_record(ledger.add_balance(&user_id, amount, reason.as_deref())?);
        }
        AdminCommands::Deduct { user_id, amount, reason } => {
            print_record(ledger.deduct_balance(&user_id, amount, &reason)?);
        }
        AdminCommands::Transfer { user_id, amount, reason } => {
            print_record(ledger.transfer_to_team_member(&user_id, amount, reason.as_deref())?);
        }
        AdminCommands::Reclaim { user_id, amount, reason } => {
            print_record(ledger.deduct_from_team_member(&user_id, amount, &reason)?);
        }
        AdminCommands::Role { user_id, role, reason } => {
            print_record(ledger.change_role(&user_id, role, &reason, rng)?);
        }
        AdminCommands::Team { cashier_id } => {
            for member in ledger.team_members(&cashier_id) {
                println!("{:<12} {:<22} balance {}", member.id, member.username, member.balance);
            }
        }
        AdminCommands::Register { username, email, referral } => {
            let starting_balance = config.account.starting_balance;
            let user = ledger.register_user(&username, &email, referral.as_deref(), starting_balance, rng)?;
            println!("Registered {} ({}) with code {}", user.username, user.id, user.referral_code);
        }
        AdminCommands::ToggleGame { game_id } => {
            let mut catalog = GameCatalog::open(store)?;
            let active = catalog
                .get(&game_id)
                .map(|g| !g.is_active)
                .unwrap_or(true);
            let update = GameUpdate {
                is_active: Some(active),
                ..Default::default()
            };
            let entry = ledger.update_game(&mut catalog, &game_id, &update)?;
            println!("{} is now {}", entry.name, if entry.is_active { "active" } else { "inactive" });
        }
        AdminCommands::SetLimits { game_id, min, max } => {
            let mut catalog = GameCatalog::open(store)?;
            let update = GameUpdate {
                min_bet: Some(min),
                max_bet: Some(max),
                ..Default::default()
            };
            let entry = ledger.update_game(&mut catalog, &game_id, &update)?;
            println!("{} limits {}-{}", entry.name, entry.min_bet, entry.max_bet);
        }
    }
    Ok(())
}

fn print_record(record: &luxeplay::admin::TransactionRecord) {
    println!(
        "{:?} {} -> {} {} | {}",
        record.kind,
        record.from_username,
        record.to_username,
        record.amount.map(|a| a.to_string()).unwrap_or_default(),
        record.reason
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_parse_roulette_bet() {
        assert_eq!(parse_roulette_bet("red=500").unwrap(), (RouletteBet::Red, 500));
        assert_eq!(parse_roulette_bet("17=100").unwrap(), (RouletteBet::Straight(17), 100));
        assert!(parse_roulette_bet("red").is_err());
        assert!(parse_roulette_bet("purple=5").is_err());
    }

    #[test]
    fn test_cli_parses_admin_commands() {
        let cli = Cli::try_parse_from(["luxeplay", "admin", "role", "user-001", "cashier", "--reason", "promotion"]).unwrap();
        match cli.command {
            Commands::Admin {
                command: AdminCommands::Role { role, reason, .. },
            } => {
                assert_eq!(role, Role::Cashier);
                assert_eq!(reason, "promotion");
            }
            _ => panic!("Expected admin role command"),
        }
    }
}
