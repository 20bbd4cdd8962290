use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::PlayerArgs;

#[derive(Parser)]
#[command(name = "idlevault-cli", version, about = "IdleVault CLI")]
struct Cli {
    #[command(flatten)]
    player: PlayerArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Player record
    Player {
        #[command(subcommand)]
        action: commands::player::PlayerAction,
    },
    /// Passive income vault
    Vault {
        #[command(subcommand)]
        action: commands::vault::VaultAction,
    },
    /// Upgrade catalog and purchases
    Upgrade {
        #[command(subcommand)]
        action: commands::upgrade::UpgradeAction,
    },
    /// Spend energy for instant income
    Tap {
        /// Number of taps
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Seven-day login reward
    Daily {
        #[command(subcommand)]
        action: commands::daily::DailyAction,
    },
    /// Timed production multipliers
    Boost {
        #[command(subcommand)]
        action: commands::boost::BoostAction,
    },
    /// Payout requests
    Withdraw {
        #[command(subcommand)]
        action: commands::withdraw::WithdrawAction,
    },
    /// Richest players
    Leaderboard {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Stream live snapshots as JSON lines
    Watch {
        /// Stop after this many snapshots
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let player = &cli.player;
    let result = match cli.command {
        Commands::Player { action } => commands::player::run(player, action),
        Commands::Vault { action } => commands::vault::run(player, action),
        Commands::Upgrade { action } => commands::upgrade::run(player, action),
        Commands::Tap { count } => commands::tap::run(player, count),
        Commands::Daily { action } => commands::daily::run(player, action),
        Commands::Boost { action } => commands::boost::run(player, action),
        Commands::Withdraw { action } => commands::withdraw::run(player, action),
        Commands::Leaderboard { limit } => commands::leaderboard::run(limit),
        Commands::Watch { ticks } => commands::watch::run(player, ticks),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
