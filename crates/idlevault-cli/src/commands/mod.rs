pub mod boost;
pub mod config;
pub mod daily;
pub mod leaderboard;
pub mod player;
pub mod tap;
pub mod upgrade;
pub mod vault;
pub mod watch;
pub mod withdraw;

use clap::Args;
use idlevault_core::{now_ms, Config, Database, Economy, Identity, Session};
use serde::Serialize;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Identity flags shared by every player command.
#[derive(Args, Debug, Clone, Default)]
pub struct PlayerArgs {
    /// Player id
    #[arg(long, global = true, env = "IDLEVAULT_USER_ID")]
    pub user: Option<String>,
    /// Display name, refreshed on every run
    #[arg(long, global = true)]
    pub name: Option<String>,
    /// Avatar URL
    #[arg(long, global = true)]
    pub avatar: Option<String>,
    /// Id of the player who invited you (first run only)
    #[arg(long, global = true)]
    pub referrer: Option<String>,
}

impl PlayerArgs {
    pub fn identity(&self) -> Option<Identity> {
        let user = self.user.as_deref()?;
        let mut identity = Identity::new(user);
        if let Some(name) = &self.name {
            identity = identity.with_display_name(name);
        }
        if let Some(avatar) = &self.avatar {
            identity = identity.with_avatar_url(avatar);
        }
        if let Some(referrer) = &self.referrer {
            identity = identity.with_referrer(referrer);
        }
        Some(identity)
    }
}

/// Everything a player command needs: loaded config and a started session.
pub struct Context {
    pub config: Config,
    pub session: Session<Database>,
}

pub fn open(args: &PlayerArgs) -> CliResult<Context> {
    let config = Config::load()?;
    let economy = Economy::new(config.economy.clone())?;
    let db = Database::open()?;
    let (session, events) = Session::start(db, economy, args.identity(), now_ms())?;
    for event in &events {
        tracing::info!(event = %serde_json::to_string(event)?, "session start");
    }
    Ok(Context { config, session })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
