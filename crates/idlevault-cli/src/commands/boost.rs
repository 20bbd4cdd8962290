use clap::Subcommand;
use idlevault_core::now_ms;

use super::{open, print_json, CliResult, PlayerArgs};

#[derive(Subcommand)]
pub enum BoostAction {
    /// List the boost catalog and the boosts currently running
    List,
    /// Buy and start a boost
    Activate {
        /// Boost id (e.g. "turbo")
        id: String,
    },
}

pub fn run(args: &PlayerArgs, action: BoostAction) -> CliResult {
    let mut ctx = open(args)?;
    let now = now_ms();
    match action {
        BoostAction::List => {
            let session = &ctx.session;
            print_json(&serde_json::json!({
                "catalog": session.economy().config().boosts,
                "active": session.economy().active_boosts(session.record(), now),
                "effective_rate": session.economy().effective_rate(session.record(), now),
            }))
        }
        BoostAction::Activate { id } => print_json(&ctx.session.activate_boost(&id, now)?),
    }
}
