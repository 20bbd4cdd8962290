use clap::Subcommand;
use idlevault_core::now_ms;

use super::{open, print_json, CliResult, PlayerArgs};

#[derive(Subcommand)]
pub enum UpgradeAction {
    /// List upgrades with current level and next cost
    List,
    /// Buy the next level of an upgrade
    Buy {
        /// Upgrade id (e.g. "gpu-miner")
        id: String,
    },
}

pub fn run(args: &PlayerArgs, action: UpgradeAction) -> CliResult {
    let mut ctx = open(args)?;
    match action {
        UpgradeAction::List => print_json(&ctx.session.upgrade_offers()),
        UpgradeAction::Buy { id } => print_json(&ctx.session.buy_upgrade(&id, now_ms())?),
    }
}
