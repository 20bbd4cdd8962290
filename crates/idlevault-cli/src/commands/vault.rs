use clap::Subcommand;
use idlevault_core::now_ms;

use super::{open, print_json, CliResult, PlayerArgs};

#[derive(Subcommand)]
pub enum VaultAction {
    /// Show accumulated passive income
    Status,
    /// Move the vault contents into the balance
    Claim,
}

pub fn run(args: &PlayerArgs, action: VaultAction) -> CliResult {
    let mut ctx = open(args)?;
    let now = now_ms();
    match action {
        VaultAction::Status => {
            let session = &ctx.session;
            print_json(&session.economy().vault(session.record(), now))
        }
        VaultAction::Claim => print_json(&ctx.session.claim_vault(now)?),
    }
}
