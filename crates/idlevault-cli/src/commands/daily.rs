use clap::Subcommand;
use idlevault_core::now_ms;

use super::{open, print_json, CliResult, PlayerArgs};

#[derive(Subcommand)]
pub enum DailyAction {
    /// Show the seven-day streak and whether today's reward is ready
    Status,
    /// Claim today's reward
    Claim,
}

pub fn run(args: &PlayerArgs, action: DailyAction) -> CliResult {
    let mut ctx = open(args)?;
    let now = now_ms();
    match action {
        DailyAction::Status => {
            let session = &ctx.session;
            print_json(&session.economy().daily_status(session.record(), now))
        }
        DailyAction::Claim => print_json(&ctx.session.claim_daily(now)?),
    }
}
