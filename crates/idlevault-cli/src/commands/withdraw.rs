use clap::Subcommand;
use idlevault_core::{now_ms, Database, WithdrawalSink};

use super::{open, print_json, CliResult, PlayerArgs};

#[derive(Subcommand)]
pub enum WithdrawAction {
    /// Request a payout; the amount is debited immediately
    Request {
        #[arg(long)]
        amount: f64,
        /// Wallet address
        #[arg(long)]
        destination: String,
        /// Payout network (e.g. "TON")
        #[arg(long)]
        network: String,
    },
    /// List every pending request awaiting processing
    Pending,
}

pub fn run(args: &PlayerArgs, action: WithdrawAction) -> CliResult {
    match action {
        WithdrawAction::Request {
            amount,
            destination,
            network,
        } => {
            let mut ctx = open(args)?;
            let (request, event) =
                ctx.session
                    .request_withdrawal(amount, &destination, &network, now_ms())?;
            print_json(&serde_json::json!({ "request": request, "event": event }))
        }
        WithdrawAction::Pending => {
            let db = Database::open()?;
            let pending: Vec<_> = db
                .pending_withdrawals()?
                .into_iter()
                .map(|(user_id, request)| serde_json::json!({ "user_id": user_id, "request": request }))
                .collect();
            print_json(&pending)
        }
    }
}
