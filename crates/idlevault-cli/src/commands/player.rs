use clap::Subcommand;

use super::{open, print_json, CliResult, PlayerArgs};

#[derive(Subcommand)]
pub enum PlayerAction {
    /// Print the stored player record as JSON
    Show,
}

pub fn run(args: &PlayerArgs, action: PlayerAction) -> CliResult {
    let ctx = open(args)?;
    match action {
        PlayerAction::Show => print_json(ctx.session.record()),
    }
}
