use idlevault_core::now_ms;

use super::{open, print_json, CliResult, PlayerArgs};

pub fn run(args: &PlayerArgs, count: u32) -> CliResult {
    let mut ctx = open(args)?;
    print_json(&ctx.session.tap(count, now_ms())?)
}
