use idlevault_core::{Config, Database, PlayerStore};

use super::{print_json, CliResult};

pub fn run(limit: Option<usize>) -> CliResult {
    let limit = match limit {
        Some(limit) => limit,
        None => Config::load()?.session.leaderboard_size,
    };
    let db = Database::open()?;
    print_json(&db.leaderboard(limit)?)
}
