//! # IdleVault Core Library
//!
//! Game rules and persistence for an idle "crypto vault" clicker. A player
//! earns passive income into a capped vault, claims it, taps for energy-limited
//! income, buys upgrades on a geometric cost curve, collects a seven-day streak
//! reward, activates timed boosts and queues withdrawals. The `idlevault-cli`
//! binary is a thin shell over this crate.
//!
//! ## Architecture
//!
//! - **Economy**: pure functions from `(&PlayerRecord, now)` to a new record
//!   plus an [`Event`]; all time arithmetic uses caller-supplied epoch ms
//! - **Storage**: the [`PlayerStore`] seam with a SQLite [`Database`] and an
//!   in-process [`MemoryStore`], plus TOML-based [`Config`]
//! - **Session**: identity resolution, referral crediting and write-back
//! - **Ticker**: periodic snapshot recomputation on a tokio interval
//!
//! ## Key Components
//!
//! - [`Economy`]: the rule set, parameterised by [`EconomyConfig`]
//! - [`Session`]: one player's live state over any store
//! - [`Ticker`]: emits a [`Snapshot`] every period until stopped

pub mod economy;
pub mod error;
pub mod events;
pub mod player;
pub mod session;
pub mod storage;
pub mod ticker;

pub use economy::{Economy, EconomyConfig, Snapshot};
pub use error::{ConfigError, CoreError, GameError, StorageError, ValidationError};
pub use events::Event;
pub use player::{PlayerRecord, WithdrawalRequest, WithdrawalStatus};
pub use session::{Identity, Session};
pub use storage::{Config, Database, LeaderboardEntry, MemoryStore, PlayerStore, WithdrawalSink};
pub use ticker::{now_ms, Ticker};
