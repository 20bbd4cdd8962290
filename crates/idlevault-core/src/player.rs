//! The per-user player record.
//!
//! A record is a plain value: economy operations take `&PlayerRecord` and
//! hand back a new record, so there is no shared mutable game state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of a withdrawal request. Settlement happens outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "completed" => Some(WithdrawalStatus::Completed),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: String,
    pub amount: f64,
    pub destination: String,
    pub network: String,
    pub status: WithdrawalStatus,
    pub requested_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub balance: f64,
    /// Derived from production upgrade levels; cached for display and accrual.
    #[serde(default)]
    pub profit_per_hour: f64,
    /// Vault checkpoint: passive income up to here is already in `balance`.
    pub last_claim_ms: u64,
    #[serde(default)]
    pub upgrades: BTreeMap<String, u32>,
    pub energy: u32,
    pub max_energy: u32,
    pub tap_value: u32,
    /// Energy regen checkpoint.
    pub last_energy_ms: u64,
    #[serde(default)]
    pub daily_streak: u32,
    #[serde(default)]
    pub last_daily_claim_ms: Option<u64>,
    /// Boost id -> expiry (epoch ms).
    #[serde(default)]
    pub boosts: BTreeMap<String, u64>,
    #[serde(default)]
    pub transactions: Vec<WithdrawalRequest>,
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub referral_count: u32,
    #[serde(default)]
    pub created_at_ms: u64,
}

impl PlayerRecord {
    pub fn level(&self, upgrade_id: &str) -> u32 {
        self.upgrades.get(upgrade_id).copied().unwrap_or(0)
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.balance >= cost
    }

    pub fn pending_withdrawals(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.transactions
            .iter()
            .filter(|t| t.status == WithdrawalStatus::Pending)
    }
}
