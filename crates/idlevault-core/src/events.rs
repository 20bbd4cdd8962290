use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every accepted state change in a session produces an Event.
/// The presentation layer prints them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PlayerCreated {
        user_id: String,
        balance: f64,
        referred_by: Option<String>,
        at: DateTime<Utc>,
    },
    /// Referrer received the bonus for a completed signup.
    ReferralCredited {
        referrer_id: String,
        invitee_id: String,
        bonus: f64,
        referral_count: u32,
        at: DateTime<Utc>,
    },
    VaultClaimed {
        amount: f64,
        balance: f64,
        at: DateTime<Utc>,
    },
    UpgradePurchased {
        upgrade_id: String,
        level: u32,
        cost: u64,
        profit_per_hour: f64,
        balance: f64,
        at: DateTime<Utc>,
    },
    Tapped {
        taps: u32,
        earned: f64,
        energy: u32,
        balance: f64,
        at: DateTime<Utc>,
    },
    DailyRewardClaimed {
        streak: u32,
        slot: usize,
        reward: u64,
        balance: f64,
        at: DateTime<Utc>,
    },
    BoostActivated {
        boost_id: String,
        multiplier: f64,
        expires_at_ms: u64,
        balance: f64,
        at: DateTime<Utc>,
    },
    WithdrawalRequested {
        request_id: String,
        amount: f64,
        network: String,
        balance: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Replace the post-action balance the event reports.
    pub(crate) fn with_balance(mut self, committed: f64) -> Self {
        match &mut self {
            Event::PlayerCreated { balance, .. }
            | Event::VaultClaimed { balance, .. }
            | Event::UpgradePurchased { balance, .. }
            | Event::Tapped { balance, .. }
            | Event::DailyRewardClaimed { balance, .. }
            | Event::BoostActivated { balance, .. }
            | Event::WithdrawalRequested { balance, .. } => *balance = committed,
            Event::ReferralCredited { .. } => {}
        }
        self
    }
}

/// Convert an epoch-millisecond clock reading into an event timestamp.
pub(crate) fn at(now_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default()
}
