//! Idle economy rules.
//!
//! Every operation here is a pure function of a [`PlayerRecord`] and the
//! current time (epoch milliseconds): it returns a new record and an
//! [`Event`], or a [`GameError`] and no change at all. Persistence and
//! scheduling live in [`crate::storage`] and [`crate::ticker`].

pub mod accrual;
pub mod boost;
pub mod cost;
pub mod daily;
mod referral;
pub mod tap;
pub mod upgrades;
mod withdraw;

pub use accrual::{accrue, accrue_boosted, Accrual, BoostWindow};
pub use boost::{ActiveBoost, BoostDef};
pub use cost::CostCurve;
pub use daily::{DailyRewardConfig, DailyStatus, SlotState, DAILY_SLOTS};
pub use upgrades::{UpgradeDef, UpgradeEffect, UpgradeOffer};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, ValidationError};
use crate::events::{at, Event};
use crate::player::PlayerRecord;

/// Tunable economy constants.
///
/// Client builds disagreed on several of these (vault capacity, bonus sizes),
/// so none of them are hard-coded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_vault_capacity_hours")]
    pub vault_capacity_hours: f64,
    /// Smallest vault amount an explicit claim accepts.
    #[serde(default = "default_min_claim_amount")]
    pub min_claim_amount: f64,
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
    /// Extra starting balance for a player who arrived through a referral.
    #[serde(default = "default_invitee_bonus")]
    pub invitee_bonus: f64,
    /// Paid to the referrer for each completed signup.
    #[serde(default = "default_referrer_bonus")]
    pub referrer_bonus: f64,
    #[serde(default = "default_base_tap_value")]
    pub base_tap_value: u32,
    #[serde(default = "default_base_max_energy")]
    pub base_max_energy: u32,
    /// Milliseconds per regenerated energy point.
    #[serde(default = "default_energy_regen_interval_ms")]
    pub energy_regen_interval_ms: u64,
    #[serde(default = "default_min_withdrawal")]
    pub min_withdrawal: f64,
    #[serde(default = "default_withdrawal_networks")]
    pub withdrawal_networks: Vec<String>,
    #[serde(default)]
    pub daily: DailyRewardConfig,
    #[serde(default = "upgrades::default_catalog")]
    pub upgrades: Vec<UpgradeDef>,
    #[serde(default = "boost::default_boosts")]
    pub boosts: Vec<BoostDef>,
}

fn default_vault_capacity_hours() -> f64 {
    4.0
}
fn default_min_claim_amount() -> f64 {
    1.0
}
fn default_starting_balance() -> f64 {
    1000.0
}
fn default_invitee_bonus() -> f64 {
    100.0
}
fn default_referrer_bonus() -> f64 {
    1000.0
}
fn default_base_tap_value() -> u32 {
    1
}
fn default_base_max_energy() -> u32 {
    1000
}
fn default_energy_regen_interval_ms() -> u64 {
    1000
}
fn default_min_withdrawal() -> f64 {
    1000.0
}
fn default_withdrawal_networks() -> Vec<String> {
    vec!["TON".into(), "TRC20".into(), "BEP20".into()]
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            vault_capacity_hours: default_vault_capacity_hours(),
            min_claim_amount: default_min_claim_amount(),
            starting_balance: default_starting_balance(),
            invitee_bonus: default_invitee_bonus(),
            referrer_bonus: default_referrer_bonus(),
            base_tap_value: default_base_tap_value(),
            base_max_energy: default_base_max_energy(),
            energy_regen_interval_ms: default_energy_regen_interval_ms(),
            min_withdrawal: default_min_withdrawal(),
            withdrawal_networks: default_withdrawal_networks(),
            daily: DailyRewardConfig::default(),
            upgrades: upgrades::default_catalog(),
            boosts: boost::default_boosts(),
        }
    }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a non-negative number, got {value}")))
    }
}

impl EconomyConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.vault_capacity_hours.is_finite() && self.vault_capacity_hours > 0.0) {
            return Err(invalid(
                "economy.vault_capacity_hours",
                format!("must be positive, got {}", self.vault_capacity_hours),
            ));
        }
        non_negative("economy.min_claim_amount", self.min_claim_amount)?;
        non_negative("economy.starting_balance", self.starting_balance)?;
        non_negative("economy.invitee_bonus", self.invitee_bonus)?;
        non_negative("economy.referrer_bonus", self.referrer_bonus)?;
        non_negative("economy.min_withdrawal", self.min_withdrawal)?;
        if self.energy_regen_interval_ms == 0 {
            return Err(invalid("economy.energy_regen_interval_ms", "must be at least 1"));
        }
        if self.withdrawal_networks.is_empty() {
            return Err(ValidationError::EmptyCollection("economy.withdrawal_networks".into()));
        }
        if self.daily.claim_interval_hours == 0 || self.daily.grace_hours < self.daily.claim_interval_hours {
            return Err(invalid(
                "economy.daily",
                "grace_hours must be at least claim_interval_hours, which must be non-zero",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for u in &self.upgrades {
            if !seen.insert(u.id.as_str()) {
                return Err(invalid("economy.upgrades", format!("duplicate upgrade id '{}'", u.id)));
            }
            u.curve.validate(&format!("economy.upgrades.{}", u.id))?;
            if let UpgradeEffect::Production { base_profit } = u.effect {
                non_negative(&format!("economy.upgrades.{}.base_profit", u.id), base_profit)?;
            }
        }
        let mut seen = std::collections::HashSet::new();
        for b in &self.boosts {
            if !seen.insert(b.id.as_str()) {
                return Err(invalid("economy.boosts", format!("duplicate boost id '{}'", b.id)));
            }
            if !(b.multiplier.is_finite() && b.multiplier >= 1.0) {
                return Err(invalid(
                    format!("economy.boosts.{}.multiplier", b.id),
                    format!("must be at least 1, got {}", b.multiplier),
                ));
            }
            if b.duration_secs == 0 {
                return Err(invalid(format!("economy.boosts.{}.duration_secs", b.id), "must be at least 1"));
            }
        }
        Ok(())
    }
}

/// Derived state handed to the presentation layer on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub user_id: String,
    pub balance: f64,
    pub profit_per_hour: f64,
    pub effective_rate: f64,
    pub vault: Accrual,
    pub energy: u32,
    pub max_energy: u32,
    pub tap_value: u32,
    pub daily: DailyStatus,
    pub boosts: Vec<ActiveBoost>,
    pub at_ms: u64,
}

/// The rule set, parameterised by an [`EconomyConfig`].
#[derive(Debug, Clone)]
pub struct Economy {
    config: EconomyConfig,
}

impl Economy {
    pub fn new(config: EconomyConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Record for a user seen for the first time.
    pub fn new_player(
        &self,
        user_id: &str,
        display_name: &str,
        referred_by: Option<&str>,
        now_ms: u64,
    ) -> PlayerRecord {
        let referred_by = self.valid_referrer(user_id, referred_by).map(str::to_string);
        let bonus = if referred_by.is_some() {
            self.config.invitee_bonus
        } else {
            0.0
        };
        let mut record = PlayerRecord {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            avatar_url: None,
            balance: self.config.starting_balance + bonus,
            profit_per_hour: 0.0,
            last_claim_ms: now_ms,
            upgrades: self.starting_levels(),
            energy: 0,
            max_energy: 0,
            tap_value: 0,
            last_energy_ms: now_ms,
            daily_streak: 0,
            last_daily_claim_ms: None,
            boosts: Default::default(),
            transactions: Vec::new(),
            referred_by,
            referral_count: 0,
            created_at_ms: now_ms,
        };
        self.refresh_derived(&mut record);
        record.energy = record.max_energy;
        record
    }

    /// Bring a stored record in line with the current catalog: missing
    /// upgrade entries get their starting level and derived fields are
    /// recomputed. Levels are never lowered.
    pub fn normalize(&self, record: &PlayerRecord) -> PlayerRecord {
        let mut next = record.clone();
        for (id, level) in self.starting_levels() {
            next.upgrades.entry(id).or_insert(level);
        }
        if next.balance < 0.0 || !next.balance.is_finite() {
            tracing::warn!(user_id = %next.user_id, balance = next.balance, "clamping invalid stored balance");
            next.balance = 0.0;
        }
        self.refresh_derived(&mut next);
        next
    }

    pub fn player_created(&self, record: &PlayerRecord) -> Event {
        Event::PlayerCreated {
            user_id: record.user_id.clone(),
            balance: record.balance,
            referred_by: record.referred_by.clone(),
            at: at(record.created_at_ms),
        }
    }

    /// Vault contents at `now_ms`, including any boosts.
    pub fn vault(&self, record: &PlayerRecord, now_ms: u64) -> Accrual {
        accrue_boosted(
            record.profit_per_hour,
            self.config.vault_capacity_hours,
            record.last_claim_ms,
            now_ms,
            &self.boost_windows(record),
        )
    }

    /// Credit whatever the vault holds and move the checkpoint to `now_ms`.
    ///
    /// The checkpoint never moves backwards, so a clock that jumps back
    /// cannot make already-credited time accrue twice.
    pub(crate) fn settle_vault(&self, record: &PlayerRecord, now_ms: u64) -> PlayerRecord {
        let accrued = self.vault(record, now_ms).accumulated;
        let mut next = record.clone();
        next.balance += accrued;
        next.last_claim_ms = record.last_claim_ms.max(now_ms);
        let checkpoint = next.last_claim_ms;
        next.boosts.retain(|_, expiry| *expiry > checkpoint);
        next
    }

    pub fn claim_vault(
        &self,
        record: &PlayerRecord,
        now_ms: u64,
    ) -> Result<(PlayerRecord, Event), GameError> {
        let vault = self.vault(record, now_ms);
        if vault.accumulated < self.config.min_claim_amount || vault.accumulated <= 0.0 {
            return Err(GameError::NothingToClaim {
                accumulated: vault.accumulated,
                minimum: self.config.min_claim_amount,
            });
        }
        let next = self.settle_vault(record, now_ms);

        tracing::info!(user_id = %next.user_id, amount = vault.accumulated, "vault claimed");
        let event = Event::VaultClaimed {
            amount: vault.accumulated,
            balance: next.balance,
            at: at(now_ms),
        };
        Ok((next, event))
    }

    pub fn snapshot(&self, record: &PlayerRecord, now_ms: u64) -> Snapshot {
        Snapshot {
            user_id: record.user_id.clone(),
            balance: record.balance,
            profit_per_hour: record.profit_per_hour,
            effective_rate: self.effective_rate(record, now_ms),
            vault: self.vault(record, now_ms),
            energy: self.current_energy(record, now_ms),
            max_energy: record.max_energy,
            tap_value: record.tap_value,
            daily: self.daily_status(record, now_ms),
            boosts: self.active_boosts(record, now_ms),
            at_ms: now_ms,
        }
    }
}
