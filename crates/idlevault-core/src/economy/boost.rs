//! Time-limited multipliers on passive income.

use serde::{Deserialize, Serialize};

use super::accrual::BoostWindow;
use super::Economy;
use crate::error::GameError;
use crate::events::{at, Event};
use crate::player::PlayerRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostDef {
    pub id: String,
    pub name: String,
    pub multiplier: f64,
    pub duration_secs: u64,
    pub cost: u64,
}

pub fn default_boosts() -> Vec<BoostDef> {
    vec![
        BoostDef {
            id: "turbo".into(),
            name: "Turbo".into(),
            multiplier: 2.0,
            duration_secs: 3600,
            cost: 500,
        },
        BoostDef {
            id: "overclock".into(),
            name: "Overclock".into(),
            multiplier: 3.0,
            duration_secs: 1800,
            cost: 2500,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBoost {
    pub id: String,
    pub multiplier: f64,
    pub expires_at_ms: u64,
    pub remaining_secs: u64,
}

impl Economy {
    pub fn boost(&self, id: &str) -> Option<&BoostDef> {
        self.config.boosts.iter().find(|b| b.id == id)
    }

    /// Boost windows that can still affect unclaimed vault income.
    /// Ids no longer in the catalog contribute nothing.
    pub(crate) fn boost_windows(&self, record: &PlayerRecord) -> Vec<BoostWindow> {
        record
            .boosts
            .iter()
            .filter(|(_, expiry)| **expiry > record.last_claim_ms)
            .filter_map(|(id, expiry)| {
                self.boost(id).map(|def| BoostWindow {
                    expires_at_ms: *expiry,
                    multiplier: def.multiplier,
                })
            })
            .collect()
    }

    pub fn active_boosts(&self, record: &PlayerRecord, now_ms: u64) -> Vec<ActiveBoost> {
        record
            .boosts
            .iter()
            .filter(|(_, expiry)| **expiry > now_ms)
            .filter_map(|(id, expiry)| {
                let def = self.boost(id)?;
                Some(ActiveBoost {
                    id: id.clone(),
                    multiplier: def.multiplier,
                    expires_at_ms: *expiry,
                    remaining_secs: (expiry - now_ms).div_ceil(1000),
                })
            })
            .collect()
    }

    /// Hourly income rate in effect at `now_ms`.
    pub fn effective_rate(&self, record: &PlayerRecord, now_ms: u64) -> f64 {
        let multiplier: f64 = self
            .active_boosts(record, now_ms)
            .iter()
            .map(|b| b.multiplier)
            .product();
        record.profit_per_hour * multiplier
    }

    /// Buy and start a boost.
    ///
    /// The vault is settled first, so a new boost window always begins at the
    /// checkpoint and never applies to income earned before it was bought.
    pub fn activate_boost(
        &self,
        record: &PlayerRecord,
        id: &str,
        now_ms: u64,
    ) -> Result<(PlayerRecord, Event), GameError> {
        let def = self
            .boost(id)
            .ok_or_else(|| GameError::UnknownBoost(id.to_string()))?;
        if let Some(expiry) = record.boosts.get(id).filter(|e| **e > now_ms) {
            return Err(GameError::BoostAlreadyActive {
                id: id.to_string(),
                remaining_secs: (expiry - now_ms).div_ceil(1000),
            });
        }
        if !record.can_afford(def.cost as f64) {
            return Err(GameError::InsufficientBalance {
                required: def.cost as f64,
                available: record.balance,
            });
        }

        let mut next = self.settle_vault(record, now_ms);
        next.balance -= def.cost as f64;
        let expires_at_ms = now_ms.saturating_add(def.duration_secs.saturating_mul(1000));
        next.boosts.insert(id.to_string(), expires_at_ms);

        tracing::info!(user_id = %next.user_id, boost = id, expires_at_ms, "boost activated");
        let event = Event::BoostActivated {
            boost_id: id.to_string(),
            multiplier: def.multiplier,
            expires_at_ms,
            balance: next.balance,
            at: at(now_ms),
        };
        Ok((next, event))
    }
}
