//! Upgrade catalog and level-derived stats.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::cost::CostCurve;
use super::Economy;
use crate::error::GameError;
use crate::events::{at, Event};
use crate::player::PlayerRecord;

/// What owning levels of an upgrade does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpgradeEffect {
    /// Passive income per hour.
    Production { base_profit: f64 },
    /// Extra currency per tap.
    TapValue { per_level: u32 },
    /// Extra energy capacity.
    EnergyCap { per_level: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    /// Level every new player starts with.
    #[serde(default)]
    pub starting_level: u32,
    pub curve: CostCurve,
    pub effect: UpgradeEffect,
}

impl UpgradeDef {
    fn production(id: &str, name: &str, base_cost: f64, base_profit: f64, starting_level: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            curve: CostCurve {
                base_cost,
                growth: 1.8,
            },
            effect: UpgradeEffect::Production { base_profit },
            starting_level,
        }
    }

    /// Income per hour contributed at `level`.
    ///
    /// Each level past the first adds a 10% bonus on top of the linear term.
    pub fn profit_at(&self, level: u32) -> f64 {
        match self.effect {
            UpgradeEffect::Production { base_profit } if level > 0 => {
                let l = f64::from(level);
                base_profit * l * (1.0 + (l - 1.0) * 0.1)
            }
            _ => 0.0,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.effect, UpgradeEffect::Production { .. })
    }
}

pub fn default_catalog() -> Vec<UpgradeDef> {
    vec![
        UpgradeDef::production("gpu-miner", "GPU Miner", 50.0, 5.0, 1),
        UpgradeDef::production("asic-rig", "ASIC Rig", 500.0, 25.0, 0),
        UpgradeDef::production("data-center", "Data Center", 5000.0, 150.0, 0),
        UpgradeDef::production("quantum-comp", "Quantum Comp", 50000.0, 1000.0, 0),
        UpgradeDef {
            id: "multitap".into(),
            name: "Multitap".into(),
            curve: CostCurve {
                base_cost: 200.0,
                growth: 1.5,
            },
            effect: UpgradeEffect::TapValue { per_level: 1 },
            starting_level: 0,
        },
        UpgradeDef {
            id: "energy-limit".into(),
            name: "Energy Limit".into(),
            curve: CostCurve {
                base_cost: 250.0,
                growth: 1.6,
            },
            effect: UpgradeEffect::EnergyCap { per_level: 500 },
            starting_level: 0,
        },
    ]
}

/// Catalog row for display: current level, next price, current contribution.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeOffer {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub next_cost: u64,
    pub profit_per_hour: f64,
    pub affordable: bool,
}

impl Economy {
    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.config.upgrades.iter().find(|u| u.id == id)
    }

    pub fn starting_levels(&self) -> BTreeMap<String, u32> {
        self.config
            .upgrades
            .iter()
            .map(|u| (u.id.clone(), u.starting_level))
            .collect()
    }

    /// Total passive income per hour for the given levels.
    /// Levels for ids missing from the catalog are ignored.
    pub fn profit_per_hour(&self, levels: &BTreeMap<String, u32>) -> f64 {
        self.config
            .upgrades
            .iter()
            .map(|u| u.profit_at(levels.get(&u.id).copied().unwrap_or(0)))
            .sum()
    }

    pub fn tap_value(&self, levels: &BTreeMap<String, u32>) -> u32 {
        self.config.base_tap_value.saturating_add(self.sum_effect(levels, |e| match e {
            UpgradeEffect::TapValue { per_level } => Some(*per_level),
            _ => None,
        }))
    }

    pub fn max_energy(&self, levels: &BTreeMap<String, u32>) -> u32 {
        self.config.base_max_energy.saturating_add(self.sum_effect(levels, |e| match e {
            UpgradeEffect::EnergyCap { per_level } => Some(*per_level),
            _ => None,
        }))
    }

    fn sum_effect(
        &self,
        levels: &BTreeMap<String, u32>,
        per_level: impl Fn(&UpgradeEffect) -> Option<u32>,
    ) -> u32 {
        self.config
            .upgrades
            .iter()
            .filter_map(|u| {
                let step = per_level(&u.effect)?;
                Some(step.saturating_mul(levels.get(&u.id).copied().unwrap_or(0)))
            })
            .fold(0u32, u32::saturating_add)
    }

    pub fn upgrade_offers(&self, record: &PlayerRecord) -> Vec<UpgradeOffer> {
        self.config
            .upgrades
            .iter()
            .map(|u| {
                let level = record.level(&u.id);
                let next_cost = u.curve.cost(level);
                UpgradeOffer {
                    id: u.id.clone(),
                    name: u.name.clone(),
                    level,
                    next_cost,
                    profit_per_hour: u.profit_at(level),
                    affordable: record.can_afford(next_cost as f64),
                }
            })
            .collect()
    }

    /// Buy one level of `id`.
    ///
    /// Affordability is checked against the balance as it stands; the vault is
    /// only settled once the purchase is accepted, so income already earned at
    /// the old rate is credited before the rate changes.
    pub fn buy_upgrade(
        &self,
        record: &PlayerRecord,
        id: &str,
        now_ms: u64,
    ) -> Result<(PlayerRecord, Event), GameError> {
        let def = self
            .upgrade(id)
            .ok_or_else(|| GameError::UnknownUpgrade(id.to_string()))?;
        let level = record.level(id);
        let cost = def.curve.cost(level);
        if !record.can_afford(cost as f64) {
            return Err(GameError::InsufficientBalance {
                required: cost as f64,
                available: record.balance,
            });
        }

        let mut next = if def.is_production() {
            self.settle_vault(record, now_ms)
        } else {
            record.clone()
        };
        next.balance -= cost as f64;
        let new_level = level.saturating_add(1);
        next.upgrades.insert(id.to_string(), new_level);
        // Energy must settle at the old cap before the cap moves.
        next = self.settle_energy(&next, now_ms);
        self.refresh_derived(&mut next);

        tracing::info!(user_id = %next.user_id, upgrade = id, level = new_level, cost, "upgrade purchased");
        let event = Event::UpgradePurchased {
            upgrade_id: id.to_string(),
            level: new_level,
            cost,
            profit_per_hour: next.profit_per_hour,
            balance: next.balance,
            at: at(now_ms),
        };
        Ok((next, event))
    }

    /// Recompute every field that is a pure function of upgrade levels.
    pub(crate) fn refresh_derived(&self, record: &mut PlayerRecord) {
        record.profit_per_hour = self.profit_per_hour(&record.upgrades);
        record.tap_value = self.tap_value(&record.upgrades);
        record.max_energy = self.max_energy(&record.upgrades);
        record.energy = record.energy.min(record.max_energy);
    }
}
