//! Daily reward streak.
//!
//! Seven slots, each `locked`, `claimable` or `claimed`. A claim is allowed
//! once `claim_interval_hours` have passed since the previous one; if more
//! than `grace_hours` pass, the streak lapses and the next claim starts over
//! at slot one.

use serde::{Deserialize, Serialize};

use super::Economy;
use crate::error::GameError;
use crate::events::{at, Event};
use crate::player::PlayerRecord;

pub const DAILY_SLOTS: usize = 7;

const HOUR_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Locked,
    Claimable,
    Claimed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRewardConfig {
    #[serde(default = "default_rewards")]
    pub rewards: [u64; DAILY_SLOTS],
    #[serde(default = "default_claim_interval_hours")]
    pub claim_interval_hours: u64,
    #[serde(default = "default_grace_hours")]
    pub grace_hours: u64,
}

fn default_rewards() -> [u64; DAILY_SLOTS] {
    [500, 1_000, 2_500, 5_000, 15_000, 25_000, 100_000]
}
fn default_claim_interval_hours() -> u64 {
    24
}
fn default_grace_hours() -> u64 {
    48
}

impl Default for DailyRewardConfig {
    fn default() -> Self {
        Self {
            rewards: default_rewards(),
            claim_interval_hours: default_claim_interval_hours(),
            grace_hours: default_grace_hours(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatus {
    /// Streak after applying any lapse.
    pub streak: u32,
    pub claimable: bool,
    /// Zero when claimable.
    pub ready_in_secs: u64,
    pub slots: [SlotState; DAILY_SLOTS],
    /// Reward the next claim pays.
    pub next_reward: u64,
}

impl DailyRewardConfig {
    /// Streak that still counts at `now_ms`.
    pub fn effective_streak(&self, streak: u32, last_claim_ms: Option<u64>, now_ms: u64) -> u32 {
        let grace_ms = self.grace_hours.saturating_mul(HOUR_MS);
        match last_claim_ms {
            Some(last) if now_ms.saturating_sub(last) <= grace_ms => streak,
            _ => 0,
        }
    }

    pub fn status(&self, streak: u32, last_claim_ms: Option<u64>, now_ms: u64) -> DailyStatus {
        let streak = self.effective_streak(streak, last_claim_ms, now_ms);
        let interval_ms = self.claim_interval_hours.saturating_mul(HOUR_MS);
        let ready_in_ms = match last_claim_ms {
            Some(last) => last.saturating_add(interval_ms).saturating_sub(now_ms),
            None => 0,
        };
        let claimable = ready_in_ms == 0;

        // A finished week stays fully claimed until the next cycle opens.
        let cycle = DAILY_SLOTS as u32;
        let done = if streak > 0 && streak % cycle == 0 && !claimable {
            DAILY_SLOTS
        } else {
            (streak % cycle) as usize
        };

        let mut slots = [SlotState::Locked; DAILY_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = if i < done {
                SlotState::Claimed
            } else if i == done && claimable {
                SlotState::Claimable
            } else {
                SlotState::Locked
            };
        }

        DailyStatus {
            streak,
            claimable,
            ready_in_secs: ready_in_ms.div_ceil(1000),
            slots,
            next_reward: self.rewards[(streak % cycle) as usize],
        }
    }
}

impl Economy {
    pub fn daily_status(&self, record: &PlayerRecord, now_ms: u64) -> DailyStatus {
        self.config
            .daily
            .status(record.daily_streak, record.last_daily_claim_ms, now_ms)
    }

    pub fn claim_daily(
        &self,
        record: &PlayerRecord,
        now_ms: u64,
    ) -> Result<(PlayerRecord, Event), GameError> {
        let status = self.daily_status(record, now_ms);
        if !status.claimable {
            return Err(GameError::DailyRewardNotReady {
                ready_in_secs: status.ready_in_secs,
            });
        }

        let slot = (status.streak % DAILY_SLOTS as u32) as usize;
        let reward = self.config.daily.rewards[slot];
        let mut next = record.clone();
        next.daily_streak = status.streak.saturating_add(1);
        next.last_daily_claim_ms = Some(now_ms);
        next.balance += reward as f64;

        tracing::info!(user_id = %next.user_id, streak = next.daily_streak, reward, "daily reward claimed");
        let event = Event::DailyRewardClaimed {
            streak: next.daily_streak,
            slot,
            reward,
            balance: next.balance,
            at: at(now_ms),
        };
        Ok((next, event))
    }
}
