//! Energy-limited tap mechanic.

use super::Economy;
use crate::error::GameError;
use crate::events::{at, Event};
use crate::player::PlayerRecord;

/// Energy at `now_ms` and the checkpoint that keeps the unspent partial interval.
///
/// Regen adds one point per `interval_ms`. Once energy is full, the checkpoint
/// snaps to `now_ms` so time spent at the cap is not banked.
pub fn regen(
    energy: u32,
    max_energy: u32,
    last_energy_ms: u64,
    interval_ms: u64,
    now_ms: u64,
) -> (u32, u64) {
    if energy >= max_energy || interval_ms == 0 {
        return (energy.min(max_energy), now_ms.max(last_energy_ms));
    }
    let elapsed = now_ms.saturating_sub(last_energy_ms);
    let points = elapsed / interval_ms;
    let missing = u64::from(max_energy - energy);
    if points >= missing {
        (max_energy, now_ms.max(last_energy_ms))
    } else {
        (energy + points as u32, last_energy_ms + points * interval_ms)
    }
}

impl Economy {
    /// Fold regenerated energy into the record.
    pub(crate) fn settle_energy(&self, record: &PlayerRecord, now_ms: u64) -> PlayerRecord {
        let (energy, checkpoint) = regen(
            record.energy,
            record.max_energy,
            record.last_energy_ms,
            self.config.energy_regen_interval_ms,
            now_ms,
        );
        let mut next = record.clone();
        next.energy = energy;
        next.last_energy_ms = checkpoint;
        next
    }

    pub fn current_energy(&self, record: &PlayerRecord, now_ms: u64) -> u32 {
        regen(
            record.energy,
            record.max_energy,
            record.last_energy_ms,
            self.config.energy_regen_interval_ms,
            now_ms,
        )
        .0
    }

    /// Tap up to `count` times, one energy each.
    ///
    /// Applies as many taps as there is energy for; fails only when none can be applied.
    pub fn tap(
        &self,
        record: &PlayerRecord,
        count: u32,
        now_ms: u64,
    ) -> Result<(PlayerRecord, Event), GameError> {
        if count == 0 {
            return Err(GameError::InvalidAmount("tap count must be at least 1".into()));
        }
        let mut next = self.settle_energy(record, now_ms);
        if next.energy == 0 {
            return Err(GameError::EnergyDepleted);
        }

        let was_full = next.energy >= next.max_energy;
        let taps = count.min(next.energy);
        let earned = f64::from(taps) * f64::from(next.tap_value);
        next.energy -= taps;
        next.balance += earned;
        if was_full {
            // Regen starts from the moment energy drops below the cap.
            next.last_energy_ms = now_ms;
        }

        tracing::debug!(user_id = %next.user_id, taps, earned, energy = next.energy, "tapped");
        let event = Event::Tapped {
            taps,
            earned,
            energy: next.energy,
            balance: next.balance,
            at: at(now_ms),
        };
        Ok((next, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::EconomyConfig;

    fn economy() -> Economy {
        Economy::new(EconomyConfig::default()).unwrap()
    }

    #[test]
    fn regen_keeps_partial_interval() {
        // 2.5 intervals elapsed: two points, half an interval carried over.
        let (energy, checkpoint) = regen(10, 100, 0, 1000, 2500);
        assert_eq!(energy, 12);
        assert_eq!(checkpoint, 2000);
        let (energy, _) = regen(energy, 100, checkpoint, 1000, 3000);
        assert_eq!(energy, 13);
    }

    #[test]
    fn regen_stops_at_cap() {
        let (energy, checkpoint) = regen(95, 100, 0, 1000, 60_000);
        assert_eq!(energy, 100);
        assert_eq!(checkpoint, 60_000);
    }

    #[test]
    fn tap_spends_energy_and_credits_tap_value() {
        let eco = economy();
        let record = eco.new_player("u1", "Test", None, 0);
        let (next, event) = eco.tap(&record, 10, 5_000).unwrap();
        assert_eq!(next.energy, record.max_energy - 10);
        assert_eq!(next.balance, record.balance + 10.0);
        assert_eq!(next.last_energy_ms, 5_000);
        assert!(matches!(event, Event::Tapped { taps: 10, .. }));
    }

    #[test]
    fn tap_is_limited_by_energy() {
        let eco = economy();
        let mut record = eco.new_player("u1", "Test", None, 0);
        record.energy = 3;
        record.last_energy_ms = 0;
        let (next, event) = eco.tap(&record, 50, 500).unwrap();
        assert_eq!(next.energy, 0);
        assert!(matches!(event, Event::Tapped { taps: 3, .. }));
    }

    #[test]
    fn empty_energy_rejects() {
        let eco = economy();
        let mut record = eco.new_player("u1", "Test", None, 0);
        record.energy = 0;
        record.last_energy_ms = 10_000;
        assert_eq!(eco.tap(&record, 1, 10_500).unwrap_err(), GameError::EnergyDepleted);
        assert_eq!(
            eco.tap(&record, 0, 10_500).unwrap_err(),
            GameError::InvalidAmount("tap count must be at least 1".into())
        );
    }
}
