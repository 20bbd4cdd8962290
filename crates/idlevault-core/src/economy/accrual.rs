//! Vault accrual calculator.
//!
//! Passive income accrues at `rate` per hour from the last claim checkpoint
//! into a vault that holds at most `capacity_hours` worth of earnings. All
//! values are derived from the checkpoint and the current time, so the result
//! does not depend on how long the client was closed or how often it polled.

use serde::{Deserialize, Serialize};

const SECS_PER_HOUR: f64 = 3600.0;

/// Derived vault state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accrual {
    /// Earnings sitting in the vault, not yet credited to the balance.
    pub accumulated: f64,
    /// 0.0 .. 1.0 fill level of the vault.
    pub fill_fraction: f64,
    /// Seconds until the vault stops accruing.
    pub seconds_to_full: f64,
}

impl Accrual {
    pub fn is_full(&self) -> bool {
        self.fill_fraction >= 1.0
    }
}

/// A boost that multiplies the accrual rate from the checkpoint until it expires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostWindow {
    pub expires_at_ms: u64,
    pub multiplier: f64,
}

/// Seconds of accrual that count toward the vault, plus the vault size in seconds.
///
/// Returns `None` for a vault with no capacity.
fn capped_window(capacity_hours: f64, last_checkpoint_ms: u64, now_ms: u64) -> Option<(f64, f64)> {
    let capacity_secs = capacity_hours * SECS_PER_HOUR;
    if !(capacity_secs > 0.0) {
        return None;
    }
    let elapsed = now_ms.saturating_sub(last_checkpoint_ms) as f64 / 1000.0;
    Some((elapsed.min(capacity_secs), capacity_secs))
}

/// Compute the vault state at `now_ms` for a constant hourly `rate`.
///
/// A negative rate counts as zero. A clock that reads earlier than the
/// checkpoint yields an empty vault rather than a negative one.
pub fn accrue(rate: f64, capacity_hours: f64, last_checkpoint_ms: u64, now_ms: u64) -> Accrual {
    accrue_boosted(rate, capacity_hours, last_checkpoint_ms, now_ms, &[])
}

/// Like [`accrue`], but integrates the rate piecewise across boost expiries.
///
/// Each boost is active from the checkpoint until `expires_at_ms`; while
/// several overlap, their multipliers compound.
pub fn accrue_boosted(
    rate: f64,
    capacity_hours: f64,
    last_checkpoint_ms: u64,
    now_ms: u64,
    boosts: &[BoostWindow],
) -> Accrual {
    let Some((capped, capacity_secs)) = capped_window(capacity_hours, last_checkpoint_ms, now_ms)
    else {
        return Accrual {
            accumulated: 0.0,
            fill_fraction: 1.0,
            seconds_to_full: 0.0,
        };
    };

    let rate = rate.max(0.0);
    let accumulated = rate * boosted_seconds(capped, last_checkpoint_ms, boosts) / SECS_PER_HOUR;

    Accrual {
        accumulated,
        fill_fraction: (capped / capacity_secs).clamp(0.0, 1.0),
        seconds_to_full: (capacity_secs - capped).max(0.0),
    }
}

/// Multiplier-weighted seconds within the first `capped` seconds after the checkpoint.
fn boosted_seconds(capped: f64, last_checkpoint_ms: u64, boosts: &[BoostWindow]) -> f64 {
    let mut ends: Vec<(f64, f64)> = boosts
        .iter()
        .filter(|b| b.multiplier.is_finite() && b.multiplier > 0.0)
        .filter(|b| b.expires_at_ms > last_checkpoint_ms)
        .map(|b| {
            let offset = (b.expires_at_ms - last_checkpoint_ms) as f64 / 1000.0;
            (offset.min(capped), b.multiplier)
        })
        .collect();
    ends.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut weighted = 0.0;
    let mut start = 0.0;
    for i in 0..ends.len() {
        let end = ends[i].0;
        if end > start {
            // Every boost ending at or after `end` covers this whole segment.
            let multiplier: f64 = ends[i..].iter().map(|(_, m)| m).product();
            weighted += (end - start) * multiplier;
            start = end;
        }
    }
    weighted + (capped - start).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HOUR_MS: u64 = 3_600_000;

    #[test]
    fn half_full_after_two_of_four_hours() {
        let a = accrue(100.0, 4.0, 0, 2 * HOUR_MS);
        assert!((a.accumulated - 200.0).abs() < 1e-9);
        assert!((a.fill_fraction - 0.5).abs() < 1e-12);
        assert!((a.seconds_to_full - 7200.0).abs() < 1e-9);
        assert!(!a.is_full());
    }

    #[test]
    fn caps_at_capacity() {
        let a = accrue(100.0, 4.0, 0, 10 * HOUR_MS);
        assert!((a.accumulated - 400.0).abs() < 1e-9);
        assert_eq!(a.fill_fraction, 1.0);
        assert_eq!(a.seconds_to_full, 0.0);
        assert!(a.is_full());
    }

    #[test]
    fn clock_before_checkpoint_is_empty() {
        let a = accrue(100.0, 4.0, 5 * HOUR_MS, HOUR_MS);
        assert_eq!(a.accumulated, 0.0);
        assert_eq!(a.fill_fraction, 0.0);
        assert_eq!(a.seconds_to_full, 4.0 * 3600.0);
    }

    #[test]
    fn zero_capacity_is_full_and_empty() {
        let a = accrue(100.0, 0.0, 0, HOUR_MS);
        assert_eq!(a.accumulated, 0.0);
        assert!(a.is_full());
    }

    #[test]
    fn negative_rate_accrues_nothing() {
        let a = accrue(-50.0, 4.0, 0, HOUR_MS);
        assert_eq!(a.accumulated, 0.0);
        assert!((a.fill_fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn boost_doubles_only_until_expiry() {
        let boosts = [BoostWindow {
            expires_at_ms: HOUR_MS,
            multiplier: 2.0,
        }];
        let a = accrue_boosted(100.0, 4.0, 0, 2 * HOUR_MS, &boosts);
        // 1h at 200/h + 1h at 100/h
        assert!((a.accumulated - 300.0).abs() < 1e-9);
        assert!((a.fill_fraction - 0.5).abs() < 1e-12);
    }

    #[test]
    fn overlapping_boosts_compound() {
        let boosts = [
            BoostWindow {
                expires_at_ms: HOUR_MS,
                multiplier: 2.0,
            },
            BoostWindow {
                expires_at_ms: 2 * HOUR_MS,
                multiplier: 3.0,
            },
        ];
        let a = accrue_boosted(100.0, 4.0, 0, 3 * HOUR_MS, &boosts);
        // 1h x6 + 1h x3 + 1h x1
        assert!((a.accumulated - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn expired_boost_before_checkpoint_is_ignored() {
        let boosts = [BoostWindow {
            expires_at_ms: HOUR_MS,
            multiplier: 5.0,
        }];
        let a = accrue_boosted(100.0, 4.0, 2 * HOUR_MS, 3 * HOUR_MS, &boosts);
        assert!((a.accumulated - 100.0).abs() < 1e-9);
    }

    #[test]
    fn boost_beyond_cap_only_counts_inside_vault_window() {
        let boosts = [BoostWindow {
            expires_at_ms: 10 * HOUR_MS,
            multiplier: 2.0,
        }];
        let a = accrue_boosted(100.0, 2.0, 0, 10 * HOUR_MS, &boosts);
        assert!((a.accumulated - 400.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn cap_holds_past_capacity(
            rate in 0.0f64..1e7,
            capacity in 0.01f64..48.0,
            extra_ms in 0u64..1_000_000_000,
        ) {
            let cap_ms = (capacity * 3_600_000.0).ceil() as u64;
            let at_cap = accrue(rate, capacity, 0, cap_ms);
            let later = accrue(rate, capacity, 0, cap_ms + extra_ms);
            prop_assert_eq!(at_cap.accumulated, later.accumulated);
            prop_assert_eq!(later.fill_fraction, 1.0);
        }

        #[test]
        fn monotonic_in_now(
            rate in 0.0f64..1e6,
            capacity in 0.01f64..24.0,
            last in 0u64..1_000_000_000_000,
            a in 0u64..200_000_000,
            b in 0u64..200_000_000,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let x = accrue(rate, capacity, last, last + lo);
            let y = accrue(rate, capacity, last, last + hi);
            prop_assert!(x.accumulated <= y.accumulated);
            prop_assert!(x.fill_fraction <= y.fill_fraction);
            prop_assert!(x.seconds_to_full >= y.seconds_to_full);
        }

        #[test]
        fn idempotent_and_bounded(
            rate in 0.0f64..1e6,
            capacity in 0.01f64..24.0,
            last in 0u64..1_000_000_000_000,
            elapsed in 0u64..500_000_000,
        ) {
            let x = accrue(rate, capacity, last, last + elapsed);
            let y = accrue(rate, capacity, last, last + elapsed);
            prop_assert_eq!(x, y);
            prop_assert!((0.0..=1.0).contains(&x.fill_fraction));
            prop_assert!(x.seconds_to_full >= 0.0);
            prop_assert!(x.accumulated <= rate * capacity * (1.0 + 1e-12));
        }
    }
}
