//! Geometric upgrade cost curve.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// `cost(level) = floor(base_cost * growth^level)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    pub base_cost: f64,
    pub growth: f64,
}

impl CostCurve {
    /// Build a curve whose cost strictly increases with every level.
    ///
    /// `growth > 1` alone is not enough once `floor` is applied: the step
    /// between consecutive levels is at least `base_cost * (growth - 1)`,
    /// which must reach one whole unit.
    pub fn new(base_cost: f64, growth: f64) -> Result<Self, ValidationError> {
        let curve = Self { base_cost, growth };
        curve.validate("cost_curve")?;
        Ok(curve)
    }

    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if !(self.base_cost.is_finite() && self.base_cost > 0.0) {
            return Err(ValidationError::InvalidValue {
                field: format!("{field}.base_cost"),
                message: format!("must be a positive number, got {}", self.base_cost),
            });
        }
        if !(self.growth.is_finite() && self.growth > 1.0) {
            return Err(ValidationError::InvalidValue {
                field: format!("{field}.growth"),
                message: format!("must be greater than 1, got {}", self.growth),
            });
        }
        if self.base_cost * (self.growth - 1.0) < 1.0 {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!(
                    "base_cost * (growth - 1) must be at least 1 (got {})",
                    self.base_cost * (self.growth - 1.0)
                ),
            });
        }
        Ok(())
    }

    /// Price of buying the next level when currently at `level`.
    ///
    /// Saturates at `u64::MAX` for levels the curve can no longer represent.
    pub fn cost(&self, level: u32) -> u64 {
        let raw = self.base_cost * self.growth.powf(f64::from(level));
        // `as` saturates on overflow and infinity.
        raw.floor() as u64
    }
}
