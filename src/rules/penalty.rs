//! Penalty tables.
//!
//! A [`PenaltyTable`] maps a clamped non-negative gap `k ∈ 0..=cap` to a
//! cumulative exponential cost
//!
//! ```text
//! table[k] = Σ_{i=1..k} round(scale · base^i)
//! ```
//!
//! and binds it to the model with one min-equality (clamp) and one element
//! constraint, instead of one boolean per threshold level. With
//! `base > 1` the increments grow, so the cost is non-decreasing and convex
//! in the gap.
//!
//! Entries may not exceed [`MAX_PENALTY`]; a `(base, scale, cap)` that would
//! is rejected as an invalid setting.
//!
//! # Reference
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering", §4 (soft constraint costs)

use super::settings::invalid;
use crate::cp::{CpModel, IntVar};
use crate::error::Result;

/// Largest cost a table entry may reach.
pub const MAX_PENALTY: i64 = 1 << 24;

/// Precomputed cumulative exponential costs for gaps `0..=cap`.
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyTable {
    base: f64,
    scale: f64,
    values: Vec<i64>,
}

impl PenaltyTable {
    /// Builds the table. Pure function of `(base, scale, cap)`.
    ///
    /// # Errors
    /// [`RosterError::InvalidSetting`](crate::RosterError::InvalidSetting)
    /// against `rule`/`cap_key` when an entry would exceed [`MAX_PENALTY`].
    pub fn new(rule: &str, cap_key: &str, base: f64, scale: f64, cap: usize) -> Result<Self> {
        let overflow = |k: usize| {
            invalid(
                rule,
                cap_key,
                format!("penalty for gap {k} exceeds {MAX_PENALTY} (base {base}, scale {scale}); lower the cap"),
            )
        };
        let mut values = Vec::with_capacity(cap + 1);
        values.push(0);
        let mut cumulative: i64 = 0;
        for k in 1..=cap {
            let exponent = i32::try_from(k).map_err(|_| overflow(k))?;
            let step = (scale * base.powi(exponent)).round();
            if !step.is_finite() || step > MAX_PENALTY as f64 {
                return Err(overflow(k));
            }
            cumulative = cumulative
                .checked_add(step as i64)
                .filter(|total| *total <= MAX_PENALTY)
                .ok_or_else(|| overflow(k))?;
            values.push(cumulative);
        }
        Ok(Self {
            base,
            scale,
            values,
        })
    }

    /// Growth factor.
    pub fn base(&self) -> f64 {
        self.base
    }

    /// Multiplier.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Largest gap represented.
    pub fn cap(&self) -> usize {
        self.values.len() - 1
    }

    /// Table entries, index = gap.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Cost of the largest gap.
    pub fn max_penalty(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Cost of `gap`, clamped to the cap.
    pub fn cost(&self, gap: usize) -> i64 {
        self.values[gap.min(self.cap())]
    }

    /// Binds `penalty = table[index]` for an index already within
    /// `0..=cap`. Returns the penalty variable.
    pub fn bind(&self, model: &mut CpModel, index: IntVar, name: &str) -> IntVar {
        let penalty = model.new_int_var(0, self.max_penalty(), format!("{name}_penalty"));
        model.add_element(index, self.values.clone(), penalty);
        penalty
    }

    /// Clamps a non-negative `driver` to the cap and binds the table.
    /// Returns the penalty variable.
    pub fn lookup(&self, model: &mut CpModel, driver: IntVar, name: &str) -> IntVar {
        let cap = self.cap() as i64;
        let cap_const = model.new_constant(cap);
        let capped = model.new_int_var(0, cap, format!("{name}_capped"));
        model.add_min_equality(capped, [driver, cap_const]);
        self.bind(model, capped, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{solve_with_limit, SolveStatus};
    use crate::error::RosterError;
    use std::time::Duration;

    #[test]
    fn test_cumulative_values() {
        let table = PenaltyTable::new("T", "cap", 2.0, 1.0, 4).unwrap();
        assert_eq!(table.values(), &[0, 2, 6, 14, 30]);
        assert_eq!(table.cap(), 4);
        assert_eq!(table.max_penalty(), 30);
        assert_eq!(table.cost(10), 30);
    }

    #[test]
    fn test_fairness_defaults_monotone_and_convex() {
        let table = PenaltyTable::new("T", "cap", 1.4, 1.0, 7).unwrap();
        let v = table.values();
        assert!(v.windows(2).all(|w| w[1] >= w[0]));
        let steps: Vec<i64> = v.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(steps.windows(2).all(|w| w[1] >= w[0]));
        assert!(v[7] > v[1] * 7);
    }

    #[test]
    fn test_zero_scale_is_flat() {
        let table = PenaltyTable::new("T", "cap", 2.0, 0.0, 3).unwrap();
        assert_eq!(table.values(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_oversized_table_is_rejected() {
        let err = PenaltyTable::new("Fairness", "max_deviation_hours", 2.0, 1.0, 100).unwrap_err();
        match err {
            RosterError::InvalidSetting { rule, key, .. } => {
                assert_eq!(rule, "Fairness");
                assert_eq!(key, "max_deviation_hours");
            }
            other => panic!("unexpected {other:?}"),
        }
        // 2^1 + .. + 2^23 = 2^24 - 2 still fits; one more step does not.
        assert!(PenaltyTable::new("T", "cap", 2.0, 1.0, 23).is_ok());
        assert!(PenaltyTable::new("T", "cap", 2.0, 1.0, 24).is_err());
        assert!(PenaltyTable::new("T", "cap", 1e300, 1e300, 2).is_err());
    }

    #[test]
    fn test_lookup_clamps_driver() {
        let table = PenaltyTable::new("T", "cap", 2.0, 1.0, 3).unwrap();
        let mut model = CpModel::new("t");
        let driver = model.new_int_var(0, 10, "gap");
        model.add_eq(driver, 9);
        let penalty = table.lookup(&mut model, driver, "gap");
        model.minimize(penalty);
        let resp = solve_with_limit(&model, Duration::from_secs(5));
        assert_eq!(resp.status, SolveStatus::Optimal);
        assert_eq!(resp.value(penalty), Some(14));
    }
}
