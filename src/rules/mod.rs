//! Rostering rules and the rule pipeline.
//!
//! A roster model is compiled by a sequence of independent [`Rule`]s that
//! share one [`BuildContext`]. Every rule goes through four phases, and each
//! phase completes across **all** rules before the next one starts:
//!
//! 1. [`Rule::declare_vars`]: create decision and helper variables
//! 2. [`Rule::add_hard`]: post hard constraints
//! 3. [`Rule::add_soft`]: create soft-constraint auxiliaries
//! 4. [`Rule::contribute_objective`]: hand penalty terms to the objective
//!
//! A rule may read anything declared by an earlier-ordered rule. It must not
//! rely on hard constraints of a later-ordered rule.
//!
//! # Built-in rules
//!
//! | Order | Rule | Kind |
//! |-------|------|------|
//! | 0 | [`DecisionVariables`] | declare `y`, `S`, `L`, `x`, `z` |
//! | 10 | [`Availability`] | hard |
//! | 20 | [`ShiftInterval`] | hard, interval → hourly decomposition |
//! | 40 | [`MinShiftLength`] | hard |
//! | 50 | [`Rest`] | hard |
//! | 60 | [`Coverage`] | hard, skill minima/maxima |
//! | 70 | [`WeeklyCap`] | hard |
//! | 80 | [`ConsecutiveDays`] | hard run tracking + soft penalty |
//! | 90 | [`Fairness`] | soft, with band shortfall |
//!
//! # Usage
//!
//! Turning fairness off while keeping every other default:
//!
//! ```
//! use u_roster::rules::{default_rule_specs, RuleKind, RuleRegistry};
//!
//! let specs = default_rule_specs()
//!     .into_iter()
//!     .map(|spec| {
//!         if spec.name() == RuleKind::Fairness.name() {
//!             spec.disabled()
//!         } else {
//!             spec
//!         }
//!     })
//!     .collect();
//! let registry = RuleRegistry::new(specs);
//!
//! assert_eq!(registry.specs().len(), RuleKind::ALL.len());
//! let ordered = registry.ordered();
//! assert_eq!(ordered.len(), RuleKind::ALL.len() - 1);
//! assert!(ordered.iter().all(|spec| spec.name() != "Fairness"));
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of applications, methods and models"

mod availability;
mod consecutive_days;
mod context;
mod coverage;
mod fairness;
mod min_length;
mod objective;
mod penalty;
mod registry;
mod rest;
mod settings;
mod shift_interval;
mod variables;
mod weekly_cap;

pub use availability::Availability;
pub use consecutive_days::ConsecutiveDays;
pub use context::{BuildContext, CoverKey, DayKey, HourKey, RosterVars, VarMap};
pub use coverage::Coverage;
pub use fairness::Fairness;
pub use min_length::MinShiftLength;
pub use objective::ObjectiveBuilder;
pub use penalty::{PenaltyTable, MAX_PENALTY};
pub use registry::{default_rule_specs, RuleFactory, RuleFactoryFn, RuleKind, RuleRegistry, RuleSpec};
pub use rest::Rest;
pub use settings::{SettingValue, Settings};
pub use shift_interval::ShiftInterval;
pub use variables::DecisionVariables;
pub use weekly_cap::WeeklyCap;

use std::fmt::Debug;

use crate::cp::LinearExpr;
use crate::error::Result;

/// A rostering rule.
///
/// Every phase has a no-op default, so a rule implements only the phases it
/// takes part in. Phases receive the shared context mutably; a rule writes
/// only the variables it owns.
pub trait Rule: Debug {
    /// Rule name (e.g., "Rest", "Coverage").
    fn name(&self) -> &'static str;

    /// Phase 1: create variables.
    fn declare_vars(&mut self, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    /// Phase 2: post hard constraints.
    fn add_hard(&mut self, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    /// Phase 3: create soft-constraint auxiliaries (penalty variables).
    fn add_soft(&mut self, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    /// Phase 4: objective terms to minimise.
    fn contribute_objective(&self, _ctx: &BuildContext) -> Result<Vec<LinearExpr>> {
        Ok(Vec::new())
    }
}
