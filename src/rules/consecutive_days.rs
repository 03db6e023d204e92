//! Consecutive-day run tracking and penalty.
//!
//! `runlen[e,d]` counts the consecutive worked days ending at `d`:
//!
//! ```text
//! runlen[e,0] = z[e,0]
//! runlen[e,d] ≤ runlen[e,d-1] + 1
//! runlen[e,d] ≤ DAYS · z[e,d]
//! runlen[e,d] ≥ runlen[e,d-1] + 1 - DAYS · (1 - z[e,d])
//! ```
//!
//! i.e. reset on a day off, increment on a day worked. A staff member's
//! `max_consec_days` caps the run as a hard constraint.
//!
//! The soft part clamps each run to `cap = min(max_gap, DAYS)`, subtracts
//! `penalty_free_days`, and looks the excess up in a [`PenaltyTable`].
//!
//! # Settings
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `penalty_free_days` | 5 | run length that is never penalised |
//! | `base` | 2.0 | growth factor, must exceed 1.0 |
//! | `scale` | 1.0 | multiplier, must be non-negative |
//! | `max_gap` | 8 | clamp for the run length |

use super::settings::{require_at_least, require_base, require_scale};
use super::{BuildContext, PenaltyTable, Rule, Settings};
use crate::cp::{IntVar, LinearExpr};
use crate::error::Result;

const RULE: &str = "ConsecutiveDays";

/// Run-length recurrence, per-staff caps and the run penalty.
#[derive(Debug)]
pub struct ConsecutiveDays {
    penalty_free_days: i64,
    table: PenaltyTable,
    penalties: Vec<IntVar>,
}

impl ConsecutiveDays {
    /// Reads and validates settings. The penalty table is sized to the
    /// horizon of `ctx`.
    pub fn from_settings(settings: &Settings, ctx: &BuildContext) -> Result<Self> {
        let penalty_free_days = require_at_least(
            RULE,
            "penalty_free_days",
            settings.int(RULE, "penalty_free_days", 5)?,
            0,
        )?;
        let base = require_base(RULE, "base", settings.float(RULE, "base", 2.0)?)?;
        let scale = require_scale(RULE, "scale", settings.float(RULE, "scale", 1.0)?)?;
        let max_gap = require_at_least(RULE, "max_gap", settings.int(RULE, "max_gap", 8)?, 1)?;
        let cap = (max_gap as usize).min(ctx.cfg.days);
        Ok(Self {
            penalty_free_days,
            table: PenaltyTable::new(RULE, "max_gap", base, scale, cap)?,
            penalties: Vec::new(),
        })
    }

    /// The penalty table in use.
    pub fn table(&self) -> &PenaltyTable {
        &self.table
    }
}

impl Rule for ConsecutiveDays {
    fn name(&self) -> &'static str {
        RULE
    }

    fn declare_vars(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, _) = ctx.dims();
        for e in 0..n {
            for d in 0..days {
                let run = ctx
                    .model
                    .new_int_var(0, days as i64, format!("runlen[e={e},d={d}]"));
                ctx.vars.run_length.insert((e, d), run);
            }
        }
        Ok(())
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, _) = ctx.dims();
        let big = days as i64;
        for e in 0..n {
            let run0 = ctx.vars.run_length.get(&(e, 0))?;
            let z0 = ctx.vars.day_worked.get(&(e, 0))?;
            let guard = ctx.guard(|| format!("RUNLEN-BASE[e={e}]"));
            ctx.model.add_eq(run0, z0).only_enforce_if(guard);

            for d in 1..days {
                let prev = ctx.vars.run_length.get(&(e, d - 1))?;
                let cur = ctx.vars.run_length.get(&(e, d))?;
                let z = ctx.vars.day_worked.get(&(e, d))?;

                let guard = ctx.guard(|| format!("RUNLEN-UP[e={e},d={d}]"));
                ctx.model.add_le(cur, prev + 1).only_enforce_if(guard);

                let guard = ctx.guard(|| format!("RUNLEN-Z[e={e},d={d}]"));
                ctx.model.add_le(cur, z * big).only_enforce_if(guard);

                let guard = ctx.guard(|| format!("RUNLEN-DOWN[e={e},d={d}]"));
                ctx.model
                    .add_ge(cur, prev + (1 - big) + z * big)
                    .only_enforce_if(guard);
            }

            let Some(limit) = ctx.data.staff[e].max_consec_days.filter(|l| *l > 0) else {
                continue;
            };
            for d in 0..days {
                let run = ctx.vars.run_length.get(&(e, d))?;
                let guard = ctx.guard(|| format!("MAX-CONSEC[e={e},d={d},limit={limit}]"));
                ctx.model.add_le(run, i64::from(limit)).only_enforce_if(guard);
            }
        }
        Ok(())
    }

    fn add_soft(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let free = self.penalty_free_days;
        let cap = self.table.cap() as i64;
        if self.table.max_penalty() == 0 || free >= cap {
            return Ok(());
        }
        let (n, days, _) = ctx.dims();
        let cap_const = ctx.model.new_constant(cap);
        let zero = ctx.model.new_constant(0);

        for e in 0..n {
            if ctx.data.staff[e]
                .max_consec_days
                .is_some_and(|limit| limit > 0 && i64::from(limit) <= free)
            {
                continue;
            }
            // runlen[e,d] ≤ d + 1, so early days never exceed the free run.
            for d in (free as usize)..days {
                let run = ctx.vars.run_length.get(&(e, d))?;
                let model = &mut ctx.model;
                let capped = model.new_int_var(0, cap, format!("runlen_capped[e={e},d={d}]"));
                model.add_min_equality(capped, [run, cap_const]);
                let shifted = model.new_int_var(-free, cap - free, format!("runlen_shifted[e={e},d={d}]"));
                model.add_eq(shifted, capped - free);
                let excess = model.new_int_var(0, cap - free, format!("runlen_excess[e={e},d={d}]"));
                model.add_max_equality(excess, [shifted, zero]);
                let penalty = self
                    .table
                    .bind(model, excess, &format!("runlen[e={e},d={d}]"));
                self.penalties.push(penalty);
            }
        }
        Ok(())
    }

    fn contribute_objective(&self, _ctx: &BuildContext) -> Result<Vec<LinearExpr>> {
        Ok(self.penalties.iter().map(|p| LinearExpr::from(*p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::cp::{solve_with_limit, SolveStatus};
    use crate::models::{InputData, Staff};
    use crate::rules::DecisionVariables;
    use proptest::prelude::*;
    use std::time::Duration;

    fn ctx_for(days: usize, staff: Staff) -> BuildContext {
        let cfg = Config::new(days, 2).with_shift_bounds(1, 2).with_unsat_core(false);
        BuildContext::new(cfg, InputData::unrestricted(vec![staff], 2))
    }

    fn prepared(days: usize, staff: Staff, settings: &Settings) -> (BuildContext, ConsecutiveDays) {
        let mut ctx = ctx_for(days, staff);
        let mut rule = ConsecutiveDays::from_settings(settings, &ctx).unwrap();
        DecisionVariables::new().declare_vars(&mut ctx).unwrap();
        rule.declare_vars(&mut ctx).unwrap();
        rule.add_hard(&mut ctx).unwrap();
        rule.add_soft(&mut ctx).unwrap();
        (ctx, rule)
    }

    fn fix_days(ctx: &mut BuildContext, pattern: &[bool]) {
        for (d, on) in pattern.iter().enumerate() {
            let z = ctx.vars.day_worked.get(&(0, d)).unwrap();
            ctx.model.add_eq(z, i64::from(*on));
        }
    }

    #[test]
    fn test_table_capped_by_horizon() {
        let ctx = ctx_for(3, Staff::new(0, "A"));
        let rule = ConsecutiveDays::from_settings(&Settings::new(), &ctx).unwrap();
        assert_eq!(rule.table().cap(), 3);
        assert_eq!(rule.table().values(), &[0, 2, 6, 14]);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let ctx = ctx_for(3, Staff::new(0, "A"));
        for settings in [
            Settings::new().with("base", 0.9),
            Settings::new().with("scale", -1.0),
            Settings::new().with("max_gap", 0),
            Settings::new().with("penalty_free_days", -1),
        ] {
            assert!(ConsecutiveDays::from_settings(&settings, &ctx).is_err());
        }
    }

    #[test]
    fn test_penalty_for_long_run() {
        let settings = Settings::new().with("penalty_free_days", 1);
        let (mut ctx, rule) = prepared(3, Staff::new(0, "A"), &settings);
        fix_days(&mut ctx, &[true, true, true]);
        let terms = rule.contribute_objective(&ctx).unwrap();
        assert_eq!(terms.len(), 2);
        ctx.model.minimize(LinearExpr::sum(terms));
        let resp = solve_with_limit(&ctx.model, Duration::from_secs(5));
        assert_eq!(resp.status, SolveStatus::Optimal);
        // day 1: excess 1 → 2, day 2: excess 2 → 6
        assert_eq!(resp.objective, Some(8));
    }

    #[test]
    fn test_no_penalty_when_cap_below_free_run() {
        let staff = Staff::new(0, "A").with_max_consec_days(2);
        let settings = Settings::new().with("penalty_free_days", 2);
        let (ctx, rule) = prepared(4, staff, &settings);
        assert!(rule.contribute_objective(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_max_consec_is_hard() {
        let staff = Staff::new(0, "A").with_max_consec_days(1);
        let (mut ctx, _) = prepared(2, staff, &Settings::new());
        fix_days(&mut ctx, &[true, true]);
        let resp = solve_with_limit(&ctx.model, Duration::from_secs(5));
        assert_eq!(resp.status, SolveStatus::Infeasible);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_runlen_counts_trailing_worked_days(pattern in proptest::collection::vec(any::<bool>(), 1..6)) {
            let days = pattern.len();
            let (mut ctx, _) = prepared(days, Staff::new(0, "A"), &Settings::new());
            fix_days(&mut ctx, &pattern);
            let resp = solve_with_limit(&ctx.model, Duration::from_secs(5));
            prop_assert!(resp.status.has_solution());

            let mut expected = 0;
            for (d, on) in pattern.iter().enumerate() {
                expected = if *on { expected + 1 } else { 0 };
                let run = ctx.vars.run_length.get(&(0, d)).unwrap();
                prop_assert_eq!(resp.value(run), Some(expected));
            }
        }
    }
}
