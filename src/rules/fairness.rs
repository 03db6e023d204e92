//! Fairness: deviation from equal hours, plus band shortfall.
//!
//! The target is the skill-agnostic people-hour lower bound of the minima
//! grid divided by the head count, kept integral as `floor`/`ceil`:
//!
//! ```text
//! dev_e ≥ T_e - floor(target)
//! dev_e ≥ ceil(target) - T_e
//! penalty_e = table[min(dev_e, max_deviation_hours)]
//! ```
//!
//! Staff at or above `band_shortfall_threshold` are also penalised for
//! working less than the fleet average. Each band gets its own table, scaled
//! up by `band_shortfall_band_base` per band above the threshold:
//!
//! ```text
//! N · short_e ≥ Σ_k T_k - N · T_e
//! band_scale(b) = band_shortfall_scale · band_shortfall_band_base^(b - threshold)
//! band_penalty_e = band_table(band_e)[min(short_e, band_shortfall_max_gap)]
//! ```
//!
//! The comparison needs at least two employees.
//!
//! # Settings
//!
//! | Key | Default |
//! |-----|---------|
//! | `base` | 1.4 |
//! | `scale` | 1.0 |
//! | `max_deviation_hours` | 7 |
//! | `band_shortfall_base` | 1.25 |
//! | `band_shortfall_scale` | 2.5 |
//! | `band_shortfall_band_base` | 1.25 |
//! | `band_shortfall_max_gap` | 4 |
//! | `band_shortfall_threshold` | 2 |
//!
//! # Reference
//! - Martin et al. (2013), "Cooperative search for fair nurse rosters", §3 (deviation from mean workload)

use std::collections::BTreeMap;

use super::settings::{invalid, require_at_least, require_base, require_scale};
use super::{BuildContext, PenaltyTable, Rule, Settings};
use crate::cp::{IntVar, LinearExpr};
use crate::error::Result;

const RULE: &str = "Fairness";

/// Equal-hours and band-shortfall penalties.
#[derive(Debug)]
pub struct Fairness {
    deviation_table: PenaltyTable,
    shortfall_tables: BTreeMap<u32, PenaltyTable>,
    band_threshold: u32,
    penalties: Vec<IntVar>,
}

impl Fairness {
    /// Reads and validates settings. Table caps are clamped to the horizon,
    /// and one shortfall table is built per band present at or above the
    /// threshold.
    pub fn from_settings(settings: &Settings, ctx: &BuildContext) -> Result<Self> {
        let horizon = ctx.cfg.days * ctx.cfg.hours;

        let base = require_base(RULE, "base", settings.float(RULE, "base", 1.4)?)?;
        let scale = require_scale(RULE, "scale", settings.float(RULE, "scale", 1.0)?)?;
        let max_dev = require_at_least(
            RULE,
            "max_deviation_hours",
            settings.int(RULE, "max_deviation_hours", 7)?,
            1,
        )?;

        let band_base = require_base(
            RULE,
            "band_shortfall_base",
            settings.float(RULE, "band_shortfall_base", 1.25)?,
        )?;
        let band_scale = require_scale(
            RULE,
            "band_shortfall_scale",
            settings.float(RULE, "band_shortfall_scale", 2.5)?,
        )?;
        let band_gap = require_at_least(
            RULE,
            "band_shortfall_max_gap",
            settings.int(RULE, "band_shortfall_max_gap", 4)?,
            1,
        )?;
        let band_threshold = require_at_least(
            RULE,
            "band_shortfall_threshold",
            settings.int(RULE, "band_shortfall_threshold", 2)?,
            1,
        )?;
        let band_threshold = u32::try_from(band_threshold).unwrap_or(u32::MAX);
        let per_band = require_base(
            RULE,
            "band_shortfall_band_base",
            settings.float(RULE, "band_shortfall_band_base", 1.25)?,
        )?;

        let band_cap = (band_gap as usize).min(horizon);
        let mut shortfall_tables = BTreeMap::new();
        for band in ctx.data.staff.iter().map(|s| s.band).filter(|b| *b >= band_threshold) {
            if shortfall_tables.contains_key(&band) {
                continue;
            }
            let steps = i32::try_from(band - band_threshold)
                .map_err(|_| invalid(RULE, "band_shortfall_band_base", format!("band {band} is out of range")))?;
            let table = PenaltyTable::new(
                RULE,
                "band_shortfall_max_gap",
                band_base,
                band_scale * per_band.powi(steps),
                band_cap,
            )?;
            shortfall_tables.insert(band, table);
        }

        Ok(Self {
            deviation_table: PenaltyTable::new(
                RULE,
                "max_deviation_hours",
                base,
                scale,
                (max_dev as usize).min(horizon),
            )?,
            shortfall_tables,
            band_threshold,
            penalties: Vec::new(),
        })
    }

    /// Table applied to the deviation from the target.
    pub fn deviation_table(&self) -> &PenaltyTable {
        &self.deviation_table
    }

    /// Table applied to the shortfall of staff in `band`, if anyone holds
    /// that band and it is at or above the threshold.
    pub fn shortfall_table(&self, band: u32) -> Option<&PenaltyTable> {
        self.shortfall_tables.get(&band)
    }

    /// `(floor, ceil)` of the per-employee target.
    pub fn target(ctx: &BuildContext) -> (i64, i64) {
        let n = ctx.num_staff().max(1) as u64;
        let demand = ctx.cfg.headcount_lower_bound();
        ((demand / n) as i64, demand.div_ceil(n) as i64)
    }

    fn add_deviation(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (floor, ceil) = Self::target(ctx);
        let horizon = (ctx.cfg.days * ctx.cfg.hours) as i64;
        for e in 0..ctx.num_staff() {
            let total = ctx.total_hours(e)?;
            let dev = ctx
                .model
                .new_int_var(0, horizon.max(ceil), format!("fair_dev[e={e}]"));
            ctx.model.add_ge(dev, total - floor);
            ctx.model.add_ge(dev + total, ceil);
            let penalty = self
                .deviation_table
                .lookup(&mut ctx.model, dev, &format!("fair_dev[e={e}]"));
            self.penalties.push(penalty);
        }
        Ok(())
    }

    fn add_band_shortfall(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let n = ctx.num_staff();
        let senior: Vec<usize> = (0..n)
            .filter(|e| ctx.data.staff[*e].band >= self.band_threshold)
            .collect();
        if n < 2 || senior.is_empty() {
            return Ok(());
        }
        let horizon = (ctx.cfg.days * ctx.cfg.hours) as i64;
        let mut totals = Vec::with_capacity(n);
        for e in 0..n {
            totals.push(ctx.total_hours(e)?);
        }
        let fleet = ctx
            .model
            .new_int_var(0, horizon * n as i64, "fleet_hours");
        ctx.model.add_eq(fleet, LinearExpr::sum(totals.iter().copied()));

        let n = n as i64;
        for e in senior {
            let Some(table) = self
                .shortfall_tables
                .get(&ctx.data.staff[e].band)
                .filter(|t| t.max_penalty() > 0)
            else {
                continue;
            };
            let shortfall = ctx
                .model
                .new_int_var(0, horizon, format!("band_shortfall[e={e}]"));
            ctx.model
                .add_ge(shortfall * n, fleet - totals[e] * n);
            let penalty = table.lookup(&mut ctx.model, shortfall, &format!("band_shortfall[e={e}]"));
            self.penalties.push(penalty);
        }
        Ok(())
    }
}

impl Rule for Fairness {
    fn name(&self) -> &'static str {
        RULE
    }

    fn add_soft(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.deviation_table.max_penalty() > 0 {
            self.add_deviation(ctx)?;
        }
        if self.shortfall_tables.values().any(|t| t.max_penalty() > 0) {
            self.add_band_shortfall(ctx)?;
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
    use crate::config::{Config, CoverageBound};
    use crate::cp::{solve_with_limit, SolveStatus};
    use crate::error::RosterError;
    use crate::models::{InputData, Staff};
    use crate::rules::{DecisionVariables, RuleKind};
    use std::time::Duration;

    fn ctx_with(staff: Vec<Staff>) -> BuildContext {
        let mut cfg = Config::new(1, 4).with_shift_bounds(1, 4);
        cfg.require_skill_in_slots("ANY", |_| true, |h| h < 3, 1, CoverageBound::Min);
        let data = InputData::unrestricted(staff, 4);
        let mut ctx = BuildContext::new(cfg, data);
        DecisionVariables::new().declare_vars(&mut ctx).unwrap();
        ctx
    }

    fn fix_total(ctx: &mut BuildContext, e: usize, hours: usize) {
        for h in 0..4 {
            let x = ctx.vars.worked.get(&(e, 0, h)).unwrap();
            ctx.model.add_eq(x, i64::from(h < hours));
        }
    }

    #[test]
    fn test_target_floor_and_ceil() {
        let ctx = ctx_with(vec![Staff::new(0, "A"), Staff::new(1, "B")]);
        assert_eq!(Fairness::target(&ctx), (1, 2));
    }

    #[test]
    fn test_deviation_penalty_grows_convexly() {
        let ctx = ctx_with(vec![Staff::new(0, "A")]);
        let rule = Fairness::from_settings(&RuleKind::Fairness.default_settings(), &ctx).unwrap();
        let table = rule.deviation_table();
        assert_eq!(table.cap(), 4);
        let steps: Vec<i64> = table.values().windows(2).map(|w| w[1] - w[0]).collect();
        assert!(steps.iter().all(|s| *s > 0));
        assert!(steps.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_deviation_penalty_value() {
        let mut ctx = ctx_with(vec![Staff::new(0, "A")]);
        let mut rule = Fairness::from_settings(&Settings::new(), &ctx).unwrap();
        fix_total(&mut ctx, 0, 0);
        rule.add_soft(&mut ctx).unwrap();
        let terms = rule.contribute_objective(&ctx).unwrap();
        assert_eq!(terms.len(), 1);
        ctx.model.minimize(LinearExpr::sum(terms));
        let resp = solve_with_limit(&ctx.model, Duration::from_secs(5));
        assert_eq!(resp.status, SolveStatus::Optimal);
        // target 3, worked 0 → dev 3 → round(1.4) + round(1.96) + round(2.744)
        assert_eq!(resp.objective, Some(1 + 2 + 3));
    }

    #[test]
    fn test_band_shortfall_only_for_senior_staff() {
        let mut ctx = ctx_with(vec![Staff::new(0, "A").with_band(2), Staff::new(1, "B")]);
        let settings = Settings::new().with("scale", 0.0);
        let mut rule = Fairness::from_settings(&settings, &ctx).unwrap();
        fix_total(&mut ctx, 0, 0);
        fix_total(&mut ctx, 1, 4);
        rule.add_soft(&mut ctx).unwrap();
        let terms = rule.contribute_objective(&ctx).unwrap();
        assert_eq!(terms.len(), 1);
        ctx.model.minimize(LinearExpr::sum(terms));
        let resp = solve_with_limit(&ctx.model, Duration::from_secs(5));
        // fleet average 2, shortfall 2 → round(2.5·1.25) + round(2.5·1.5625)
        assert_eq!(resp.objective, Some(3 + 4));
    }

    fn band_shortfall_cost(band: u32) -> Option<i64> {
        let mut ctx = ctx_with(vec![Staff::new(0, "A").with_band(band), Staff::new(1, "B")]);
        let settings = Settings::new().with("scale", 0.0);
        let mut rule = Fairness::from_settings(&settings, &ctx).unwrap();
        fix_total(&mut ctx, 0, 0);
        fix_total(&mut ctx, 1, 4);
        rule.add_soft(&mut ctx).unwrap();
        ctx.model.minimize(LinearExpr::sum(rule.contribute_objective(&ctx).unwrap()));
        solve_with_limit(&ctx.model, Duration::from_secs(5)).objective
    }

    #[test]
    fn test_higher_band_pays_more_for_same_shortfall() {
        let band2 = band_shortfall_cost(2).unwrap();
        let band3 = band_shortfall_cost(3).unwrap();
        let band4 = band_shortfall_cost(4).unwrap();
        assert_eq!(band2, 3 + 4);
        // scale 2.5 · 1.25 = 3.125 → round(3.90625) + round(4.8828125)
        assert_eq!(band3, 4 + 5);
        assert!(band4 > band3);
    }

    #[test]
    fn test_tables_built_per_present_band() {
        let ctx = ctx_with(vec![
            Staff::new(0, "A").with_band(3),
            Staff::new(1, "B").with_band(1),
            Staff::new(2, "C").with_band(3),
        ]);
        let rule = Fairness::from_settings(&Settings::new(), &ctx).unwrap();
        assert!(rule.shortfall_table(1).is_none());
        assert!(rule.shortfall_table(2).is_none());
        let table = rule.shortfall_table(3).unwrap();
        assert!((table.scale() - 2.5 * 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_band_base_must_exceed_one() {
        let ctx = ctx_with(vec![Staff::new(0, "A").with_band(3)]);
        let settings = Settings::new().with("band_shortfall_band_base", 1.0);
        assert!(matches!(
            Fairness::from_settings(&settings, &ctx),
            Err(RosterError::InvalidSetting { key, .. }) if key == "band_shortfall_band_base"
        ));
    }

    #[test]
    fn test_overflowing_deviation_table_is_an_error() {
        let mut cfg = Config::new(7, 24);
        cfg.require_skill_everywhere("ANY", 1, CoverageBound::Min);
        let data = InputData::unrestricted(vec![Staff::new(0, "A"), Staff::new(1, "B")], 24);
        let ctx = BuildContext::new(cfg, data);
        let settings = Settings::new().with("max_deviation_hours", 100).with("base", 2.0);
        assert!(matches!(
            Fairness::from_settings(&settings, &ctx),
            Err(RosterError::InvalidSetting { key, .. }) if key == "max_deviation_hours"
        ));
    }

    #[test]
    fn test_no_shortfall_with_single_employee() {
        let mut ctx = ctx_with(vec![Staff::new(0, "A").with_band(3)]);
        let settings = Settings::new().with("scale", 0.0);
        let mut rule = Fairness::from_settings(&settings, &ctx).unwrap();
        rule.add_soft(&mut ctx).unwrap();
        assert!(rule.contribute_objective(&ctx).unwrap().is_empty());
    }
}
