//! Skill coverage minima and maxima.
//!
//! `a[e,d,h,s]` says that employee `e` covers skill `s` at hour `h` of day
//! `d`. It is allocated only for `(d, h, s)` cells that appear in the minima
//! or maxima grid.
//!
//! ```text
//! a[e,d,h,s] ≤ x[e,d,h]
//! a[e,d,h,s] = 0                       if e lacks s, or (d, h) is illegal for e
//! a[e,d,h,s] ≥ x[e,d,h]                if e is eligible and the cell has a maximum
//! Σ_e a[e,d,h,s] ≥ SKILL_MIN[d][h][s]
//! Σ_e a[e,d,h,s] ≤ SKILL_MAX[d][h][s]
//! ```
//!
//! There is no `Σ_s a[e,d,h,s] ≤ 1`: one worked hour may count toward
//! several skills. Head count and skill coverage are separate ledgers.

use std::collections::BTreeSet;

use super::{BuildContext, Rule};
use crate::cp::LinearExpr;
use crate::error::Result;

/// Posts skill minima and maxima.
#[derive(Debug, Default)]
pub struct Coverage {
    /// `(d, h, skill)` cells with at least one bound.
    cells: BTreeSet<(usize, usize, String)>,
}

impl Coverage {
    /// Creates the rule.
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_cells(ctx: &BuildContext) -> BTreeSet<(usize, usize, String)> {
        let (_, days, hours) = ctx.dims();
        let mut cells = BTreeSet::new();
        for d in 0..days {
            for h in 0..hours {
                for cell in [ctx.cfg.min_cell(d, h), ctx.cfg.max_cell(d, h)].into_iter().flatten() {
                    for skill in cell.keys() {
                        cells.insert((d, h, skill.clone()));
                    }
                }
            }
        }
        cells
    }
}

impl Rule for Coverage {
    fn name(&self) -> &'static str {
        "Coverage"
    }

    fn declare_vars(&mut self, ctx: &mut BuildContext) -> Result<()> {
        self.cells = Self::collect_cells(ctx);
        for (d, h, skill) in &self.cells {
            for e in 0..ctx.num_staff() {
                let a = ctx
                    .model
                    .new_bool_var(format!("a[e={e},d={d},h={h},s={skill}]"));
                ctx.vars.cover.insert((e, *d, *h, skill.clone()), a);
            }
        }
        Ok(())
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        for (d, h, skill) in &self.cells {
            let (d, h) = (*d, *h);
            let min = ctx.cfg.min_requirement(d, h, skill);
            let max = ctx.cfg.max_requirement(d, h, skill);
            let mut covering = LinearExpr::new();

            for e in 0..ctx.num_staff() {
                let a = ctx.vars.cover.get(&(e, d, h, skill.clone()))?;
                let x = ctx.vars.worked.get(&(e, d, h))?;
                ctx.model.add_le(a, x);
                let eligible = ctx.data.staff[e].has_skill(skill) && ctx.is_legal(e, d, h);
                if !eligible {
                    ctx.model.add_eq(a, 0);
                    continue;
                }
                if max.is_some() {
                    ctx.model.add_ge(a, x);
                }
                covering.add_term(a, 1);
            }

            if let Some(k) = min.filter(|k| *k > 0) {
                let guard = ctx.guard(|| format!("COVER-MIN[d={d},h={h},skill={skill}]"));
                ctx.model
                    .add_ge(covering.clone(), i64::from(k))
                    .only_enforce_if(guard);
            }
            if let Some(k) = max {
                let guard = ctx.guard(|| format!("COVER-MAX[d={d},h={h},skill={skill}]"));
                ctx.model.add_le(covering, i64::from(k)).only_enforce_if(guard);
            }
        }
        Ok(())
    }
}
