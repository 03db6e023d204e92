//! Interval → hourly decomposition.
//!
//! Each `(e, d)` has one declared interval `[S, S + L)` guarded by `y`. This
//! rule projects it onto realised hours:
//!
//! ```text
//! cur[e,d,h]  = y[e,d]   ∧ S[e,d] ≤ h ∧ h < S[e,d] + L[e,d]
//! prev[e,d,h] = y[e,d-1] ∧ S[e,d-1] + L[e,d-1] > H ∧ h < S[e,d-1] + L[e,d-1] - H
//! x[e,d,h]    = cur ∨ prev
//! z[e,d]      = ∨_h x[e,d,h]
//! ```
//!
//! where `H` is the number of hours per day. Hours outside the allowed
//! mask or on a holiday get no indicator at all, so `x` is fixed to zero
//! there regardless of the interval. The part of an interval past hour
//! `H` lands on the next day only, never on the originating day.
//!
//! The legal `cur` indicators of day `d` and the legal `prev` indicators
//! that day `d`'s interval spills into `d + 1` are published on the context
//! for the minimum-length rule.
//!
//! # Reference
//! - Bartholdi (1981), "A Guaranteed-Accuracy Round-off Algorithm for Cyclic Scheduling and Set Covering", §2 (hour-level shift columns)

use std::collections::BTreeMap;

use super::{BuildContext, DayKey, HourKey, Rule, VarMap};
use crate::cp::BoolVar;
use crate::error::Result;

/// Indicators for "today's interval covers hour h".
#[derive(Debug, Clone, Copy)]
struct CurrentCell {
    /// `S ≤ h`
    starts_by: BoolVar,
    /// `S + L > h`
    ends_after: BoolVar,
    covered: BoolVar,
}

/// Indicators for "yesterday's interval spills into hour h".
#[derive(Debug, Clone, Copy)]
struct SpillCell {
    /// `S' + L' > H + h`
    reaches: BoolVar,
    covered: BoolVar,
}

/// Links `(y, S, L)` to `x` and `z`.
#[derive(Debug)]
pub struct ShiftInterval {
    current: BTreeMap<HourKey, CurrentCell>,
    /// Keyed by the receiving `(e, d, h)`.
    spill: BTreeMap<HourKey, SpillCell>,
    /// `S + L > H`, keyed by the originating day.
    overflow: VarMap<DayKey, BoolVar>,
}

impl ShiftInterval {
    /// Creates the rule.
    pub fn new() -> Self {
        Self {
            current: BTreeMap::new(),
            spill: BTreeMap::new(),
            overflow: VarMap::new("overflow"),
        }
    }
}

impl Default for ShiftInterval {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ShiftInterval {
    fn name(&self) -> &'static str {
        "ShiftInterval"
    }

    fn declare_vars(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, hours) = ctx.dims();
        for e in 0..n {
            for d in 0..days {
                let mut current_hours = Vec::new();
                for h in 0..hours {
                    if !ctx.is_legal(e, d, h) {
                        continue;
                    }
                    let cell = CurrentCell {
                        starts_by: ctx.model.new_bool_var(format!("starts_by[e={e},d={d},h={h}]")),
                        ends_after: ctx.model.new_bool_var(format!("ends_after[e={e},d={d},h={h}]")),
                        covered: ctx.model.new_bool_var(format!("cur[e={e},d={d},h={h}]")),
                    };
                    current_hours.push(cell.covered);
                    self.current.insert((e, d, h), cell);
                }

                let mut spill_hours = Vec::new();
                if d + 1 < days {
                    self.overflow
                        .insert((e, d), ctx.model.new_bool_var(format!("overflow[e={e},d={d}]")));
                    for h in 0..hours {
                        if !ctx.is_legal(e, d + 1, h) {
                            continue;
                        }
                        let next = d + 1;
                        let cell = SpillCell {
                            reaches: ctx.model.new_bool_var(format!("reaches[e={e},d={next},h={h}]")),
                            covered: ctx.model.new_bool_var(format!("prev[e={e},d={next},h={h}]")),
                        };
                        spill_hours.push(cell.covered);
                        self.spill.insert((e, next, h), cell);
                    }
                }

                ctx.vars.current_hours.insert((e, d), current_hours);
                ctx.vars.spill_hours.insert((e, d), spill_hours);
            }
        }
        Ok(())
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, hours) = ctx.dims();
        let period = hours as i64;
        let vars = &ctx.vars;
        let model = &mut ctx.model;

        for e in 0..n {
            for d in 0..days {
                let y = vars.shift.get(&(e, d))?;
                let s = vars.start.get(&(e, d))?;
                let l = vars.length.get(&(e, d))?;

                if let Some(over) = self.overflow.try_get(&(e, d)) {
                    model.add_ge(s + l, period + 1).only_enforce_if([over]);
                    model.add_le(s + l, period).only_enforce_if([!over]);
                }

                let mut day_hours = Vec::with_capacity(hours);
                for h in 0..hours {
                    let x = vars.worked.get(&(e, d, h))?;
                    let hh = h as i64;
                    let mut sources = Vec::with_capacity(2);

                    if let Some(cell) = self.current.get(&(e, d, h)) {
                        model.add_le(s, hh).only_enforce_if([cell.starts_by]);
                        model.add_ge(s, hh + 1).only_enforce_if([!cell.starts_by]);
                        model.add_ge(s + l, hh + 1).only_enforce_if([cell.ends_after]);
                        model.add_le(s + l, hh).only_enforce_if([!cell.ends_after]);
                        model.add_and_equality(cell.covered, &[y, cell.starts_by, cell.ends_after]);
                        sources.push(cell.covered);
                    }

                    if let Some(cell) = self.spill.get(&(e, d, h)) {
                        let prev = (e, d - 1);
                        let y_prev = vars.shift.get(&prev)?;
                        let s_prev = vars.start.get(&prev)?;
                        let l_prev = vars.length.get(&prev)?;
                        let over = self.overflow.get(&prev)?;
                        model
                            .add_ge(s_prev + l_prev, period + hh + 1)
                            .only_enforce_if([cell.reaches]);
                        model
                            .add_le(s_prev + l_prev, period + hh)
                            .only_enforce_if([!cell.reaches]);
                        model.add_and_equality(cell.covered, &[y_prev, over, cell.reaches]);
                        sources.push(cell.covered);
                    }

                    if sources.is_empty() {
                        model.add_eq(x, 0);
                    } else {
                        model.add_max_equality(x, sources);
                    }
                    day_hours.push(x);
                }

                let z = vars.day_worked.get(&(e, d))?;
                model.add_or_equality(z, &day_hours);
            }
        }
        Ok(())
    }
}
