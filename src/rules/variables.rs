//! Base decision variables.

use super::{BuildContext, Rule};
use crate::error::Result;

/// Declares the dense variable grid: `y[e,d]`, `S[e,d] ∈ 0..HOURS-1`,
/// `L[e,d] ∈ MIN..MAX`, `x[e,d,h]` and `z[e,d]`.
///
/// No constraints are posted here.
#[derive(Debug, Default)]
pub struct DecisionVariables;

impl DecisionVariables {
    /// Creates the rule.
    pub fn new() -> Self {
        Self
    }
}

impl Rule for DecisionVariables {
    fn name(&self) -> &'static str {
        "Variables"
    }

    fn declare_vars(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, hours) = ctx.dims();
        let min_len = i64::from(ctx.cfg.min_shift_hours);
        let max_len = i64::from(ctx.cfg.max_shift_hours);
        let model = &mut ctx.model;
        let vars = &mut ctx.vars;

        for e in 0..n {
            for d in 0..days {
                vars.shift.insert((e, d), model.new_bool_var(format!("y[e={e},d={d}]")));
                vars.start.insert(
                    (e, d),
                    model.new_int_var(0, hours as i64 - 1, format!("S[e={e},d={d}]")),
                );
                vars.length.insert(
                    (e, d),
                    model.new_int_var(min_len, max_len, format!("L[e={e},d={d}]")),
                );
                for h in 0..hours {
                    vars.worked.insert(
                        (e, d, h),
                        model.new_bool_var(format!("x[e={e},d={d},h={h}]")),
                    );
                }
                vars.day_worked.insert((e, d), model.new_bool_var(format!("z[e={e},d={d}]")));
            }
        }
        Ok(())
    }
}
