//! Minimum realised shift length.

use super::{BuildContext, Rule};
use crate::cp::LinearExpr;
use crate::error::Result;

/// `Σ legal hours of the interval starting on day d ≥ MIN · y[e,d]`.
///
/// Counts the legal hours on day `d` plus the legal hours the interval
/// spills into `d + 1`. A day with no legal hours at all cannot hold a
/// shift. The maximum length is already the upper bound of `L`.
#[derive(Debug, Default)]
pub struct MinShiftLength;

impl MinShiftLength {
    /// Creates the rule.
    pub fn new() -> Self {
        Self
    }
}

impl Rule for MinShiftLength {
    fn name(&self) -> &'static str {
        "MinShiftLength"
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, _) = ctx.dims();
        let min_len = i64::from(ctx.cfg.min_shift_hours);
        for e in 0..n {
            for d in 0..days {
                let y = ctx.vars.shift.get(&(e, d))?;
                let realised: Vec<_> = ctx
                    .vars
                    .current_hours
                    .get(&(e, d))
                    .into_iter()
                    .chain(ctx.vars.spill_hours.get(&(e, d)))
                    .flatten()
                    .copied()
                    .collect();
                if realised.is_empty() {
                    ctx.model.add_eq(y, 0);
                } else {
                    ctx.model.add_ge(LinearExpr::sum(realised), y * min_len);
                }
            }
        }
        Ok(())
    }
}
