//! Availability guard.

use super::{BuildContext, Rule};
use crate::error::Result;

/// Forces `x[e,d,h] = 0` outside the allowed-hour mask and on holidays,
/// labelled `AVAIL[e=..,d=..,h=..]`.
///
/// With the built-in rules these constraints are redundant:
/// [`ShiftInterval`](super::ShiftInterval) gives a masked hour no covering
/// source and fixes its `x` to 0 unguarded, and
/// [`Coverage`](super::Coverage) fixes the cover variable of an ineligible
/// employee to 0. An `AVAIL` label therefore never survives core
/// minimisation; a demand that only unavailable staff could meet is reported
/// as `COVER-MIN`. The rule carries the mask on its own when a custom
/// registry swaps out the interval decomposition.
#[derive(Debug, Default)]
pub struct Availability;

impl Availability {
    /// Creates the rule.
    pub fn new() -> Self {
        Self
    }
}

impl Rule for Availability {
    fn name(&self) -> &'static str {
        "Availability"
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, hours) = ctx.dims();
        for e in 0..n {
            for d in 0..days {
                for h in 0..hours {
                    if ctx.is_legal(e, d, h) {
                        continue;
                    }
                    let x = ctx.vars.worked.get(&(e, d, h))?;
                    let guard = ctx.guard(|| format!("AVAIL[e={e},d={d},h={h}]"));
                    ctx.model.add_eq(x, 0).only_enforce_if(guard);
                }
            }
        }
        Ok(())
    }
}
