//! Rest between consecutive shifts.

use super::{BuildContext, Rule};
use crate::config::Config;
use crate::error::Result;

/// `y[e,d] ∧ y[e,d+1] ⇒ S[e,d+1] ≥ REST + S[e,d] + L[e,d] - H`.
///
/// Opts out when `REST_HOURS = 0`. Each constraint is labelled
/// `REST[e=..,d=..,hours=..]` when diagnosis is on.
#[derive(Debug)]
pub struct Rest {
    rest_hours: i64,
}

impl Rest {
    /// The rule, or `None` when no rest is required.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        (cfg.rest_hours > 0).then(|| Self {
            rest_hours: i64::from(cfg.rest_hours),
        })
    }
}

impl Rule for Rest {
    fn name(&self) -> &'static str {
        "Rest"
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let (n, days, hours) = ctx.dims();
        let period = hours as i64;
        let rest = self.rest_hours;
        for e in 0..n {
            for d in 0..days.saturating_sub(1) {
                let y_today = ctx.vars.shift.get(&(e, d))?;
                let y_next = ctx.vars.shift.get(&(e, d + 1))?;
                let s_today = ctx.vars.start.get(&(e, d))?;
                let l_today = ctx.vars.length.get(&(e, d))?;
                let s_next = ctx.vars.start.get(&(e, d + 1))?;
                let guard = ctx.guard(|| format!("REST[e={e},d={d},hours={rest}]"));
                ctx.model
                    .add_ge(s_next, s_today + l_today + (rest - period))
                    .only_enforce_if([y_today.literal(), y_next.literal()].into_iter().chain(guard));
            }
        }
        Ok(())
    }
}
