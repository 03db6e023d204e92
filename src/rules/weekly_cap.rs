//! Weekly hour cap.

use super::{BuildContext, Rule};
use crate::config::Config;
use crate::error::Result;

/// `T_e ≤ WEEKLY_MAX_HOURS` for every employee, using the shared total-hours
/// variable. Opts out when no cap is configured.
#[derive(Debug)]
pub struct WeeklyCap {
    cap: i64,
}

impl WeeklyCap {
    /// The rule, or `None` when the cap is disabled.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        cfg.weekly_max_hours.map(|cap| Self {
            cap: i64::from(cap),
        })
    }
}

impl Rule for WeeklyCap {
    fn name(&self) -> &'static str {
        "WeeklyCap"
    }

    fn add_hard(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let cap = self.cap;
        for e in 0..ctx.num_staff() {
            let total = ctx.total_hours(e)?;
            let guard = ctx.guard(|| format!("WEEKLY-CAP[e={e},max={cap}]"));
            ctx.model.add_le(total, cap).only_enforce_if(guard);
        }
        Ok(())
    }
}
