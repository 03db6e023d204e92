//! Capacity and availability precheck.
//!
//! Cheap necessary conditions evaluated before any model is built:
//!
//! - **Capacity**: `N × MAX_SHIFT_HOURS` against the skill-agnostic demand
//!   `Σ_{d,h} max_s SKILL_MIN[d][h][s]`.
//! - **Per-skill availability**: for every cell with a positive minimum,
//!   the number of staff who hold the skill, are off holiday that day and
//!   whose mask allows the hour. Cells with fewer than the minimum are
//!   reported as shortfalls.
//!
//! A clean precheck does not imply feasibility; a failing one is only a
//! warning, the model is still built and solved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::models::InputData;

/// A cell where fewer staff are available than the minimum requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Day index.
    pub day: usize,
    /// Hour of day.
    pub hour: usize,
    /// Required minimum.
    pub required: u32,
    /// Staff who could be assigned.
    pub available: u32,
}

/// Precheck result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecheckReport {
    /// `N × MAX_SHIFT_HOURS`.
    pub capacity: u64,
    /// Skill-agnostic people-hour demand.
    pub demand: u64,
    /// Skill → shortfall cells, in `(day, hour)` order.
    pub shortfalls: BTreeMap<String, Vec<Shortfall>>,
}

impl PrecheckReport {
    /// Whether capacity covers demand.
    pub fn capacity_ok(&self) -> bool {
        self.capacity >= self.demand
    }

    /// Whether neither check found a problem.
    pub fn is_clean(&self) -> bool {
        self.capacity_ok() && self.shortfalls.is_empty()
    }

    /// Total number of shortfall cells across skills.
    pub fn shortfall_count(&self) -> usize {
        self.shortfalls.values().map(Vec::len).sum()
    }
}

/// Runs the precheck and logs its findings.
pub fn precheck(cfg: &Config, data: &InputData) -> PrecheckReport {
    let capacity = data.len() as u64 * u64::from(cfg.max_shift_hours);
    let demand = cfg.headcount_lower_bound();

    let holidays: Vec<_> = data.staff.iter().map(|s| s.holiday_days(cfg)).collect();
    let mut shortfalls: BTreeMap<String, Vec<Shortfall>> = BTreeMap::new();
    for d in 0..cfg.days {
        for h in 0..cfg.hours {
            let Some(cell) = cfg.min_cell(d, h) else {
                continue;
            };
            for (skill, &required) in cell.iter().filter(|(_, k)| **k > 0) {
                let available = data
                    .staff
                    .iter()
                    .enumerate()
                    .filter(|(e, staff)| {
                        staff.has_skill(skill) && data.is_allowed(*e, h) && !holidays[*e].contains(&d)
                    })
                    .count() as u32;
                if available < required {
                    shortfalls.entry(skill.clone()).or_default().push(Shortfall {
                        day: d,
                        hour: h,
                        required,
                        available,
                    });
                }
            }
        }
    }

    let report = PrecheckReport {
        capacity,
        demand,
        shortfalls,
    };
    if report.capacity_ok() {
        info!(capacity, demand, "precheck capacity ok");
    } else {
        warn!(capacity, demand, "precheck: capacity below demand");
    }
    for (skill, cells) in &report.shortfalls {
        warn!(skill = skill.as_str(), cells = cells.len(), "precheck: skill shortfall");
    }
    report
}
