//! Coverage metrics for a solved roster.
//!
//! Reporting helpers that compare the worked hours against the minima grid.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Skill demand hours | `Σ_{d,h,s} SKILL_MIN[d][h][s]` |
//! | People-hour lower bound | `Σ_{d,h} max_s SKILL_MIN[d][h][s]` |
//! | Assigned people-hours | `Σ x` |
//! | Hours on demanded slots | worked hours in cells with positive demand |
//! | Hours in zero-demand slots | worked hours in cells without demand |
//! | Covered skills | skill copies matched by the greedy cover |
//! | Unmatched on demand | hours on demanded slots that matched no skill copy |
//!
//! Skill copies are matched with a single greedy pass that serves the
//! rarest demanded skill first. It is a reporting approximation, not a
//! maximum bipartite matching, and can undercount coverage the solver
//! actually achieved.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::extract::SolvedVariables;
use crate::models::{InputData, Staff};

/// Aggregate coverage figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageMetrics {
    /// Sum of all skill minima.
    pub skill_demand_hours: u64,
    /// Sum of the per-cell largest minimum.
    pub people_hour_lower_bound: u64,
    /// Total worked hours.
    pub assigned_people_hours: u64,
    /// Worked hours in cells with positive demand.
    pub assignment_hours_on_demanded_slots: u64,
    /// Worked hours in cells without demand.
    pub assignment_hours_in_zero_demand_slots: u64,
    /// Skill copies covered by the greedy match.
    pub covered_skills: u64,
    /// Worked hours on demanded slots left unmatched.
    pub unmatched_assignments_on_demand: u64,
}

/// Greedy skill cover of one cell.
///
/// Every skill with a positive minimum contributes that many copies; copies
/// are served rarest skill first, each by the first unused assigned employee
/// holding it. Returns `(covered, unmatched)` where `unmatched` counts
/// assigned employees that served no copy.
pub fn greedy_cover(assigned: &[&Staff], required: &BTreeMap<String, u32>) -> (u64, u64) {
    let mut demand: Vec<&str> = Vec::new();
    for (skill, &k) in required.iter().filter(|(_, k)| **k > 0) {
        demand.extend(std::iter::repeat(skill.as_str()).take(k as usize));
    }
    let frequency: BTreeMap<&str, usize> = required
        .iter()
        .filter(|(_, k)| **k > 0)
        .map(|(s, k)| (s.as_str(), *k as usize))
        .collect();
    demand.sort_by_key(|s| frequency.get(s).copied().unwrap_or(0));

    let mut used = vec![false; assigned.len()];
    let mut covered = 0u64;
    for skill in demand {
        let pick = assigned
            .iter()
            .enumerate()
            .find(|(i, staff)| !used[*i] && staff.has_skill(skill));
        if let Some((i, _)) = pick {
            used[i] = true;
            covered += 1;
        }
    }
    (covered, assigned.len() as u64 - covered)
}

/// Computes [`CoverageMetrics`] for a solved roster.
pub fn coverage_metrics(cfg: &Config, data: &InputData, solved: &SolvedVariables) -> CoverageMetrics {
    let mut m = CoverageMetrics {
        people_hour_lower_bound: cfg.headcount_lower_bound(),
        ..CoverageMetrics::default()
    };
    let empty = BTreeMap::new();
    for d in 0..cfg.days {
        for h in 0..cfg.hours {
            let required = cfg.min_cell(d, h).unwrap_or(&empty);
            let demand: u64 = required.values().map(|k| u64::from(*k)).sum();
            m.skill_demand_hours += demand;

            let assigned: Vec<&Staff> = solved
                .working_at(d, h)
                .into_iter()
                .filter_map(|e| data.staff.get(e))
                .collect();
            let count = assigned.len() as u64;
            m.assigned_people_hours += count;
            if demand > 0 {
                m.assignment_hours_on_demanded_slots += count;
                let (covered, unmatched) = greedy_cover(&assigned, required);
                m.covered_skills += covered;
                m.unmatched_assignments_on_demand += unmatched;
            } else {
                m.assignment_hours_in_zero_demand_slots += count;
            }
        }
    }
    m
}

// ===== Slot gaps =====

/// Staffing gap of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGap {
    /// Day index.
    pub day: usize,
    /// Hour of day.
    pub hour: usize,
    /// Largest minimum in the cell.
    pub required: u32,
    /// Staff working the cell.
    pub assigned: u32,
    /// Staff whose mask and holidays allow the cell.
    pub available_upper_bound: u32,
    /// `max(required - assigned, 0)`.
    pub deficit: u32,
    /// No roster could meet the requirement.
    pub unattainable: bool,
}

/// Cells with positive demand, worst first (unattainable, then deficit,
/// then requirement), truncated to `top`.
pub fn slot_gaps(cfg: &Config, data: &InputData, solved: &SolvedVariables, top: usize) -> Vec<SlotGap> {
    let holidays: Vec<BTreeSet<usize>> = data.staff.iter().map(|s| s.holiday_days(cfg)).collect();
    let mut gaps = Vec::new();
    for d in 0..cfg.days {
        for h in 0..cfg.hours {
            let required = cfg.headcount_at(d, h);
            if required == 0 {
                continue;
            }
            let assigned = solved.working_at(d, h).len() as u32;
            let available = (0..data.len())
                .filter(|e| data.is_allowed(*e, h) && !holidays[*e].contains(&d))
                .count() as u32;
            gaps.push(SlotGap {
                day: d,
                hour: h,
                required,
                assigned,
                available_upper_bound: available,
                deficit: required.saturating_sub(assigned),
                unattainable: required > available,
            });
        }
    }
    gaps.sort_by(|a, b| {
        b.unattainable
            .cmp(&a.unattainable)
            .then(b.deficit.cmp(&a.deficit))
            .then(b.required.cmp(&a.required))
    });
    gaps.truncate(top);
    gaps
}

/// Mean head count per hour of day over the horizon.
pub fn average_staffing_by_hour(cfg: &Config, solved: &SolvedVariables) -> Vec<f64> {
    let days = cfg.days.max(1) as f64;
    (0..cfg.hours)
        .map(|h| {
            let total: usize = (0..cfg.days).map(|d| solved.working_at(d, h).len()).sum();
            total as f64 / days
        })
        .collect()
}
