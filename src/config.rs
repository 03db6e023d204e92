//! Problem configuration.
//!
//! [`Config`] is an explicit value passed down to every component: planning
//! horizon, shift bounds, rest, night window, coverage grids, weekly cap and
//! solver limits. There is no process-wide default instance.
//!
//! Coverage is expressed as two grids indexed `[day][hour]`, each cell a map
//! from skill label to a head count: [`Config::skill_min`] holds minima and
//! [`Config::skill_max`] holds maxima.
//!
//! # Example
//!
//! ```
//! use u_roster::config::{hours_between, Config, CoverageBound};
//!
//! let mut cfg = Config::new(7, 24).with_shift_bounds(4, 12);
//! cfg.require_skill_everywhere("ANY", 2, CoverageBound::Min);
//! cfg.require_skill_in_slots("A", |_| true, hours_between(22.0, 6.0, 24), 1, CoverageBound::Min);
//!
//! assert_eq!(cfg.min_requirement(0, 23, "A"), Some(1));
//! assert_eq!(cfg.min_requirement(0, 12, "A"), None);
//! assert!(cfg.validate().is_ok());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::cp::SolverParams;
use crate::validation::{self, ValidationResult};

/// Skill requirements per `[day][hour]` cell: skill label → head count.
pub type SkillGrid = Vec<Vec<BTreeMap<String, u32>>>;

/// The implicit skill every staff member holds.
pub const ANY_SKILL: &str = "ANY";

/// Which coverage grid a helper writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageBound {
    /// Minimum head count (`skill_min`).
    Min,
    /// Maximum head count (`skill_max`).
    Max,
}

/// Rostering problem configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of days in the horizon.
    pub days: usize,
    /// Hours per day.
    pub hours: usize,
    /// Calendar date of day 0.
    pub start_date: NaiveDate,
    /// Minimum realized shift length, hours (> 0).
    pub min_shift_hours: u32,
    /// Maximum declared shift length, hours (≤ `hours`).
    pub max_shift_hours: u32,
    /// Minimum rest between consecutive shifts, hours. `0` disables rest.
    pub rest_hours: u32,
    /// First hour of the night window.
    pub night_shift_start: u32,
    /// Hour the night window ends (exclusive); also where day work starts.
    pub night_shift_end: u32,
    /// Extra hours a night worker may run into the day window.
    pub night_to_day_slack_hours: u32,
    /// Extra hours a day worker may run into the night window.
    pub day_to_night_slack_hours: u32,
    /// Coverage minima.
    pub skill_min: SkillGrid,
    /// Coverage maxima.
    pub skill_max: SkillGrid,
    /// Optional cap on total hours per employee over the horizon.
    pub weekly_max_hours: Option<u32>,
    /// Solver wall-clock limit, seconds.
    pub time_limit_sec: f64,
    /// Parallel search workers.
    pub num_parallel_workers: usize,
    /// Minimum seconds between progress log lines.
    pub log_solutions_frequency_sec: f64,
    /// Attach assumption literals and report grouped conflicts on
    /// infeasibility.
    pub enable_unsat_core: bool,
    /// Seed for randomized solver workers.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(7, 24)
    }
}

impl Config {
    /// Creates a configuration with the given horizon and default settings.
    ///
    /// Coverage grids start empty (no requirements).
    pub fn new(days: usize, hours: usize) -> Self {
        Self {
            days,
            hours,
            start_date: NaiveDate::from_ymd_opt(2025, 10, 13).unwrap_or_default(),
            min_shift_hours: 1,
            max_shift_hours: 18,
            rest_hours: 12,
            night_shift_start: 18,
            night_shift_end: 6,
            night_to_day_slack_hours: 2,
            day_to_night_slack_hours: 1,
            skill_min: Vec::new(),
            skill_max: Vec::new(),
            weekly_max_hours: Some(40),
            time_limit_sec: 30.0,
            num_parallel_workers: 5,
            log_solutions_frequency_sec: 5.0,
            enable_unsat_core: true,
            seed: 0,
        }
    }

    // ===== Builders =====

    /// Sets the start date.
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = date;
        self
    }

    /// Sets minimum and maximum shift length.
    pub fn with_shift_bounds(mut self, min_hours: u32, max_hours: u32) -> Self {
        self.min_shift_hours = min_hours;
        self.max_shift_hours = max_hours;
        self
    }

    /// Sets the rest requirement.
    pub fn with_rest_hours(mut self, hours: u32) -> Self {
        self.rest_hours = hours;
        self
    }

    /// Sets the night window `[start, end)` (wrapping).
    pub fn with_night_window(mut self, start: u32, end: u32) -> Self {
        self.night_shift_start = start;
        self.night_shift_end = end;
        self
    }

    /// Sets the slack hours between windows.
    pub fn with_slack(mut self, night_to_day: u32, day_to_night: u32) -> Self {
        self.night_to_day_slack_hours = night_to_day;
        self.day_to_night_slack_hours = day_to_night;
        self
    }

    /// Sets or clears the per-employee hour cap.
    pub fn with_weekly_max_hours(mut self, cap: Option<u32>) -> Self {
        self.weekly_max_hours = cap;
        self
    }

    /// Sets the solver time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_sec = seconds;
        self
    }

    /// Sets the number of parallel workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_parallel_workers = workers;
        self
    }

    /// Enables or disables infeasibility diagnosis.
    pub fn with_unsat_core(mut self, enabled: bool) -> Self {
        self.enable_unsat_core = enabled;
        self
    }

    /// Sets the progress log interval in seconds.
    pub fn with_log_frequency(mut self, seconds: f64) -> Self {
        self.log_solutions_frequency_sec = seconds;
        self
    }

    /// Sets the solver seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // ===== Coverage grids =====

    /// Resizes both grids to `days × hours`, keeping existing cells.
    pub fn ensure_skill_grids(&mut self) {
        for grid in [&mut self.skill_min, &mut self.skill_max] {
            grid.resize_with(self.days, Vec::new);
            for row in grid.iter_mut() {
                row.resize_with(self.hours, BTreeMap::new);
            }
        }
    }

    fn grid_mut(&mut self, bound: CoverageBound) -> &mut SkillGrid {
        match bound {
            CoverageBound::Min => &mut self.skill_min,
            CoverageBound::Max => &mut self.skill_max,
        }
    }

    /// Requires `k` of `skill` in every cell. Existing larger values win.
    pub fn require_skill_everywhere(&mut self, skill: &str, k: u32, bound: CoverageBound) {
        self.require_skill_in_slots(skill, |_| true, |_| true, k, bound);
    }

    /// Requires `k` of `skill` in every cell whose day and hour pass the
    /// predicates. Existing larger values win.
    pub fn require_skill_in_slots(
        &mut self,
        skill: &str,
        day_ok: impl Fn(usize) -> bool,
        hour_ok: impl Fn(usize) -> bool,
        k: u32,
        bound: CoverageBound,
    ) {
        self.ensure_skill_grids();
        let (days, hours) = (self.days, self.hours);
        let grid = self.grid_mut(bound);
        for (d, row) in grid.iter_mut().enumerate().take(days) {
            if !day_ok(d) {
                continue;
            }
            for (h, cell) in row.iter_mut().enumerate().take(hours) {
                if !hour_ok(h) {
                    continue;
                }
                let cur = cell.entry(skill.to_string()).or_insert(0);
                *cur = (*cur).max(k);
            }
        }
    }

    /// Seeds `k` of `skill` in every cell when the minima grid has no
    /// requirement at all. Returns whether anything was seeded.
    pub fn seed_default_coverage(&mut self, skill: &str, k: u32) -> bool {
        if k == 0 || self.skill_min.iter().flatten().any(|cell| !cell.is_empty()) {
            return false;
        }
        self.require_skill_everywhere(skill, k, CoverageBound::Min);
        true
    }

    /// Minima cell, if the grid covers `(day, hour)`.
    pub fn min_cell(&self, day: usize, hour: usize) -> Option<&BTreeMap<String, u32>> {
        self.skill_min.get(day).and_then(|row| row.get(hour))
    }

    /// Maxima cell, if the grid covers `(day, hour)`.
    pub fn max_cell(&self, day: usize, hour: usize) -> Option<&BTreeMap<String, u32>> {
        self.skill_max.get(day).and_then(|row| row.get(hour))
    }

    /// Minimum head count of `skill` at `(day, hour)`, if specified.
    pub fn min_requirement(&self, day: usize, hour: usize, skill: &str) -> Option<u32> {
        self.min_cell(day, hour).and_then(|c| c.get(skill)).copied()
    }

    /// Maximum head count of `skill` at `(day, hour)`, if specified.
    pub fn max_requirement(&self, day: usize, hour: usize, skill: &str) -> Option<u32> {
        self.max_cell(day, hour).and_then(|c| c.get(skill)).copied()
    }

    /// Skill-agnostic head count needed at `(day, hour)`: the largest
    /// single-skill minimum in the cell.
    pub fn headcount_at(&self, day: usize, hour: usize) -> u32 {
        self.min_cell(day, hour)
            .and_then(|c| c.values().max().copied())
            .unwrap_or(0)
    }

    /// People-hour lower bound implied by the minima grid:
    /// `Σ_{d,h} max_s skill_min[d][h][s]`.
    pub fn headcount_lower_bound(&self) -> u64 {
        (0..self.days)
            .flat_map(|d| (0..self.hours).map(move |h| (d, h)))
            .map(|(d, h)| u64::from(self.headcount_at(d, h)))
            .sum()
    }

    /// Every skill label mentioned with a positive minimum.
    pub fn required_skills(&self) -> BTreeSet<String> {
        self.skill_min
            .iter()
            .flatten()
            .flat_map(|cell| cell.iter())
            .filter(|(_, k)| **k > 0)
            .map(|(s, _)| s.clone())
            .collect()
    }

    // ===== Derived values =====

    /// Calendar date of day index `day`.
    pub fn date_of(&self, day: usize) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(day as u64))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Day index of `date`, if it falls inside the horizon.
    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start_date).num_days();
        usize::try_from(offset).ok().filter(|d| *d < self.days)
    }

    /// Solver parameters derived from this config.
    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            time_limit: Duration::from_secs_f64(self.time_limit_sec.max(0.0)),
            num_workers: self.num_parallel_workers.max(1),
            seed: self.seed,
        }
    }

    /// Checks configuration invariants. See [`validation::validate_config`].
    pub fn validate(&self) -> ValidationResult {
        validation::validate_config(self)
    }
}

/// Predicate over hour indices for the wrapping window `[start, end)`.
///
/// Boundaries may be fractional (`22.5` to `6.0`); an hour `h` is inside
/// when `(h - start) mod period < (end - start) mod period`. Equal
/// boundaries select no hour.
///
/// ```
/// use u_roster::config::hours_between;
///
/// let night = hours_between(22.0, 6.0, 24);
/// assert!(night(23) && night(0) && night(5));
/// assert!(!night(6) && !night(21));
/// ```
pub fn hours_between(start: f64, end: f64, period: usize) -> impl Fn(usize) -> bool {
    let p = period as f64;
    let start = start.rem_euclid(p);
    let end = end.rem_euclid(p);
    let length = (end - start).rem_euclid(p);
    move |h| h < period && (h as f64 - start).rem_euclid(p) < length
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.days, 7);
        assert_eq!(cfg.hours, 24);
        assert_eq!(cfg.start_date, NaiveDate::from_ymd_opt(2025, 10, 13).unwrap());
        assert_eq!(cfg.rest_hours, 12);
        assert_eq!(cfg.weekly_max_hours, Some(40));
        assert!(cfg.enable_unsat_core);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_require_keeps_maximum() {
        let mut cfg = Config::new(2, 4);
        cfg.require_skill_everywhere("A", 2, CoverageBound::Min);
        cfg.require_skill_everywhere("A", 1, CoverageBound::Min);
        assert_eq!(cfg.min_requirement(1, 3, "A"), Some(2));
        assert_eq!(cfg.max_requirement(1, 3, "A"), None);

        cfg.require_skill_in_slots("A", |d| d == 1, |h| h < 2, 3, CoverageBound::Min);
        assert_eq!(cfg.min_requirement(1, 1, "A"), Some(3));
        assert_eq!(cfg.min_requirement(0, 1, "A"), Some(2));
        assert_eq!(cfg.min_requirement(1, 2, "A"), Some(2));
    }

    #[test]
    fn test_hours_between_wraps() {
        let window = hours_between(18.0, 6.0, 24);
        let hours: Vec<usize> = (0..24).filter(|h| window(*h)).collect();
        assert_eq!(hours, vec![0, 1, 2, 3, 4, 5, 18, 19, 20, 21, 22, 23]);

        let day = hours_between(6.0, 18.0, 24);
        assert_eq!((0..24).filter(|h| day(*h)).count(), 12);

        let empty = hours_between(5.0, 5.0, 24);
        assert!((0..24).all(|h| !empty(h)));

        let fractional = hours_between(22.5, 6.0, 24);
        assert!(!fractional(22));
        assert!(fractional(23));
        assert!(!fractional(24));
    }

    #[test]
    fn test_headcount_lower_bound_uses_cell_maximum() {
        let mut cfg = Config::new(1, 3);
        cfg.require_skill_everywhere("ANY", 1, CoverageBound::Min);
        cfg.require_skill_in_slots("A", |_| true, |h| h == 0, 3, CoverageBound::Min);
        assert_eq!(cfg.headcount_at(0, 0), 3);
        assert_eq!(cfg.headcount_lower_bound(), 3 + 1 + 1);
        assert_eq!(
            cfg.required_skills().into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "ANY".to_string()]
        );
    }

    #[test]
    fn test_seed_default_coverage_only_when_empty() {
        let mut cfg = Config::new(2, 2);
        assert!(cfg.seed_default_coverage("ANY", 1));
        assert_eq!(cfg.headcount_lower_bound(), 4);
        assert!(!cfg.seed_default_coverage("ANY", 5));
        assert_eq!(cfg.headcount_lower_bound(), 4);
    }

    #[test]
    fn test_dates() {
        let cfg = Config::default();
        assert_eq!(cfg.date_of(2), NaiveDate::from_ymd_opt(2025, 10, 15).unwrap());
        assert_eq!(cfg.day_index(NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()), Some(6));
        assert_eq!(cfg.day_index(NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()), None);
        assert_eq!(cfg.day_index(NaiveDate::from_ymd_opt(2025, 10, 12).unwrap()), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut cfg = Config::new(3, 24).with_weekly_max_hours(None);
        cfg.require_skill_everywhere("A", 1, CoverageBound::Max);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);

        let partial: Config = serde_json::from_str(r#"{"days": 2, "rest_hours": 8}"#).unwrap();
        assert_eq!(partial.days, 2);
        assert_eq!(partial.hours, 24);
        assert_eq!(partial.rest_hours, 8);
    }

    #[test]
    fn test_solver_params() {
        let params = Config::default().with_time_limit(2.5).with_workers(3).solver_params();
        assert_eq!(params.time_limit, Duration::from_millis(2500));
        assert_eq!(params.num_workers, 3);
    }
}
