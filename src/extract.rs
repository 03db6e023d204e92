//! Roster extraction from a solved model.
//!
//! [`SolvedVariables`] snapshots the values of the hourly, interval and
//! run-length variables once; the `extract_*` functions turn that snapshot
//! into flat, serialisable rows for the caller to report or persist.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::cp::{CpResponse, IntVar};
use crate::error::Result;
use crate::rules::BuildContext;

/// A solved shift interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvedInterval {
    /// Start hour.
    pub start: u32,
    /// Declared length in hours.
    pub length: u32,
}

/// Values of the roster variables in one solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedVariables {
    /// `worked[e][d][h]`.
    pub worked: Vec<Vec<Vec<bool>>>,
    /// `intervals[e][d]`, `None` when no shift that day.
    pub intervals: Vec<Vec<Option<SolvedInterval>>>,
    /// `run_length[e][d]`; empty when run tracking is disabled.
    pub run_length: Vec<Vec<u32>>,
}

impl SolvedVariables {
    /// Reads the variables of `ctx` from `response`. Missing values read as
    /// zero, so a response without a solution yields an empty roster.
    pub fn from_response(ctx: &BuildContext, response: &CpResponse) -> Result<Self> {
        let (n, days, hours) = ctx.dims();
        let value = |var: IntVar| response.value(var).unwrap_or(0);
        let vars = &ctx.vars;

        let mut worked = vec![vec![vec![false; hours]; days]; n];
        let mut intervals = vec![vec![None; days]; n];
        for e in 0..n {
            for d in 0..days {
                for h in 0..hours {
                    worked[e][d][h] = value(vars.worked.get(&(e, d, h))?.into()) == 1;
                }
                if value(vars.shift.get(&(e, d))?.into()) == 1 {
                    intervals[e][d] = Some(SolvedInterval {
                        start: value(vars.start.get(&(e, d))?) as u32,
                        length: value(vars.length.get(&(e, d))?) as u32,
                    });
                }
            }
        }

        let run_length = if vars.run_length.is_empty() {
            Vec::new()
        } else {
            let mut runs = vec![vec![0; days]; n];
            for (e, row) in runs.iter_mut().enumerate() {
                for (d, run) in row.iter_mut().enumerate() {
                    *run = value(vars.run_length.get(&(e, d))?) as u32;
                }
            }
            runs
        };

        Ok(Self {
            worked,
            intervals,
            run_length,
        })
    }

    /// Total hours worked by employee `e`.
    pub fn hours_of(&self, e: usize) -> u32 {
        self.worked
            .get(e)
            .map_or(0, |days| days.iter().flatten().filter(|w| **w).count() as u32)
    }

    /// Employees (by index) working hour `h` of day `d`.
    pub fn working_at(&self, d: usize, h: usize) -> Vec<usize> {
        self.worked
            .iter()
            .enumerate()
            .filter(|(_, days)| days.get(d).and_then(|row| row.get(h)).copied().unwrap_or(false))
            .map(|(e, _)| e)
            .collect()
    }
}

// ===== Rows =====

/// One worked hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyAssignment {
    /// Day index.
    pub day: usize,
    /// Calendar date of the day.
    pub date: NaiveDate,
    /// Hour of day.
    pub hour: usize,
    /// Staff ID.
    pub employee: u32,
    /// Staff name.
    pub name: String,
    /// Staff band.
    pub band: u32,
}

/// One declared shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    /// Staff ID.
    pub employee: u32,
    /// Staff name.
    pub name: String,
    /// Start date.
    pub start_date: NaiveDate,
    /// Start hour.
    pub start_hour: u32,
    /// End date; the next date when the shift crosses midnight.
    pub end_date: NaiveDate,
    /// End hour (exclusive).
    pub end_hour: u32,
    /// Declared length `L`.
    pub model_length: u32,
    /// Day index of the start.
    pub day: usize,
}

/// Hours per employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeTotal {
    /// Staff ID.
    pub employee: u32,
    /// Staff name.
    pub name: String,
    /// Staff band.
    pub band: u32,
    /// Night worker flag.
    pub night_worker: bool,
    /// Hours worked over the horizon.
    pub hours: u32,
}

/// Worked hours ordered by day, hour, then staff ID.
pub fn extract_hourly(ctx: &BuildContext, solved: &SolvedVariables) -> Vec<HourlyAssignment> {
    let mut rows = Vec::new();
    for (e, days) in solved.worked.iter().enumerate() {
        let staff = &ctx.data.staff[e];
        for (d, hours) in days.iter().enumerate() {
            let date = ctx.cfg.date_of(d);
            for (h, _) in hours.iter().enumerate().filter(|(_, w)| **w) {
                rows.push(HourlyAssignment {
                    day: d,
                    date,
                    hour: h,
                    employee: staff.id,
                    name: staff.name.clone(),
                    band: staff.band,
                });
            }
        }
    }
    rows.sort_by_key(|r| (r.day, r.hour, r.employee));
    rows
}

/// Shifts ordered by start date, start hour, then staff ID.
pub fn extract_shifts(ctx: &BuildContext, solved: &SolvedVariables) -> Vec<ShiftRecord> {
    let period = ctx.cfg.hours as u32;
    let mut rows = Vec::new();
    for (e, days) in solved.intervals.iter().enumerate() {
        let staff = &ctx.data.staff[e];
        for (d, interval) in days.iter().enumerate() {
            let Some(interval) = interval else {
                continue;
            };
            let start_date = ctx.cfg.date_of(d);
            let end = interval.start + interval.length;
            let (end_date, end_hour) = if end <= period {
                (start_date, end)
            } else {
                (
                    start_date.checked_add_days(Days::new(1)).unwrap_or(start_date),
                    end - period,
                )
            };
            rows.push(ShiftRecord {
                employee: staff.id,
                name: staff.name.clone(),
                start_date,
                start_hour: interval.start,
                end_date,
                end_hour,
                model_length: interval.length,
                day: d,
            });
        }
    }
    rows.sort_by_key(|r| (r.start_date, r.start_hour, r.employee));
    rows
}

/// Totals ordered by hours descending, then staff ID.
pub fn extract_employee_totals(ctx: &BuildContext, solved: &SolvedVariables) -> Vec<EmployeeTotal> {
    let mut rows: Vec<EmployeeTotal> = ctx
        .data
        .staff
        .iter()
        .enumerate()
        .map(|(e, staff)| EmployeeTotal {
            employee: staff.id,
            name: staff.name.clone(),
            band: staff.band,
            night_worker: staff.is_night_worker,
            hours: solved.hours_of(e),
        })
        .collect();
    rows.sort_by(|a, b| b.hours.cmp(&a.hours).then(a.employee.cmp(&b.employee)));
    rows
}

/// Average and maximum over the positive run lengths. `(0.0, 0)` when no
/// run is positive.
pub fn run_stats(solved: &SolvedVariables) -> (f64, u32) {
    let positive: Vec<u32> = solved
        .run_length
        .iter()
        .flatten()
        .copied()
        .filter(|r| *r > 0)
        .collect();
    if positive.is_empty() {
        return (0.0, 0);
    }
    let sum: u64 = positive.iter().map(|r| u64::from(*r)).sum();
    let max = positive.iter().copied().max().unwrap_or(0);
    (sum as f64 / positive.len() as f64, max)
}
