//! Roster orchestrator.
//!
//! [`RosterModel`] ties the pipeline together:
//!
//! ```text
//! precheck → build_model → solve_model (+ ProgressRecorder) → extract
//! ```
//!
//! Building is explicit so callers can inspect or extend the model before
//! solving; solving before building is an error. Infeasible and unknown
//! outcomes are reported through [`SolveResult::status`] with empty tables,
//! never as errors.
//!
//! # Example
//!
//! ```
//! use u_roster::config::{Config, CoverageBound};
//! use u_roster::models::{InputData, Staff};
//! use u_roster::roster::RosterModel;
//!
//! let mut cfg = Config::new(1, 4)
//!     .with_shift_bounds(1, 4)
//!     .with_rest_hours(0)
//!     .with_weekly_max_hours(None)
//!     .with_time_limit(5.0)
//!     .with_workers(1);
//! cfg.require_skill_in_slots("ANY", |_| true, |h| h < 2, 1, CoverageBound::Min);
//! let data = InputData::unrestricted(vec![Staff::new(0, "Ann")], 4);
//!
//! let mut roster = RosterModel::new(cfg, data);
//! roster.build().unwrap();
//! let result = roster.solve().unwrap();
//! assert!(result.status.has_solution());
//! assert!(result.hourly.iter().any(|row| row.hour == 0));
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::build::build_model;
use crate::config::Config;
use crate::cp::{CpSolver, PumpkinSolver, SolveStatus, SolverStats};
use crate::error::{Result, RosterError};
use crate::extract::{
    extract_employee_totals, extract_hourly, extract_shifts, run_stats, EmployeeTotal, HourlyAssignment,
    ShiftRecord, SolvedVariables,
};
use crate::metrics::{coverage_metrics, slot_gaps, CoverageMetrics, SlotGap};
use crate::models::InputData;
use crate::precheck::{precheck, PrecheckReport};
use crate::rules::{BuildContext, RuleRegistry};
use crate::solve::{solve_model, CoreGroups, ProgressPoint, ProgressRecorder, SolveOutcome};

/// Number of slot gaps kept in a [`SolveResult`].
pub const DEFAULT_GAP_REPORT: usize = 15;

/// Everything one solve produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResult {
    /// Final status.
    pub status: SolveStatus,
    /// Upper-case status name.
    pub status_name: String,
    /// Objective of the best solution.
    pub objective_value: Option<i64>,
    /// Best proven bound.
    pub best_bound: Option<i64>,
    /// Worked hours.
    pub hourly: Vec<HourlyAssignment>,
    /// Declared shifts.
    pub shifts: Vec<ShiftRecord>,
    /// Hours per employee.
    pub employees: Vec<EmployeeTotal>,
    /// Mean positive run length.
    pub avg_run: f64,
    /// Longest run length.
    pub max_run: u32,
    /// Coverage figures, when a roster was found.
    pub coverage: Option<CoverageMetrics>,
    /// Worst staffed cells, when a roster was found.
    pub slot_gaps: Vec<SlotGap>,
    /// Grouped infeasibility labels.
    pub unsat_core_groups: CoreGroups,
    /// Improving solutions in arrival order.
    pub progress_history: Vec<ProgressPoint>,
    /// Search statistics.
    pub solver_stats: SolverStats,
}

impl SolveResult {
    /// Result for an outcome with no usable roster. The solver's objective
    /// and bound are kept.
    fn without_roster(outcome: SolveOutcome, progress_history: Vec<ProgressPoint>) -> Self {
        Self {
            status: outcome.status,
            status_name: outcome.status.name().to_string(),
            objective_value: outcome.objective,
            best_bound: outcome.best_bound,
            hourly: Vec::new(),
            shifts: Vec::new(),
            employees: Vec::new(),
            avg_run: 0.0,
            max_run: 0,
            coverage: None,
            slot_gaps: Vec::new(),
            unsat_core_groups: outcome.core_groups,
            progress_history,
            solver_stats: outcome.stats,
        }
    }
}

/// Precheck, build, solve and extract for one problem.
#[derive(Debug)]
pub struct RosterModel {
    cfg: Config,
    data: InputData,
    registry: RuleRegistry,
    precheck: Option<PrecheckReport>,
    ctx: Option<BuildContext>,
}

impl RosterModel {
    /// Orchestrator with the default rules.
    pub fn new(cfg: Config, data: InputData) -> Self {
        Self {
            cfg,
            data,
            registry: RuleRegistry::default(),
            precheck: None,
            ctx: None,
        }
    }

    /// Replaces the rule registry. Drops any built model.
    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self.ctx = None;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The built model, if [`build`](Self::build) succeeded.
    pub fn context(&self) -> Option<&BuildContext> {
        self.ctx.as_ref()
    }

    /// Mutable access to the built model, for adding constraints before
    /// solving.
    pub fn context_mut(&mut self) -> Option<&mut BuildContext> {
        self.ctx.as_mut()
    }

    /// Runs (once) and returns the precheck.
    pub fn precheck(&mut self) -> &PrecheckReport {
        let (cfg, data) = (&self.cfg, &self.data);
        self.precheck.get_or_insert_with(|| precheck(cfg, data))
    }

    /// Runs the precheck, then builds the model.
    pub fn build(&mut self) -> Result<&BuildContext> {
        self.precheck();
        let ctx = build_model(self.cfg.clone(), self.data.clone(), &self.registry)?;
        Ok(&*self.ctx.insert(ctx))
    }

    /// Solves with [`PumpkinSolver`].
    pub fn solve(&self) -> Result<SolveResult> {
        self.solve_with(&PumpkinSolver::new())
    }

    /// Solves with `solver`.
    ///
    /// # Errors
    /// [`RosterError::NotBuilt`] when [`build`](Self::build) has not run.
    pub fn solve_with(&self, solver: &dyn CpSolver) -> Result<SolveResult> {
        let ctx = self.ctx.as_ref().ok_or(RosterError::NotBuilt)?;
        let mut recorder = ProgressRecorder::new(ctx.cfg.log_solutions_frequency_sec);
        let outcome = solve_model(ctx, solver, Some(&mut recorder));

        if !outcome.status.has_solution() {
            info!(
                status = outcome.status.name(),
                bound = ?outcome.best_bound,
                "no roster to extract"
            );
            return Ok(SolveResult::without_roster(outcome, recorder.into_history()));
        }

        let solved = SolvedVariables::from_response(ctx, &outcome.response)?;
        let (avg_run, max_run) = run_stats(&solved);
        let result = SolveResult {
            status: outcome.status,
            status_name: outcome.status.name().to_string(),
            objective_value: outcome.objective,
            best_bound: outcome.best_bound,
            hourly: extract_hourly(ctx, &solved),
            shifts: extract_shifts(ctx, &solved),
            employees: extract_employee_totals(ctx, &solved),
            avg_run,
            max_run,
            coverage: Some(coverage_metrics(&ctx.cfg, &ctx.data, &solved)),
            slot_gaps: slot_gaps(&ctx.cfg, &ctx.data, &solved, DEFAULT_GAP_REPORT),
            unsat_core_groups: outcome.core_groups,
            progress_history: recorder.into_history(),
            solver_stats: outcome.stats,
        };
        info!(
            status = result.status_name.as_str(),
            objective = ?result.objective_value,
            hours = result.hourly.len(),
            shifts = result.shifts.len(),
            avg_run = result.avg_run,
            max_run = result.max_run,
            "roster extracted"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoverageBound;
    use crate::cp::{CpModel, CpResponse, SolutionCallback, SolutionInfo, SolverParams};
    use crate::models::Staff;

    /// Reports one incumbent, then gives up without values.
    struct TimesOut;

    impl CpSolver for TimesOut {
        fn solve(
            &self,
            _model: &CpModel,
            _params: &SolverParams,
            callback: Option<&mut dyn SolutionCallback>,
        ) -> CpResponse {
            if let Some(cb) = callback {
                cb.on_solution(&SolutionInfo {
                    wall_time: 0.5,
                    objective: 40,
                    best_bound: 12,
                    solution_index: 1,
                });
            }
            CpResponse {
                objective: Some(40),
                best_bound: Some(12),
                ..CpResponse::without_solution(SolveStatus::Unknown, SolverStats::default())
            }
        }
    }

    fn small() -> RosterModel {
        let mut cfg = Config::new(2, 4)
            .with_shift_bounds(2, 4)
            .with_rest_hours(0)
            .with_weekly_max_hours(None)
            .with_time_limit(10.0)
            .with_workers(1);
        cfg.require_skill_in_slots("ANY", |_| true, |h| (1..3).contains(&h), 1, CoverageBound::Min);
        let data = InputData::unrestricted(vec![Staff::new(0, "A"), Staff::new(1, "B")], 4);
        RosterModel::new(cfg, data)
    }

    #[test]
    fn test_solve_before_build_fails() {
        let roster = small();
        assert!(matches!(roster.solve(), Err(RosterError::NotBuilt)));
    }

    #[test]
    fn test_full_pipeline() {
        let mut roster = small();
        assert!(roster.precheck().is_clean());
        roster.build().unwrap();
        let result = roster.solve().unwrap();
        assert!(result.status.has_solution());
        assert_eq!(result.status_name, result.status.name());
        for d in 0..2 {
            for h in 1..3 {
                assert!(result.hourly.iter().any(|r| r.day == d && r.hour == h));
            }
        }
        assert!(result.shifts.iter().all(|s| s.model_length >= 2));
        assert_eq!(result.employees.len(), 2);
        let coverage = result.coverage.unwrap();
        assert_eq!(coverage.skill_demand_hours, 4);
        assert!(result.slot_gaps.iter().all(|g| g.deficit == 0));
        assert!(result.max_run >= 1);
    }

    #[test]
    fn test_infeasible_returns_empty_tables() {
        let mut roster = small();
        roster.build().unwrap();
        let ctx = roster.context_mut().unwrap();
        for e in 0..2 {
            for d in 0..2 {
                let y = ctx.vars.shift.get(&(e, d)).unwrap();
                ctx.model.add_eq(y, 0);
            }
        }
        let result = roster.solve().unwrap();
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.hourly.is_empty());
        assert!(result.employees.is_empty());
        assert!(result.unsat_core_groups.contains_key("COVER-MIN"));
    }

    #[test]
    fn test_unknown_keeps_objective_and_bound() {
        let mut roster = small();
        roster.build().unwrap();
        let result = roster.solve_with(&TimesOut).unwrap();
        assert_eq!(result.status, SolveStatus::Unknown);
        assert_eq!(result.objective_value, Some(40));
        assert_eq!(result.best_bound, Some(12));
        assert!(result.hourly.is_empty());
        assert_eq!(result.progress_history.len(), 1);
        assert_eq!(result.progress_history[0].best_bound, 12);
    }
}
