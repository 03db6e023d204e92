//! Solve driver and infeasibility diagnosis.
//!
//! [`solve_model`] runs a [`CpSolver`] on a built model with the configured
//! time limit and worker count, optionally reporting improving solutions to
//! a callback. On infeasibility with diagnosis enabled, the solver's
//! sufficient assumption set is mapped back to constraint labels and grouped
//! by rule tag (the text before the first `[`), e.g.
//! `{"MAX-CONSEC": [...], "COVER-MIN": [...]}`.
//!
//! Some engines only produce the assumption analysis outside callback-driven
//! search, so when a callback was attached and the grouping comes back
//! empty, the model is solved once more without it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cp::{CpResponse, CpSolver, SolutionCallback, SolutionInfo, SolveStatus, SolverStats};
use crate::rules::BuildContext;

/// Rule tag → constraint labels.
pub type CoreGroups = BTreeMap<String, Vec<String>>;

/// What one solve produced.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// Final status.
    pub status: SolveStatus,
    /// Best objective, if a solution was found.
    pub objective: Option<i64>,
    /// Best proven bound, if known.
    pub best_bound: Option<i64>,
    /// Raw solver response (variable values, assumptions).
    pub response: CpResponse,
    /// Grouped infeasibility labels; empty unless infeasible with diagnosis.
    pub core_groups: CoreGroups,
    /// Search statistics.
    pub stats: SolverStats,
}

/// Groups labels by the text before their first `[`.
pub fn group_core_labels<I>(labels: I) -> CoreGroups
where
    I: IntoIterator<Item = String>,
{
    let mut groups = CoreGroups::new();
    for label in labels {
        let tag = label.split('[').next().unwrap_or_default().trim().to_string();
        groups.entry(tag).or_default().push(label);
    }
    groups
}

fn diagnose(ctx: &BuildContext, response: &CpResponse) -> CoreGroups {
    group_core_labels(ctx.core_labels(&response.sufficient_assumptions))
}

/// Solves a built model.
pub fn solve_model(
    ctx: &BuildContext,
    solver: &dyn CpSolver,
    callback: Option<&mut dyn SolutionCallback>,
) -> SolveOutcome {
    let params = ctx.cfg.solver_params();
    let had_callback = callback.is_some();
    info!(
        solver = solver.name(),
        time_limit_s = params.time_limit.as_secs_f64(),
        workers = params.num_workers,
        "solving"
    );

    let mut response = solver.solve(&ctx.model, &params, callback);
    info!(
        status = %response.status,
        objective = ?response.objective,
        wall_time_s = response.stats.wall_time.as_secs_f64(),
        "solve finished"
    );

    let mut core_groups = CoreGroups::new();
    if response.status == SolveStatus::Infeasible && ctx.cfg.enable_unsat_core {
        core_groups = diagnose(ctx, &response);
        if core_groups.is_empty() && had_callback {
            info!("no assumption core with callback attached, re-solving without it");
            let retry = solver.solve(&ctx.model, &params, None);
            if retry.status == SolveStatus::Infeasible {
                core_groups = diagnose(ctx, &retry);
                response = retry;
            }
        }
        if core_groups.is_empty() {
            warn!("infeasible, but no assumption core was reported");
        }
        for (tag, labels) in &core_groups {
            info!(tag = tag.as_str(), count = labels.len(), "infeasibility group");
        }
    }

    SolveOutcome {
        status: response.status,
        objective: response.objective,
        best_bound: response.best_bound,
        stats: response.stats.clone(),
        core_groups,
        response,
    }
}

// ===== Progress =====

/// One improving solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    /// Seconds since the solve started.
    pub wall_time: f64,
    /// Objective value.
    pub objective: i64,
    /// Best bound at that time.
    pub best_bound: i64,
}

/// Solution callback that records `(time, objective, bound)` and logs at
/// most once per interval. It never touches model state.
#[derive(Debug, Clone, Default)]
pub struct ProgressRecorder {
    log_interval: f64,
    last_logged: Option<f64>,
    history: Vec<ProgressPoint>,
}

impl ProgressRecorder {
    /// Recorder that logs at most every `log_interval` seconds. Zero logs
    /// every solution.
    pub fn new(log_interval: f64) -> Self {
        Self {
            log_interval: log_interval.max(0.0),
            last_logged: None,
            history: Vec::new(),
        }
    }

    /// Recorded points in arrival order.
    pub fn history(&self) -> &[ProgressPoint] {
        &self.history
    }

    /// Consumes the recorder.
    pub fn into_history(self) -> Vec<ProgressPoint> {
        self.history
    }
}

impl SolutionCallback for ProgressRecorder {
    fn on_solution(&mut self, info: &SolutionInfo) {
        self.history.push(ProgressPoint {
            wall_time: info.wall_time,
            objective: info.objective,
            best_bound: info.best_bound,
        });
        let due = self
            .last_logged
            .map_or(true, |t| info.wall_time - t >= self.log_interval);
        if due {
            self.last_logged = Some(info.wall_time);
            info!(
                solution = info.solution_index,
                t = format!("{:.2}s", info.wall_time),
                objective = info.objective,
                bound = info.best_bound,
                "improving solution"
            );
        }
    }
}
