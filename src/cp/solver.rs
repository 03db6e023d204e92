//! Solver contract.
//!
//! Any engine that can solve a [`CpModel`] implements [`CpSolver`]. The
//! contract covers what the rostering layer needs: a status, the best
//! objective and bound, variable values, progress callbacks, and, on
//! infeasibility, a subset of assumption literals sufficient for the
//! conflict.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::CpModel;
use super::variables::{IntVar, Literal};

/// Solve status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// A solution was found and proven optimal (or the model has no
    /// objective and a solution was found after exhaustive search).
    Optimal,
    /// A solution was found but optimality was not proven.
    Feasible,
    /// The model was proven to have no solution.
    Infeasible,
    /// The limit was reached before any solution or proof.
    Unknown,
}

impl SolveStatus {
    /// Upper-case status name.
    pub fn name(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unknown => "UNKNOWN",
        }
    }

    /// Whether variable values are available.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Solver parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    /// Wall-clock limit.
    pub time_limit: Duration,
    /// Number of parallel search workers.
    pub num_workers: usize,
    /// Seed for workers that randomize their search.
    pub seed: u64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            num_workers: 1,
            seed: 0,
        }
    }
}

impl SolverParams {
    /// Sets the time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Snapshot passed to callbacks when a new incumbent is found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolutionInfo {
    /// Seconds since the solve started.
    pub wall_time: f64,
    /// Objective of the new incumbent.
    pub objective: i64,
    /// Best proven lower bound at that time.
    pub best_bound: i64,
    /// 1-based index of this solution.
    pub solution_index: u64,
}

/// Receives intermediate solutions. Invoked on the thread that called
/// [`CpSolver::solve`].
pub trait SolutionCallback {
    /// Called once per improving solution.
    fn on_solution(&mut self, info: &SolutionInfo);
}

impl<F: FnMut(&SolutionInfo)> SolutionCallback for F {
    fn on_solution(&mut self, info: &SolutionInfo) {
        self(info)
    }
}

/// Search statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Improving solutions found.
    pub solutions: u64,
    /// Workers used.
    pub workers: usize,
    /// Solver runs spent extracting and minimizing the assumption core.
    pub core_checks: u64,
    /// Wall time.
    pub wall_time: Duration,
}

impl fmt::Display for SolverStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "solver statistics:")?;
        writeln!(f, "  workers      : {}", self.workers)?;
        writeln!(f, "  solutions    : {}", self.solutions)?;
        writeln!(f, "  core checks  : {}", self.core_checks)?;
        write!(f, "  wall time    : {:.3}s", self.wall_time.as_secs_f64())
    }
}

/// Result of a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpResponse {
    /// Final status.
    pub status: SolveStatus,
    /// Objective of the best solution, if any.
    pub objective: Option<i64>,
    /// Best proven lower bound on the objective, if known.
    pub best_bound: Option<i64>,
    /// Values of the best solution, indexed by variable index. Empty when
    /// there is no solution.
    pub values: Vec<i64>,
    /// On infeasibility: assumptions sufficient for the conflict.
    pub sufficient_assumptions: Vec<Literal>,
    /// Search statistics.
    pub stats: SolverStats,
}

impl CpResponse {
    /// A response with no solution.
    pub fn without_solution(status: SolveStatus, stats: SolverStats) -> Self {
        Self {
            status,
            objective: None,
            best_bound: None,
            values: Vec::new(),
            sufficient_assumptions: Vec::new(),
            stats,
        }
    }

    /// Value of a variable in the best solution.
    pub fn value(&self, var: impl Into<IntVar>) -> Option<i64> {
        self.values.get(var.into().index()).copied()
    }

    /// Truth value of a literal in the best solution.
    pub fn literal_value(&self, lit: impl Into<Literal>) -> Option<bool> {
        let lit = lit.into();
        self.value(lit.var()).map(|v| lit.holds(v))
    }
}

/// A constraint solver.
pub trait CpSolver {
    /// Solver name.
    fn name(&self) -> &'static str {
        "cp-solver"
    }

    /// Solves `model` within `params`, reporting improving solutions to
    /// `callback`.
    fn solve(
        &self,
        model: &CpModel,
        params: &SolverParams,
        callback: Option<&mut dyn SolutionCallback>,
    ) -> CpResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(SolveStatus::Optimal.name(), "OPTIMAL");
        assert_eq!(SolveStatus::Infeasible.to_string(), "INFEASIBLE");
        assert!(SolveStatus::Feasible.has_solution());
        assert!(!SolveStatus::Unknown.has_solution());
    }

    #[test]
    fn test_closure_callback() {
        let mut seen = Vec::new();
        {
            let mut cb = |info: &SolutionInfo| seen.push(info.objective);
            let dyn_cb: &mut dyn SolutionCallback = &mut cb;
            dyn_cb.on_solution(&SolutionInfo {
                wall_time: 0.1,
                objective: 42,
                best_bound: 0,
                solution_index: 1,
            });
        }
        assert_eq!(seen, vec![42]);
    }

    #[test]
    fn test_stats_display() {
        let stats = SolverStats {
            solutions: 3,
            workers: 1,
            core_checks: 2,
            ..SolverStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("solutions    : 3"));
        assert!(text.contains("core checks  : 2"));
    }

    #[test]
    fn test_response_accessors() {
        let mut resp = CpResponse::without_solution(SolveStatus::Feasible, SolverStats::default());
        resp.values = vec![0, 1, 7];
        assert_eq!(resp.value(IntVar(2)), Some(7));
        assert_eq!(resp.literal_value(crate::cp::BoolVar(1)), Some(true));
        assert_eq!(resp.literal_value(!crate::cp::BoolVar(0)), Some(true));
        assert_eq!(resp.value(IntVar(9)), None);
    }
}
