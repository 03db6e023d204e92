//! Pumpkin-backed solver.
//!
//! [`PumpkinSolver`] hands a [`CpModel`] to the `pumpkin-solver` lazy clause
//! generation engine. The model is translated one-to-one:
//!
//! | Model | Pumpkin |
//! |-------|---------|
//! | boolean variable | `new_literal()` and its 0/1 integer view |
//! | integer variable | `new_bounded_integer(lb, ub)` |
//! | `Linear` | `greater_than_or_equals` / `less_than_or_equals` / `equals` over scaled views |
//! | `MaxEquality` / `MinEquality` | `maximum` / `minimum` |
//! | `Element` | `element` over constant variables |
//! | enforcement literals | `implied_by` on one literal implied by their conjunction |
//! | objective | a variable tied to the expression by `equals`, minimised with `LinearSatUnsat` |
//!
//! Assumptions are posted as unit clauses for the optimisation run. When that
//! run proves the model unsatisfiable, the model is rebuilt without them and
//! queried with `satisfy_under_assumptions`; the extracted core is then
//! shrunk by deletion until every remaining assumption is needed (or the
//! time limit is hit).
//!
//! Pumpkin works on 32-bit integers. A model whose bounds or coefficients do
//! not fit is answered with [`SolveStatus::Unknown`].
//!
//! # Reference
//! - Stuckey (2010), "Lazy Clause Generation: Combining the power of SAT and CP (and MIP?) solving"
//! - Junker (2004), "QuickXplain: Preferred Explanations and Relaxations"

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use pumpkin_solver::constraints as cp;
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{
    OptimisationResult, ProblemSolution, SatisfactionResultUnderAssumptions, SolutionReference,
};
use pumpkin_solver::termination::TimeBudget;
use pumpkin_solver::variables::{AffineView, DomainId, Literal as SolverLiteral, TransformableVariable};
use pumpkin_solver::Solver;
use tracing::{debug, warn};

use super::model::{ConstraintKind, CpModel, NO_LOWER_BOUND, NO_UPPER_BOUND};
use super::solver::{CpResponse, CpSolver, SolutionCallback, SolutionInfo, SolveStatus, SolverParams, SolverStats};
use super::variables::{IntVar, Literal};

type View = AffineView<DomainId>;

/// Solver backed by `pumpkin-solver`.
///
/// Pumpkin searches on a single thread; `num_workers` and `seed` in
/// [`SolverParams`] are not used.
#[derive(Debug, Clone, Default)]
pub struct PumpkinSolver;

impl PumpkinSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self
    }
}

/// Why a model could not be posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejected {
    /// Posting failed at the root: the posted part alone is infeasible.
    RootConflict,
    /// A bound or coefficient does not fit in 32 bits.
    OutOfRange,
    /// A literal refers to a variable that was not declared boolean.
    NotBoolean,
}

fn narrow(value: i64) -> Result<i32, Rejected> {
    i32::try_from(value).map_err(|_| Rejected::OutOfRange)
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Smallest and largest value the objective can take over the declared
/// domains.
fn objective_range(model: &CpModel) -> (i64, i64) {
    let Some(objective) = model.objective() else {
        return (0, 0);
    };
    let mut lo = objective.constant();
    let mut hi = objective.constant();
    for (var, coef) in objective.terms() {
        let Some(domain) = model.domain(*var) else {
            continue;
        };
        let (a, b) = (coef.saturating_mul(domain.lb), coef.saturating_mul(domain.ub));
        lo = lo.saturating_add(a.min(b));
        hi = hi.saturating_add(a.max(b));
    }
    (lo, hi)
}

/// A model posted into a fresh pumpkin solver.
struct Translation {
    solver: Solver,
    views: Vec<View>,
    literals: Vec<Option<SolverLiteral>>,
    constants: HashMap<i32, View>,
    objective: DomainId,
}

impl Translation {
    /// Posts every variable, constraint and the objective of `model`, then
    /// fixes the `fixed` literals with unit clauses.
    fn new(model: &CpModel, fixed: &[Literal]) -> Result<Self, Rejected> {
        let mut solver = Solver::default();
        let mut views = Vec::with_capacity(model.num_vars());
        let mut literals = Vec::with_capacity(model.num_vars());
        for domain in model.domains() {
            if domain.is_bool {
                let literal = solver.new_literal();
                views.push(literal.get_integer_variable());
                literals.push(Some(literal));
            } else {
                let var = solver.new_bounded_integer(narrow(domain.lb)?, narrow(domain.ub)?);
                views.push(var.scaled(1));
                literals.push(None);
            }
        }

        let (lo, hi) = objective_range(model);
        let objective = solver.new_bounded_integer(narrow(lo)?, narrow(hi)?);
        let mut translation = Self {
            solver,
            views,
            literals,
            constants: HashMap::new(),
            objective,
        };

        for constraint in model.constraints() {
            let guard = translation.guard(&constraint.enforcement)?;
            translation.post_kind(&constraint.kind, guard)?;
        }
        if let Some(expr) = model.objective() {
            let mut terms = translation.scaled_terms(expr.terms())?;
            terms.push(objective.scaled(-1));
            let tag = translation.solver.new_constraint_tag();
            let rhs = narrow(-expr.constant())?;
            translation.post(cp::equals(terms, rhs, tag), None)?;
        }
        for literal in fixed {
            let predicate = translation.literal(*literal)?.get_true_predicate();
            let tag = translation.solver.new_constraint_tag();
            translation
                .solver
                .add_clause([predicate], tag)
                .map_err(|_| Rejected::RootConflict)?;
        }
        Ok(translation)
    }

    fn literal(&self, literal: Literal) -> Result<SolverLiteral, Rejected> {
        let base = self
            .literals
            .get(literal.var().index())
            .copied()
            .flatten()
            .ok_or(Rejected::NotBoolean)?;
        Ok(if literal.is_negated() { !base } else { base })
    }

    /// One literal that holds whenever every enforcement literal holds.
    fn guard(&mut self, enforcement: &[Literal]) -> Result<Option<SolverLiteral>, Rejected> {
        match enforcement {
            [] => Ok(None),
            [single] => self.literal(*single).map(Some),
            many => {
                let joined = self.solver.new_literal();
                let mut clause = Vec::with_capacity(many.len() + 1);
                for literal in many {
                    clause.push(self.literal(*literal)?.get_false_predicate());
                }
                clause.push(joined.get_true_predicate());
                let tag = self.solver.new_constraint_tag();
                self.solver
                    .add_clause(clause, tag)
                    .map_err(|_| Rejected::RootConflict)?;
                Ok(Some(joined))
            }
        }
    }

    fn view(&self, var: IntVar) -> View {
        self.views[var.index()].clone()
    }

    fn scaled_terms(&self, terms: &[(IntVar, i64)]) -> Result<Vec<View>, Rejected> {
        terms
            .iter()
            .map(|(var, coef)| Ok(self.views[var.index()].scaled(narrow(*coef)?)))
            .collect()
    }

    fn constant(&mut self, value: i64) -> Result<View, Rejected> {
        let value = narrow(value)?;
        if let Some(view) = self.constants.get(&value) {
            return Ok(view.clone());
        }
        let view = self.solver.new_bounded_integer(value, value).scaled(1);
        self.constants.insert(value, view.clone());
        Ok(view)
    }

    fn post<C: cp::Constraint>(&mut self, constraint: C, guard: Option<SolverLiteral>) -> Result<(), Rejected> {
        let poster = self.solver.add_constraint(constraint);
        let posted = match guard {
            Some(literal) => poster.implied_by(literal),
            None => poster.post(),
        };
        posted.map_err(|_| Rejected::RootConflict)
    }

    fn post_kind(&mut self, kind: &ConstraintKind, guard: Option<SolverLiteral>) -> Result<(), Rejected> {
        let tag = self.solver.new_constraint_tag();
        match kind {
            ConstraintKind::Linear { terms, lb, ub } => {
                if terms.is_empty() {
                    if *lb <= 0 && 0 <= *ub {
                        return Ok(());
                    }
                    // Violated outright: only the guard can switch it off.
                    let clause = guard.map(|g| g.get_false_predicate());
                    return self
                        .solver
                        .add_clause(clause, tag)
                        .map_err(|_| Rejected::RootConflict);
                }
                let views = self.scaled_terms(terms)?;
                if lb == ub {
                    return self.post(cp::equals(views, narrow(*lb)?, tag), guard);
                }
                if *lb != NO_LOWER_BOUND {
                    self.post(cp::greater_than_or_equals(views.clone(), narrow(*lb)?, tag), guard)?;
                }
                if *ub != NO_UPPER_BOUND {
                    self.post(cp::less_than_or_equals(views, narrow(*ub)?, tag), guard)?;
                }
                Ok(())
            }
            ConstraintKind::MaxEquality { target, args } => {
                let args: Vec<View> = args.iter().map(|v| self.view(*v)).collect();
                let target = self.view(*target);
                self.post(cp::maximum(args, target, tag), guard)
            }
            ConstraintKind::MinEquality { target, args } => {
                let args: Vec<View> = args.iter().map(|v| self.view(*v)).collect();
                let target = self.view(*target);
                self.post(cp::minimum(args, target, tag), guard)
            }
            ConstraintKind::Element { index, values, target } => {
                let array = values
                    .iter()
                    .map(|v| self.constant(*v))
                    .collect::<Result<Vec<View>, Rejected>>()?;
                let (index, target) = (self.view(*index), self.view(*target));
                self.post(cp::element(index, array, target, tag), guard)
            }
        }
    }
}

fn read_values(views: &[View], solution: &impl ProblemSolution) -> Vec<i64> {
    views
        .iter()
        .map(|view| i64::from(solution.get_integer_value(view.clone())))
        .collect()
}

/// Outcome of the optimisation run.
enum Search {
    Solved {
        status: SolveStatus,
        objective: i64,
        values: Vec<i64>,
    },
    Unsatisfiable,
    Unknown,
}

/// Outcome of one assumption check.
enum Check {
    Satisfiable,
    /// The assumptions in the core (a subset of those checked).
    Core(Vec<Literal>),
    Unknown,
}

impl PumpkinSolver {
    fn optimise(
        &self,
        translation: Translation,
        start: Instant,
        deadline: Instant,
        lower_bound: i64,
        callback: Option<&mut dyn SolutionCallback>,
        stats: &mut SolverStats,
    ) -> Search {
        let Translation {
            mut solver,
            views,
            objective,
            ..
        } = translation;
        let mut brancher = solver.default_brancher();
        let mut termination = TimeBudget::starting_now(remaining(deadline));

        let found = Cell::new(0u64);
        let callback = RefCell::new(callback);
        let on_solution = |_: &Solver, solution: SolutionReference, _: &_| {
            let value = i64::from(solution.get_integer_value(objective));
            found.set(found.get() + 1);
            if let Some(cb) = callback.borrow_mut().as_mut() {
                cb.on_solution(&SolutionInfo {
                    wall_time: start.elapsed().as_secs_f64(),
                    objective: value,
                    best_bound: lower_bound.min(value),
                    solution_index: found.get(),
                });
            }
        };

        let result = solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, objective, on_solution),
        );
        let search = match result {
            OptimisationResult::Optimal(solution) => Search::Solved {
                status: SolveStatus::Optimal,
                objective: i64::from(solution.get_integer_value(objective)),
                values: read_values(&views, &solution),
            },
            OptimisationResult::Satisfiable(solution) => Search::Solved {
                status: SolveStatus::Feasible,
                objective: i64::from(solution.get_integer_value(objective)),
                values: read_values(&views, &solution),
            },
            OptimisationResult::Unsatisfiable => Search::Unsatisfiable,
            OptimisationResult::Unknown => Search::Unknown,
        };
        stats.solutions = found.get();
        search
    }

    /// Solves `model` under `assumed` and reports which of them conflict.
    fn check(&self, model: &CpModel, assumed: &[Literal], deadline: Instant, stats: &mut SolverStats) -> Check {
        stats.core_checks += 1;
        let mut translation = match Translation::new(model, &[]) {
            Ok(translation) => translation,
            Err(Rejected::RootConflict) => return Check::Core(Vec::new()),
            Err(_) => return Check::Unknown,
        };
        let predicates = match assumed
            .iter()
            .map(|lit| translation.literal(*lit).map(|l| l.get_true_predicate()))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(predicates) => predicates,
            Err(_) => return Check::Unknown,
        };

        let mut brancher = translation.solver.default_brancher();
        let mut termination = TimeBudget::starting_now(remaining(deadline));
        let check = match translation
            .solver
            .satisfy_under_assumptions(&mut brancher, &mut termination, &predicates)
        {
            SatisfactionResultUnderAssumptions::UnsatisfiableUnderAssumptions(mut unsatisfiable) => {
                let core = unsatisfiable.extract_core();
                Check::Core(
                    assumed
                        .iter()
                        .zip(&predicates)
                        .filter(|(_, predicate)| core.contains(predicate))
                        .map(|(lit, _)| *lit)
                        .collect(),
                )
            }
            SatisfactionResultUnderAssumptions::Unsatisfiable { .. } => Check::Core(Vec::new()),
            SatisfactionResultUnderAssumptions::Satisfiable { .. } => Check::Satisfiable,
            SatisfactionResultUnderAssumptions::Unknown { .. } => Check::Unknown,
        };
        check
    }

    /// Assumptions sufficient for the conflict, shrunk by deletion.
    fn assumption_core(&self, model: &CpModel, deadline: Instant, stats: &mut SolverStats) -> Vec<Literal> {
        let mut core = match self.check(model, model.assumptions(), deadline, stats) {
            Check::Core(core) => core,
            // The optimisation run already proved infeasibility.
            Check::Satisfiable | Check::Unknown => model.assumptions().to_vec(),
        };
        let mut i = 0;
        while i < core.len() && Instant::now() < deadline {
            let candidate: Vec<Literal> = core
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, lit)| *lit)
                .collect();
            match self.check(model, &candidate, deadline, stats) {
                Check::Core(smaller) => {
                    i = smaller.iter().filter(|lit| core[..i].contains(lit)).count();
                    core = smaller;
                }
                Check::Satisfiable | Check::Unknown => i += 1,
            }
        }
        debug!(core_size = core.len(), checks = stats.core_checks, "assumption core minimized");
        core
    }
}

impl CpSolver for PumpkinSolver {
    fn name(&self) -> &'static str {
        "pumpkin"
    }

    fn solve(
        &self,
        model: &CpModel,
        params: &SolverParams,
        callback: Option<&mut dyn SolutionCallback>,
    ) -> CpResponse {
        let start = Instant::now();
        let deadline = start + params.time_limit;
        let mut stats = SolverStats {
            workers: 1,
            ..SolverStats::default()
        };
        if params.num_workers > 1 {
            debug!(requested = params.num_workers, "pumpkin searches on one thread");
        }

        let (lower_bound, _) = objective_range(model);
        let search = match Translation::new(model, model.assumptions()) {
            Ok(translation) => self.optimise(translation, start, deadline, lower_bound, callback, &mut stats),
            Err(Rejected::RootConflict) => Search::Unsatisfiable,
            Err(reason) => {
                warn!(?reason, "model cannot be posted to pumpkin");
                Search::Unknown
            }
        };

        let mut response = match search {
            Search::Solved {
                status,
                objective,
                values,
            } => {
                let objective = model.objective().map(|_| objective);
                let best_bound = objective.map(|obj| match status {
                    SolveStatus::Optimal => obj,
                    _ => lower_bound.min(obj),
                });
                CpResponse {
                    status,
                    objective,
                    best_bound,
                    values,
                    sufficient_assumptions: Vec::new(),
                    stats: SolverStats::default(),
                }
            }
            Search::Unsatisfiable => {
                let core = if model.assumptions().is_empty() {
                    Vec::new()
                } else {
                    self.assumption_core(model, deadline, &mut stats)
                };
                CpResponse {
                    sufficient_assumptions: core,
                    ..CpResponse::without_solution(SolveStatus::Infeasible, SolverStats::default())
                }
            }
            Search::Unknown => CpResponse::without_solution(SolveStatus::Unknown, SolverStats::default()),
        };
        stats.wall_time = start.elapsed();
        response.stats = stats;
        response
    }
}

/// Convenience for tests and small models: solve with defaults and a limit.
pub fn solve_with_limit(model: &CpModel, limit: Duration) -> CpResponse {
    PumpkinSolver::new().solve(model, &SolverParams::default().with_time_limit(limit), None)
}
