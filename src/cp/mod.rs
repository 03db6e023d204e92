//! Constraint-programming layer.
//!
//! A small CP-SAT–style modelling surface plus a `pumpkin-solver` backend:
//!
//! - [`CpModel`]: integer and boolean variables, linear constraints,
//!   max/min/element equalities, enforcement literals, assumptions, and a
//!   linear objective to minimize.
//! - [`CpSolver`]: the solver contract (status, objective, bound, values,
//!   solution callbacks, sufficient assumptions on infeasibility).
//! - [`PumpkinSolver`]: translates the model into the Pumpkin lazy clause
//!   generation solver.
//!
//! Rostering rules only talk to [`CpModel`]; any engine implementing
//! [`CpSolver`] can be plugged in.
//!
//! # Reference
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"
//! - Perron & Didier (2023), "CP-SAT", Google OR-Tools
//! - Stuckey (2010), "Lazy Clause Generation: Combining the power of SAT and CP (and MIP?) solving"

mod expr;
mod model;
mod pumpkin;
mod solver;
mod variables;

pub use expr::LinearExpr;
pub use model::{
    Constraint, ConstraintHandle, ConstraintKind, CpModel, ModelStats, NO_LOWER_BOUND,
    NO_UPPER_BOUND,
};
pub use pumpkin::{solve_with_limit, PumpkinSolver};
pub use solver::{
    CpResponse, CpSolver, SolutionCallback, SolutionInfo, SolveStatus, SolverParams, SolverStats,
};
pub use variables::{BoolVar, IntVar, Literal, VarDomain};
