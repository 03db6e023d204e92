//! Workforce rostering on a constraint model.
//!
//! Compiles declarative staffing rules into a constraint model, solves it,
//! and diagnoses infeasibility. A roster covers `N` staff over `DAYS` days
//! of `HOURS` hourly slots; each staff member works at most one contiguous
//! shift per start day, and shifts may spill past midnight into the next
//! day.
//!
//! # Modules
//!
//! - **`config`**: Horizon, shift bounds, coverage grids, solver limits
//! - **`models`**: `Staff`, `InputData` and allowed-hour masks
//! - **`validation`**: Collect-all input checks
//! - **`cp`**: Constraint model IR, the `CpSolver` contract and the Pumpkin backend
//! - **`rules`**: `Rule` trait, the registry and the built-in rules
//! - **`build`**: Four-phase model construction with a sanity check
//! - **`solve`**: Solve driver, infeasibility grouping, progress recording
//! - **`extract`** / **`metrics`** / **`precheck`**: Reporting helpers
//! - **`roster`**: `RosterModel` orchestrator
//!
//! # Architecture
//!
//! Rules only talk to the solver through the `cp` model and the `CpSolver`
//! trait, so any engine honouring that contract can replace the Pumpkin
//! search. Hard constraints carry assumption literals when diagnosis is on,
//! which lets an infeasible roster be explained in terms of rule labels
//! such as `REST[e=3,d=1,hours=12]`.
//!
//! # References
//!
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of applications, methods and models"
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

pub mod build;
pub mod config;
pub mod cp;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod models;
pub mod precheck;
pub mod roster;
pub mod rules;
pub mod solve;
pub mod validation;

pub use build::{build_default_model, build_model};
pub use config::{Config, CoverageBound};
pub use error::{Result, RosterError};
pub use models::{InputData, Staff};
pub use roster::{RosterModel, SolveResult};
pub use rules::{Rule, RuleKind, RuleRegistry, RuleSpec};
pub use solve::{solve_model, SolveOutcome};
