//! Model build pipeline.
//!
//! Validates the problem, resolves the rule registry into an ordered rule
//! list, and drives every rule through the four phases. Each phase finishes
//! across all rules before the next begins. After the objective is set, a
//! structural sanity check verifies the hourly variable grid.
//!
//! Construction is single-threaded and deterministic: building the same
//! config and input twice yields the same variables and constraints in the
//! same order.

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, RosterError};
use crate::models::InputData;
use crate::rules::{BuildContext, ObjectiveBuilder, Rule, RuleRegistry};
use crate::validation::validate_problem;

/// Builds a roster model with the default rules.
pub fn build_default_model(cfg: Config, data: InputData) -> Result<BuildContext> {
    build_model(cfg, data, &RuleRegistry::default())
}

/// Builds a roster model.
///
/// # Errors
/// - [`RosterError::Validation`] when config or input is rejected
/// - [`RosterError::InvalidSetting`] when a rule rejects its settings
/// - [`RosterError::MissingVariable`] when a rule reads an undeclared variable
/// - [`RosterError::BuildSanity`] when the finished hourly grid is incomplete
pub fn build_model(cfg: Config, data: InputData, registry: &RuleRegistry) -> Result<BuildContext> {
    validate_problem(&cfg, &data)?;

    let mut ctx = BuildContext::new(cfg, data);
    let mut rules = registry.build_sequence(&ctx)?;
    info!(
        rules = rules.len(),
        staff = ctx.num_staff(),
        days = ctx.cfg.days,
        hours = ctx.cfg.hours,
        "building roster model"
    );

    run_phase(&mut rules, &mut ctx, "declare", |r, c| r.declare_vars(c))?;
    run_phase(&mut rules, &mut ctx, "hard", |r, c| r.add_hard(c))?;
    run_phase(&mut rules, &mut ctx, "soft", |r, c| r.add_soft(c))?;

    let mut objective = ObjectiveBuilder::new();
    for rule in &rules {
        objective.extend(rule.contribute_objective(&ctx)?);
    }
    debug!(terms = objective.len(), "objective collected");
    if !objective.is_empty() {
        ctx.model.minimize(objective.build());
    }

    sanity_check(&ctx)?;

    let stats = ctx.model_stats();
    info!(
        variables = stats.variables,
        constraints = stats.constraints,
        assumptions = stats.assumptions,
        objective_terms = stats.objective_terms,
        "model built"
    );
    Ok(ctx)
}

fn run_phase<F>(rules: &mut [Box<dyn Rule>], ctx: &mut BuildContext, phase: &str, mut f: F) -> Result<()>
where
    F: FnMut(&mut dyn Rule, &mut BuildContext) -> Result<()>,
{
    for rule in rules.iter_mut() {
        let before = ctx.model.constraints().len();
        f(rule.as_mut(), &mut *ctx)?;
        debug!(
            phase,
            rule = rule.name(),
            constraints = ctx.model.constraints().len() - before,
            "phase done"
        );
    }
    Ok(())
}

/// Verifies the hourly grid: `N × DAYS × HOURS` worked variables, with the
/// first and last index present.
pub fn sanity_check(ctx: &BuildContext) -> Result<()> {
    let (n, days, hours) = ctx.dims();
    let expected = n * days * hours;
    let found = ctx.vars.worked.len();
    if found != expected {
        return Err(RosterError::BuildSanity(format!(
            "expected {expected} hourly variables ({n}×{days}×{hours}), found {found}"
        )));
    }
    let last = (n.saturating_sub(1), days.saturating_sub(1), hours.saturating_sub(1));
    for key in [(0, 0, 0), last] {
        if !ctx.vars.worked.contains(&key) {
            return Err(RosterError::BuildSanity(format!(
                "hourly variable x{key:?} is missing"
            )));
        }
    }
    Ok(())
}
