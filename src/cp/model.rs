//! Constraint model: variables, constraints, assumptions, objective.
//!
//! The model is a plain intermediate representation. It knows nothing about
//! rostering; rules build it through the methods here, and any
//! [`CpSolver`](super::CpSolver) consumes it.
//!
//! # Supported constraints
//!
//! | Constraint | Semantics |
//! |------------|-----------|
//! | `Linear` | `lb ≤ Σ coef·var ≤ ub` |
//! | `MaxEquality` | `target = max(args)` |
//! | `MinEquality` | `target = min(args)` |
//! | `Element` | `target = values[index]` |
//!
//! Every constraint may carry enforcement literals: it must hold only when
//! all of them are true (half-reification).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::expr::LinearExpr;
use super::variables::{BoolVar, IntVar, Literal, VarDomain};

/// Lower sentinel for a one-sided linear constraint.
pub const NO_LOWER_BOUND: i64 = i64::MIN;
/// Upper sentinel for a one-sided linear constraint.
pub const NO_UPPER_BOUND: i64 = i64::MAX;

/// Kind-specific payload of a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `lb ≤ Σ coef·var ≤ ub`. The stored expression has a zero constant;
    /// constants are folded into the bounds on insertion.
    Linear {
        terms: Vec<(IntVar, i64)>,
        lb: i64,
        ub: i64,
    },
    /// `target = max(args)`.
    MaxEquality { target: IntVar, args: Vec<IntVar> },
    /// `target = min(args)`.
    MinEquality { target: IntVar, args: Vec<IntVar> },
    /// `target = values[index]`, with `index` restricted to `0..values.len()`.
    Element {
        index: IntVar,
        values: Vec<i64>,
        target: IntVar,
    },
}

impl ConstraintKind {
    /// Short name for statistics.
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Linear { .. } => "linear",
            ConstraintKind::MaxEquality { .. } => "max_equality",
            ConstraintKind::MinEquality { .. } => "min_equality",
            ConstraintKind::Element { .. } => "element",
        }
    }

    /// Whether a full assignment satisfies the payload.
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let value = |v: &IntVar| values.get(v.index()).copied().unwrap_or(0);
        match self {
            ConstraintKind::Linear { terms, lb, ub } => {
                let sum: i64 = terms.iter().map(|(v, c)| c * value(v)).sum();
                *lb <= sum && sum <= *ub
            }
            ConstraintKind::MaxEquality { target, args } => {
                args.iter().map(value).max() == Some(value(target))
            }
            ConstraintKind::MinEquality { target, args } => {
                args.iter().map(value).min() == Some(value(target))
            }
            ConstraintKind::Element {
                index,
                values: table,
                target,
            } => usize::try_from(value(index))
                .ok()
                .and_then(|i| table.get(i))
                .is_some_and(|v| *v == value(target)),
        }
    }
}

/// A constraint with optional enforcement literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// The constraint payload.
    pub kind: ConstraintKind,
    /// The payload must hold when all of these literals are true.
    pub enforcement: Vec<Literal>,
}

impl Constraint {
    /// Whether the constraint is active under a full assignment.
    pub fn is_enforced(&self, values: &[i64]) -> bool {
        self.enforcement.iter().all(|lit| {
            lit.holds(values.get(lit.var().index()).copied().unwrap_or(0))
        })
    }
}

/// Handle to a freshly added constraint, used to attach enforcement
/// literals.
///
/// ```
/// use u_roster::cp::CpModel;
///
/// let mut model = CpModel::new("demo");
/// let s = model.new_int_var(0, 23, "S");
/// let b = model.new_bool_var("b");
/// model.add_le(s, 10).only_enforce_if([b]);
/// model.add_ge(s, 11).only_enforce_if([!b]);
/// assert_eq!(model.constraints()[1].enforcement, vec![!b]);
/// ```
pub struct ConstraintHandle<'a> {
    constraint: &'a mut Constraint,
    index: usize,
}

impl ConstraintHandle<'_> {
    /// Makes the constraint conditional on every given literal.
    ///
    /// Accepts anything iterable over literals, including `Option<Literal>`
    /// so that optional guards can be attached unconditionally.
    pub fn only_enforce_if<I, L>(self, literals: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        self.constraint
            .enforcement
            .extend(literals.into_iter().map(Into::into));
        self
    }

    /// Position of the constraint in the model.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Size summary of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStats {
    /// Number of variables (boolean and integer).
    pub variables: usize,
    /// Number of boolean variables.
    pub bool_variables: usize,
    /// Number of constraints.
    pub constraints: usize,
    /// Number of constraints with at least one enforcement literal.
    pub enforced_constraints: usize,
    /// Number of assumption literals.
    pub assumptions: usize,
    /// Number of objective terms.
    pub objective_terms: usize,
}

/// A constraint model.
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    name: String,
    vars: Vec<VarDomain>,
    constraints: Vec<Constraint>,
    assumptions: Vec<Literal>,
    objective: Option<LinearExpr>,
    constants: HashMap<i64, IntVar>,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ===== Variables =====

    /// Creates an integer variable with domain `[lb, ub]`.
    pub fn new_int_var(&mut self, lb: i64, ub: i64, name: impl Into<String>) -> IntVar {
        let id = self.push_var(lb, ub, name.into(), false);
        IntVar(id)
    }

    /// Creates a boolean variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> BoolVar {
        let id = self.push_var(0, 1, name.into(), true);
        BoolVar(id)
    }

    /// Returns a variable fixed to `value`. Repeated calls with the same
    /// value share one variable.
    pub fn new_constant(&mut self, value: i64) -> IntVar {
        if let Some(var) = self.constants.get(&value) {
            return *var;
        }
        let var = self.new_int_var(value, value, format!("const_{value}"));
        self.constants.insert(value, var);
        var
    }

    fn push_var(&mut self, lb: i64, ub: i64, name: String, is_bool: bool) -> u32 {
        let id = self.vars.len() as u32;
        self.vars.push(VarDomain {
            name,
            lb,
            ub,
            is_bool,
        });
        id
    }

    /// Declared domain of a variable.
    pub fn domain(&self, var: impl Into<IntVar>) -> Option<&VarDomain> {
        self.vars.get(var.into().index())
    }

    /// All declared domains, indexed by variable index.
    pub fn domains(&self) -> &[VarDomain] {
        &self.vars
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    // ===== Constraints =====

    /// Adds `lb ≤ expr ≤ ub`. Use [`NO_LOWER_BOUND`]/[`NO_UPPER_BOUND`] for
    /// one-sided constraints.
    pub fn add_linear(
        &mut self,
        expr: impl Into<LinearExpr>,
        lb: i64,
        ub: i64,
    ) -> ConstraintHandle<'_> {
        let (terms, constant) = expr.into().into_parts();
        let lb = if lb == NO_LOWER_BOUND {
            lb
        } else {
            lb.saturating_sub(constant)
        };
        let ub = if ub == NO_UPPER_BOUND {
            ub
        } else {
            ub.saturating_sub(constant)
        };
        self.push_constraint(ConstraintKind::Linear { terms, lb, ub })
    }

    /// Adds `lhs ≤ rhs`.
    pub fn add_le(
        &mut self,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> ConstraintHandle<'_> {
        self.add_linear(lhs.into() - rhs.into(), NO_LOWER_BOUND, 0)
    }

    /// Adds `lhs ≥ rhs`.
    pub fn add_ge(
        &mut self,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> ConstraintHandle<'_> {
        self.add_linear(lhs.into() - rhs.into(), 0, NO_UPPER_BOUND)
    }

    /// Adds `lhs = rhs`.
    pub fn add_eq(
        &mut self,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> ConstraintHandle<'_> {
        self.add_linear(lhs.into() - rhs.into(), 0, 0)
    }

    /// Adds `target = max(args)`.
    pub fn add_max_equality<I, V>(&mut self, target: impl Into<IntVar>, args: I) -> ConstraintHandle<'_>
    where
        I: IntoIterator<Item = V>,
        V: Into<IntVar>,
    {
        self.push_constraint(ConstraintKind::MaxEquality {
            target: target.into(),
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Adds `target = min(args)`.
    pub fn add_min_equality<I, V>(&mut self, target: impl Into<IntVar>, args: I) -> ConstraintHandle<'_>
    where
        I: IntoIterator<Item = V>,
        V: Into<IntVar>,
    {
        self.push_constraint(ConstraintKind::MinEquality {
            target: target.into(),
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Adds `target = values[index]`.
    pub fn add_element(
        &mut self,
        index: impl Into<IntVar>,
        values: Vec<i64>,
        target: impl Into<IntVar>,
    ) -> ConstraintHandle<'_> {
        self.push_constraint(ConstraintKind::Element {
            index: index.into(),
            values,
            target: target.into(),
        })
    }

    /// Adds `target ⇔ (inputs all true)` as a linear encoding:
    /// `target ≤ inputᵢ` for each input and `target ≥ Σ inputs - (n - 1)`.
    pub fn add_and_equality(&mut self, target: BoolVar, inputs: &[BoolVar]) {
        for input in inputs {
            self.add_le(target, *input);
        }
        let slack = inputs.len() as i64 - 1;
        self.add_ge(target, LinearExpr::sum(inputs.iter().copied()) - slack);
    }

    /// Adds `target ⇔ (any input true)`.
    pub fn add_or_equality(&mut self, target: BoolVar, inputs: &[BoolVar]) {
        self.add_max_equality(target, inputs.iter().copied());
    }

    fn push_constraint(&mut self, kind: ConstraintKind) -> ConstraintHandle<'_> {
        let index = self.constraints.len();
        self.constraints.push(Constraint {
            kind,
            enforcement: Vec::new(),
        });
        ConstraintHandle {
            constraint: &mut self.constraints[index],
            index,
        }
    }

    /// All constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    // ===== Assumptions and objective =====

    /// Registers a literal that the solver assumes true. On infeasibility a
    /// solver reports a subset of assumptions sufficient for the conflict.
    pub fn add_assumption(&mut self, literal: impl Into<Literal>) {
        self.assumptions.push(literal.into());
    }

    /// Registered assumptions.
    pub fn assumptions(&self) -> &[Literal] {
        &self.assumptions
    }

    /// Sets the objective to minimize, replacing any previous one.
    pub fn minimize(&mut self, expr: impl Into<LinearExpr>) {
        self.objective = Some(expr.into());
    }

    /// The objective, if any.
    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    // ===== Inspection =====

    /// Size summary.
    pub fn stats(&self) -> ModelStats {
        ModelStats {
            variables: self.vars.len(),
            bool_variables: self.vars.iter().filter(|v| v.is_bool).count(),
            constraints: self.constraints.len(),
            enforced_constraints: self
                .constraints
                .iter()
                .filter(|c| !c.enforcement.is_empty())
                .count(),
            assumptions: self.assumptions.len(),
            objective_terms: self.objective.as_ref().map_or(0, |o| o.terms().len()),
        }
    }

    /// Checks a full assignment against domains and constraints.
    ///
    /// Assumptions are not checked. Returns the index of the first violated
    /// constraint, or `Err(None)` when a value lies outside its domain or the
    /// assignment has the wrong length.
    pub fn check_assignment(&self, values: &[i64]) -> Result<(), Option<usize>> {
        if values.len() != self.vars.len() {
            return Err(None);
        }
        if self
            .vars
            .iter()
            .zip(values)
            .any(|(d, v)| *v < d.lb || *v > d.ub)
        {
            return Err(None);
        }
        for (i, c) in self.constraints.iter().enumerate() {
            if c.is_enforced(values) && !c.kind.is_satisfied(values) {
                return Err(Some(i));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_folded_into_bounds() {
        let mut model = CpModel::new("t");
        let s = model.new_int_var(0, 23, "S");
        let l = model.new_int_var(1, 18, "L");
        model.add_ge(s + l, 25);
        match &model.constraints()[0].kind {
            ConstraintKind::Linear { terms, lb, ub } => {
                assert_eq!(terms.len(), 2);
                assert_eq!(*lb, 25);
                assert_eq!(*ub, NO_UPPER_BOUND);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_constants_are_shared() {
        let mut model = CpModel::new("t");
        let a = model.new_constant(0);
        let b = model.new_constant(0);
        let c = model.new_constant(3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(model.num_vars(), 2);
    }

    #[test]
    fn test_check_assignment_respects_enforcement() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(0, 10, "x");
        let b = model.new_bool_var("b");
        model.add_le(x, 3).only_enforce_if([b]);

        assert!(model.check_assignment(&[7, 0]).is_ok());
        assert_eq!(model.check_assignment(&[7, 1]), Err(Some(0)));
        assert!(model.check_assignment(&[2, 1]).is_ok());
        assert_eq!(model.check_assignment(&[11, 0]), Err(None));
    }

    #[test]
    fn test_and_equality_encoding() {
        let mut model = CpModel::new("t");
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        let w = model.new_bool_var("w");
        model.add_and_equality(w, &[a, b]);

        assert!(model.check_assignment(&[1, 1, 1]).is_ok());
        assert!(model.check_assignment(&[1, 0, 0]).is_ok());
        assert!(model.check_assignment(&[1, 1, 0]).is_err());
        assert!(model.check_assignment(&[0, 1, 1]).is_err());
    }

    #[test]
    fn test_element_and_max_semantics() {
        let mut model = CpModel::new("t");
        let i = model.new_int_var(0, 3, "i");
        let t = model.new_int_var(0, 10, "t");
        model.add_element(i, vec![0, 2, 6, 10], t);
        assert!(model.check_assignment(&[2, 6]).is_ok());
        assert!(model.check_assignment(&[2, 5]).is_err());

        let mut model = CpModel::new("t");
        let a = model.new_int_var(-5, 5, "a");
        let zero = model.new_constant(0);
        let m = model.new_int_var(0, 5, "m");
        model.add_max_equality(m, [a, zero]);
        assert!(model.check_assignment(&[-3, 0, 0]).is_ok());
        assert!(model.check_assignment(&[4, 0, 4]).is_ok());
        assert!(model.check_assignment(&[4, 0, 3]).is_err());
    }

    #[test]
    fn test_stats_counts() {
        let mut model = CpModel::new("t");
        let b = model.new_bool_var("b");
        let x = model.new_int_var(0, 4, "x");
        model.add_le(x, 2).only_enforce_if([b]);
        model.add_assumption(b);
        model.minimize(x);
        let stats = model.stats();
        assert_eq!(stats.variables, 2);
        assert_eq!(stats.bool_variables, 1);
        assert_eq!(stats.enforced_constraints, 1);
        assert_eq!(stats.assumptions, 1);
        assert_eq!(stats.objective_terms, 1);
    }
}
