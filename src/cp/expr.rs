//! Linear expressions over model variables.
//!
//! A [`LinearExpr`] is `Σ coef·var + constant`. Expressions are built with
//! the usual arithmetic operators:
//!
//! ```
//! use u_roster::cp::{CpModel, LinearExpr};
//!
//! let mut model = CpModel::new("demo");
//! let s = model.new_int_var(0, 23, "S");
//! let l = model.new_int_var(1, 18, "L");
//! let end: LinearExpr = s + l - 24;
//! assert_eq!(end.constant(), -24);
//! assert_eq!(end.terms().len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

use super::variables::{BoolVar, IntVar, Literal};

/// `Σ coef·var + constant`.
///
/// Terms are kept merged by variable; coefficients that cancel to zero are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(IntVar, i64)>,
    constant: i64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant_expr(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// A single term `coef·var`.
    pub fn term(var: impl Into<IntVar>, coef: i64) -> Self {
        let mut expr = Self::new();
        expr.add_term(var, coef);
        expr
    }

    /// Sum of arbitrary expression-like items.
    pub fn sum<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LinearExpr>,
    {
        let mut total = Self::new();
        for item in items {
            total.add_expr(item.into(), 1);
        }
        total
    }

    /// Adds `coef·var` in place.
    pub fn add_term(&mut self, var: impl Into<IntVar>, coef: i64) {
        if coef == 0 {
            return;
        }
        let var = var.into();
        match self.terms.iter().position(|(v, _)| *v == var) {
            Some(pos) => {
                self.terms[pos].1 += coef;
                if self.terms[pos].1 == 0 {
                    self.terms.remove(pos);
                }
            }
            None => self.terms.push((var, coef)),
        }
    }

    /// Adds `factor·other` in place.
    pub fn add_expr(&mut self, other: LinearExpr, factor: i64) {
        for (var, coef) in other.terms {
            self.add_term(var, coef * factor);
        }
        self.constant += other.constant * factor;
    }

    /// Adds a constant in place.
    pub fn add_constant(&mut self, value: i64) {
        self.constant += value;
    }

    /// Variable terms `(var, coef)`.
    pub fn terms(&self) -> &[(IntVar, i64)] {
        &self.terms
    }

    /// Constant offset.
    pub fn constant(&self) -> i64 {
        self.constant
    }

    /// Whether the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluates the expression against a full assignment indexed by
    /// variable index.
    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.index()).copied().unwrap_or(0))
            .sum::<i64>()
            + self.constant
    }

    /// Splits off the constant: returns the expression with constant zero
    /// and the removed constant.
    pub(crate) fn into_parts(self) -> (Vec<(IntVar, i64)>, i64) {
        (self.terms, self.constant)
    }
}

impl From<IntVar> for LinearExpr {
    fn from(var: IntVar) -> Self {
        Self::term(var, 1)
    }
}

impl From<BoolVar> for LinearExpr {
    fn from(var: BoolVar) -> Self {
        Self::term(var, 1)
    }
}

/// A negated literal `¬b` is the expression `1 - b`.
impl From<Literal> for LinearExpr {
    fn from(lit: Literal) -> Self {
        if lit.is_negated() {
            let mut expr = Self::constant_expr(1);
            expr.add_term(lit.var(), -1);
            expr
        } else {
            Self::term(lit.var(), 1)
        }
    }
}

impl From<i64> for LinearExpr {
    fn from(value: i64) -> Self {
        Self::constant_expr(value)
    }
}

impl From<i32> for LinearExpr {
    fn from(value: i32) -> Self {
        Self::constant_expr(i64::from(value))
    }
}

impl From<&LinearExpr> for LinearExpr {
    fn from(expr: &LinearExpr) -> Self {
        expr.clone()
    }
}

// ===== Operators =====

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self.add_expr(rhs.into(), 1);
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self.add_expr(rhs.into(), -1);
        self
    }
}

impl Mul<i64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: i64) -> LinearExpr {
        let mut out = LinearExpr::new();
        out.add_expr(self, rhs);
        out
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1
    }
}

macro_rules! var_operators {
    ($ty:ty) => {
        impl<T: Into<LinearExpr>> Add<T> for $ty {
            type Output = LinearExpr;

            fn add(self, rhs: T) -> LinearExpr {
                LinearExpr::from(self) + rhs
            }
        }

        impl<T: Into<LinearExpr>> Sub<T> for $ty {
            type Output = LinearExpr;

            fn sub(self, rhs: T) -> LinearExpr {
                LinearExpr::from(self) - rhs
            }
        }

        impl Mul<i64> for $ty {
            type Output = LinearExpr;

            fn mul(self, rhs: i64) -> LinearExpr {
                LinearExpr::term(self, rhs)
            }
        }

        impl Mul<$ty> for i64 {
            type Output = LinearExpr;

            fn mul(self, rhs: $ty) -> LinearExpr {
                LinearExpr::term(rhs, self)
            }
        }
    };
}

var_operators!(IntVar);
var_operators!(BoolVar);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_merge_and_cancel() {
        let a = IntVar(0);
        let b = IntVar(1);
        let expr = a + b + a * 2 - b;
        assert_eq!(expr.terms(), &[(a, 3)]);
        assert_eq!(expr.constant(), 0);
    }

    #[test]
    fn test_constant_folding() {
        let a = IntVar(0);
        let expr = a + 5 - 12;
        assert_eq!(expr.constant(), -7);
        assert_eq!(expr.evaluate(&[10]), 3);
    }

    #[test]
    fn test_negated_literal_expression() {
        let b = BoolVar(0);
        let expr = LinearExpr::from(!b);
        assert_eq!(expr.evaluate(&[0]), 1);
        assert_eq!(expr.evaluate(&[1]), 0);
    }

    #[test]
    fn test_sum_and_scale() {
        let vars = [BoolVar(0), BoolVar(1), BoolVar(2)];
        let total = LinearExpr::sum(vars) * 3;
        assert_eq!(total.evaluate(&[1, 0, 1]), 6);
        assert_eq!((-total).evaluate(&[1, 1, 1]), -9);
    }

    #[test]
    fn test_coefficient_on_left() {
        let a = IntVar(0);
        let expr = 4_i64 * a;
        assert_eq!(expr.terms(), &[(a, 4)]);
    }
}
