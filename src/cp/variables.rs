//! CP variable handles.
//!
//! Variables live inside a [`CpModel`](super::CpModel); the handles here are
//! small copyable indices into the model's variable table. Boolean variables
//! are integer variables with domain `[0, 1]`, and a [`Literal`] is a boolean
//! variable or its negation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// An integer variable with a bounded domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntVar(pub(crate) u32);

impl IntVar {
    /// Index of this variable in the model's variable table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A boolean (0/1) variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoolVar(pub(crate) u32);

impl BoolVar {
    /// Index of this variable in the model's variable table.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The positive literal of this variable.
    pub fn literal(self) -> Literal {
        Literal {
            var: self.0,
            negated: false,
        }
    }
}

impl From<BoolVar> for IntVar {
    fn from(var: BoolVar) -> Self {
        IntVar(var.0)
    }
}

impl Not for BoolVar {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.0,
            negated: true,
        }
    }
}

/// A boolean variable or its negation.
///
/// Used as an enforcement guard (`only_enforce_if`) and as an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    var: u32,
    negated: bool,
}

impl Literal {
    /// The underlying boolean variable.
    pub fn var(self) -> BoolVar {
        BoolVar(self.var)
    }

    /// Whether this literal is the negation of its variable.
    pub fn is_negated(self) -> bool {
        self.negated
    }

    /// Dense literal index: `2·var` for the positive literal, `2·var + 1`
    /// for the negation.
    pub fn index(self) -> usize {
        (self.var as usize) * 2 + usize::from(self.negated)
    }

    /// Truth value of this literal given the value of its variable.
    pub fn holds(self, var_value: i64) -> bool {
        (var_value != 0) != self.negated
    }
}

impl From<BoolVar> for Literal {
    fn from(var: BoolVar) -> Self {
        var.literal()
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!v{}", self.var)
        } else {
            write!(f, "v{}", self.var)
        }
    }
}

/// Declared domain of a model variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDomain {
    /// Variable name (for diagnostics only; not required to be unique).
    pub name: String,
    /// Minimum value.
    pub lb: i64,
    /// Maximum value.
    pub ub: i64,
    /// Whether the variable was declared as boolean.
    pub is_bool: bool,
}

impl VarDomain {
    /// Whether the domain is a single value.
    pub fn is_fixed(&self) -> bool {
        self.lb == self.ub
    }

    /// Domain size (ub - lb + 1).
    pub fn domain_size(&self) -> i64 {
        self.ub - self.lb + 1
    }
}
