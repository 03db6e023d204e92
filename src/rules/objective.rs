//! Objective aggregation.

use crate::cp::LinearExpr;

/// Collects objective terms from every rule into one sum.
///
/// No normalisation or re-weighting happens here; each rule scales its own
/// terms.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveBuilder {
    terms: Vec<LinearExpr>,
}

impl ObjectiveBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one term.
    pub fn add(&mut self, term: impl Into<LinearExpr>) {
        self.terms.push(term.into());
    }

    /// Adds several terms.
    pub fn extend<I, T>(&mut self, terms: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<LinearExpr>,
    {
        self.terms.extend(terms.into_iter().map(Into::into));
    }

    /// Number of collected terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The sum of all terms.
    pub fn build(self) -> LinearExpr {
        LinearExpr::sum(self.terms)
    }
}
