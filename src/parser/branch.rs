use alloc::vec::Vec;

use crate::model::Prediction;
use crate::parser::tree::DependencyTree;

/// Owned snapshot of a derivation at an ambiguous step.
///
/// Restoring it and applying [`Branch::prediction`] continues the derivation
/// with the alternative decision. A branch shares nothing with the state it
/// was taken from.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub(crate) lambda: usize,
    pub(crate) beta: usize,
    pub(crate) n_transitions: usize,
    pub(crate) score: f64,
    pub(crate) reduced: Vec<bool>,
    pub(crate) tree: DependencyTree,
    pub(crate) prediction: Prediction,
}

impl Branch {
    /// Gets the decision to apply after restoring.
    #[inline(always)]
    pub const fn prediction(&self) -> Prediction {
        self.prediction
    }

    /// Gets the number of transitions applied before the snapshot.
    #[inline(always)]
    pub const fn n_transitions(&self) -> usize {
        self.n_transitions
    }

    /// Gets the arcs at the snapshot.
    #[inline(always)]
    pub fn tree(&self) -> &DependencyTree {
        &self.tree
    }
}
