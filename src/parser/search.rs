use core::cmp::Ordering;

use alloc::vec::Vec;

use crate::errors::{Result, RudepError};
use crate::model::Prediction;
use crate::parser::branch::Branch;
use crate::parser::tree::DependencyTree;
use crate::space::StringInstance;

/// Frontier of alternative decisions explored after the first derivation.
#[derive(Clone, Debug)]
pub struct BranchSearch {
    beam_size: usize,
    margin: f64,
    branches: Vec<Branch>,
    next: usize,
}

impl BranchSearch {
    /// Creates an empty frontier.
    ///
    /// # Errors
    ///
    /// `beam_size` must be at least 1 and `margin` must not be negative.
    pub fn new(beam_size: usize, margin: f64) -> Result<Self> {
        if beam_size == 0 {
            return Err(RudepError::invalid_argument("beam_size must not be 0"));
        }
        if margin < 0.0 {
            return Err(RudepError::invalid_argument("margin must be >= 0"));
        }
        Ok(Self {
            beam_size,
            margin,
            branches: vec![],
            next: 0,
        })
    }

    /// Returns `true` if alternatives are recorded at all.
    #[inline(always)]
    pub const fn is_enabled(&self) -> bool {
        self.beam_size > 1
    }

    /// Gets the beam size.
    #[inline(always)]
    pub const fn beam_size(&self) -> usize {
        self.beam_size
    }

    /// Returns `true` if the runner-up is close enough to the best decision to
    /// be explored.
    #[inline(always)]
    pub fn is_ambiguous(&self, best: Prediction, second: Prediction) -> bool {
        self.is_enabled() && best.score - second.score < self.margin
    }

    /// Records an alternative.
    pub fn add(&mut self, branch: Branch) {
        self.branches.push(branch);
    }

    /// Returns the number of recorded branches.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns `true` if no branch is recorded.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Gets the recorded branches.
    #[inline(always)]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Keeps the `beam_size - 1` branches with the highest decision scores,
    /// ordered by descending score.
    pub fn trim_states(&mut self) {
        self.branches.sort_by(|a, b| {
            b.prediction
                .score
                .partial_cmp(&a.prediction.score)
                .unwrap_or(Ordering::Equal)
        });
        self.branches.truncate(self.beam_size - 1);
        self.next = 0;
    }

    /// Returns the next retained branch, or `None` once the frontier is
    /// exhausted.
    pub fn next_branch(&mut self) -> Option<&Branch> {
        let branch = self.branches.get(self.next)?;
        self.next += 1;
        Some(branch)
    }

    /// Drops every branch.
    pub fn clear(&mut self) {
        self.branches.clear();
        self.next = 0;
    }
}

/// A finished derivation with the instances it collected.
#[derive(Clone, Debug)]
pub struct Derivation {
    pub(crate) tree: DependencyTree,
    pub(crate) score: f64,
    pub(crate) instances: Vec<StringInstance>,
}

impl Derivation {
    /// Creates a derivation.
    pub fn new(tree: DependencyTree, score: f64, instances: Vec<StringInstance>) -> Self {
        Self {
            tree,
            score,
            instances,
        }
    }

    /// Gets the arcs.
    #[inline(always)]
    pub fn tree(&self) -> &DependencyTree {
        &self.tree
    }

    /// Gets the summed transition score.
    #[inline(always)]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Gets the collected instances.
    #[inline(always)]
    pub fn instances(&self) -> &[StringInstance] {
        &self.instances
    }

    /// Splits the derivation into its arcs and instances.
    pub fn into_parts(self) -> (DependencyTree, Vec<StringInstance>) {
        (self.tree, self.instances)
    }
}

/// Returns the index of the best derivation.
///
/// With `gold`, the derivation matching the most gold arcs wins; otherwise the
/// one with the highest score. The first one wins ties.
pub fn best_derivation(derivations: &[Derivation], gold: Option<&DependencyTree>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, d) in derivations.iter().enumerate() {
        let key = match gold {
            Some(gold) => d.tree.count_matches(gold) as f64,
            None => d.score,
        };
        if best.map_or(true, |(_, k)| key > k) {
            best = Some((i, key));
        }
    }
    best.map(|(i, _)| i)
}
