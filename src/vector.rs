//! Flat weight storage of a linear classifier.

use alloc::vec::Vec;

/// Weights laid out feature-major: `weight_index(f, l) = f * n_labels + l`.
///
/// A model with exactly two labels is binary: only the column of label 0 is
/// read and written, and label 1 has the negated weights. The column of
/// label 1 is still allocated and stays zero, so `weight_index` keeps the
/// same layout for every label count and registering a third label only
/// has to fill that column in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightMatrix {
    n_features: usize,
    n_labels: usize,
    weights: Vec<f64>,
}

impl WeightMatrix {
    /// Creates a zero matrix.
    pub fn new(n_features: usize, n_labels: usize) -> Self {
        Self {
            n_features,
            n_labels,
            weights: vec![0.0; n_features * n_labels],
        }
    }

    pub(crate) fn from_raw(n_features: usize, n_labels: usize, weights: Vec<f64>) -> Option<Self> {
        (weights.len() == n_features * n_labels).then_some(Self {
            n_features,
            n_labels,
            weights,
        })
    }

    /// Returns the number of feature rows.
    #[inline(always)]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Returns the number of label columns.
    #[inline(always)]
    pub const fn n_labels(&self) -> usize {
        self.n_labels
    }

    /// Returns `true` if only the positive column is used.
    #[inline(always)]
    pub const fn is_binary(&self) -> bool {
        self.n_labels == 2
    }

    /// Position of `(feature, label)` in the flat array.
    #[inline(always)]
    pub const fn weight_index(&self, feature: usize, label: usize) -> usize {
        feature * self.n_labels + label
    }

    /// Gets the logical weight of `(feature, label)`.
    #[inline(always)]
    pub fn get(&self, feature: usize, label: usize) -> f64 {
        if self.is_binary() {
            let w = self.weights[self.weight_index(feature, 0)];
            if label == 0 {
                w
            } else {
                -w
            }
        } else {
            self.weights[self.weight_index(feature, label)]
        }
    }

    /// Sets the logical weight of `(feature, label)`.
    #[inline(always)]
    pub fn set(&mut self, feature: usize, label: usize, value: f64) {
        if self.is_binary() {
            let i = self.weight_index(feature, 0);
            self.weights[i] = if label == 0 { value } else { 0.0 - value };
        } else {
            let i = self.weight_index(feature, label);
            self.weights[i] = value;
        }
    }

    /// Adds `delta` to the logical weight of `(feature, label)`.
    #[inline(always)]
    pub fn add(&mut self, feature: usize, label: usize, delta: f64) {
        if self.is_binary() {
            let i = self.weight_index(feature, 0);
            self.weights[i] += if label == 0 { delta } else { -delta };
        } else {
            let i = self.weight_index(feature, label);
            self.weights[i] += delta;
        }
    }

    /// Gets the label block of a feature.
    #[inline(always)]
    pub fn row(&self, feature: usize) -> &[f64] {
        let start = feature * self.n_labels;
        &self.weights[start..start + self.n_labels]
    }

    /// Gets the raw weights.
    #[inline(always)]
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    #[inline(always)]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// Appends a label column.
    ///
    /// A zero is inserted right after every feature's label block, so every
    /// existing `(feature, label)` keeps its logical value.
    pub fn add_label(&mut self) {
        let was_binary = self.is_binary();
        let n_new = self.n_labels + 1;
        let mut weights = Vec::with_capacity(self.n_features * n_new);
        for f in 0..self.n_features {
            let start = f * self.n_labels;
            weights.extend_from_slice(&self.weights[start..start + self.n_labels]);
            if was_binary {
                // label 1 was implicit; materialize its negated weights
                // without producing -0.0
                let last = weights.len() - 1;
                weights[last] = 0.0 - weights[last - 1];
            }
            weights.push(0.0);
        }
        self.n_labels = n_new;
        self.weights = weights;
    }

    /// Appends a feature row of zeros.
    pub fn add_feature(&mut self) {
        self.n_features += 1;
        self.weights.resize(self.weights.len() + self.n_labels, 0.0);
    }
}

/// Gradient entries collected for one instance, keyed by `(feature, label)`.
#[derive(Debug, Default)]
pub(crate) struct SparseGradientVector {
    gradients: Vec<(usize, usize, f64)>,
}

impl SparseGradientVector {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn add(&mut self, feature: usize, label: usize, value: f64) {
        self.gradients.push((feature, label, value));
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }

    /// Applies all entries through `f` and clears the vector.
    #[inline(always)]
    pub fn drain_into<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize, f64),
    {
        for &(feature, label, value) in &self.gradients {
            f(feature, label, value);
        }
        self.gradients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n_features: usize, n_labels: usize) -> WeightMatrix {
        let mut m = WeightMatrix::new(n_features, n_labels);
        for (i, w) in m.as_mut_slice().iter_mut().enumerate() {
            *w = i as f64 + 1.0;
        }
        m
    }

    #[test]
    fn test_binary_to_multiclass_keeps_positive_zeros() {
        let mut m = WeightMatrix::new(3, 2);
        m.set(1, 0, 1.5);
        m.set(2, 1, 0.0);
        assert!(m.as_slice().iter().skip(1).step_by(2).all(|&w| w == 0.0));

        m.add_label();

        assert_eq!(-1.5, m.get(1, 1));
        for f in [0, 2] {
            for l in 0..3 {
                assert!(m.get(f, l).is_sign_positive(), "({f}, {l})");
            }
        }
    }

    #[test]
    fn test_add_label_keeps_logical_weights() {
        let mut m = filled(3, 3);
        let before: Vec<_> = (0..3)
            .flat_map(|f| (0..3).map(move |l| (f, l)))
            .map(|(f, l)| m.get(f, l))
            .collect();

        m.add_label();

        assert_eq!(4, m.n_labels());
        assert_eq!(12, m.as_slice().len());
        for f in 0..3 {
            for l in 0..3 {
                assert_eq!(before[f * 3 + l], m.get(f, l));
                assert_eq!(m.as_slice()[m.weight_index(f, l)], m.get(f, l));
            }
            assert_eq!(0.0, m.get(f, 3));
            assert_eq!(0.0, m.as_slice()[(f + 1) * 4 - 1]);
        }
    }

    #[test]
    fn test_add_feature_appends_row() {
        let mut m = filled(2, 3);
        m.add_feature();
        assert_eq!(3, m.n_features());
        assert_eq!(&[0.0, 0.0, 0.0], m.row(2));
        assert_eq!(&[4.0, 5.0, 6.0], m.row(1));
    }

    #[test]
    fn test_interleaved_registration() {
        let mut m = WeightMatrix::new(1, 0);
        m.add_label();
        m.set(0, 0, 0.5);
        m.add_feature();
        m.set(1, 0, -1.5);
        m.add_label();
        m.add_label();
        m.set(1, 2, 2.0);
        m.add_feature();
        m.add_label();

        assert_eq!(0.5, m.get(0, 0));
        assert_eq!(-0.5, m.get(0, 1));
        assert_eq!(-1.5, m.get(1, 0));
        assert_eq!(1.5, m.get(1, 1));
        assert_eq!(2.0, m.get(1, 2));
        assert_eq!(0.0, m.get(2, 3));
        assert_eq!(3 * 4, m.as_slice().len());
    }

    #[test]
    fn test_binary_negation() {
        let mut m = WeightMatrix::new(2, 2);
        m.set(1, 0, 3.0);
        assert_eq!(-3.0, m.get(1, 1));
        m.add(1, 1, 1.0);
        assert_eq!(2.0, m.get(1, 0));
        assert_eq!(-2.0, m.get(1, 1));
    }

    #[test]
    fn test_sparse_gradient_drain() {
        let mut g = SparseGradientVector::new();
        g.add(0, 1, 0.5);
        g.add(2, 0, -1.0);
        let mut m = WeightMatrix::new(3, 3);
        g.drain_into(|f, l, v| m.add(f, l, v));
        assert!(g.is_empty());
        assert_eq!(0.5, m.get(0, 1));
        assert_eq!(-1.0, m.get(2, 0));
    }
}
