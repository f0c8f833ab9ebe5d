use core::cmp::Ordering;
use std::io::{Read, Write};

use alloc::string::String;
use alloc::vec::Vec;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::dictionary::{FeatureDictionary, LabelDictionary};
use crate::errors::{Result, RudepError};
use crate::feature::{SparseFeatureVector, StringFeatureVector};
use crate::math;
use crate::vector::WeightMatrix;

/// A label index with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    /// Label index
    pub label: usize,

    /// Score (or probability after [`Model::normalize`])
    pub score: f64,
}

impl Prediction {
    /// Creates a new prediction.
    #[inline(always)]
    pub const fn new(label: usize, score: f64) -> Self {
        Self { label, score }
    }
}

/// Represents a multiclass linear classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    labels: LabelDictionary,
    features: FeatureDictionary,
    weights: WeightMatrix,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates a model with no label and only the bias feature.
    pub fn new() -> Self {
        let features = FeatureDictionary::new();
        let weights = WeightMatrix::new(features.len(), 0);
        Self {
            labels: LabelDictionary::new(),
            features,
            weights,
        }
    }

    /// Creates a zero-weight model over fixed dictionaries.
    pub fn from_dictionaries(labels: LabelDictionary, features: FeatureDictionary) -> Self {
        let weights = WeightMatrix::new(features.len(), labels.len());
        Self {
            labels,
            features,
            weights,
        }
    }

    /// Gets the label dictionary.
    #[inline(always)]
    pub fn labels(&self) -> &LabelDictionary {
        &self.labels
    }

    /// Gets the feature dictionary.
    #[inline(always)]
    pub fn features(&self) -> &FeatureDictionary {
        &self.features
    }

    /// Gets the weights.
    #[inline(always)]
    pub fn weights(&self) -> &WeightMatrix {
        &self.weights
    }

    #[inline(always)]
    pub(crate) fn weights_mut(&mut self) -> &mut WeightMatrix {
        &mut self.weights
    }

    /// Replaces the weights.
    ///
    /// # Errors
    ///
    /// The shape of `weights` must match the dictionaries.
    pub fn set_weights(&mut self, weights: WeightMatrix) -> Result<()> {
        if weights.n_features() != self.features.len() || weights.n_labels() != self.labels.len() {
            return Err(RudepError::invalid_argument(
                "weight matrix shape does not match the dictionaries",
            ));
        }
        self.weights = weights;
        Ok(())
    }

    /// Returns the number of labels.
    #[inline(always)]
    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    /// Returns the number of features including the bias.
    #[inline(always)]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Gets the index of a label, or `None` if it is unknown.
    #[inline(always)]
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.get(label)
    }

    /// Gets the label of an index.
    #[inline(always)]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.label(index)
    }

    /// Registers a label and returns its index. Known labels are a no-op.
    pub fn add_label(&mut self, label: &str) -> usize {
        let (index, is_new) = self.labels.add(label);
        if is_new {
            self.weights.add_label();
        }
        index
    }

    /// Registers a feature and returns its index. Known features are a no-op.
    pub fn add_feature(&mut self, ftype: &str, value: &str) -> usize {
        let (index, is_new) = self.features.add(ftype, value);
        if is_new {
            self.weights.add_feature();
        }
        index
    }

    /// Converts string features into indexed ones, dropping unknown features.
    #[inline(always)]
    pub fn to_sparse(&self, features: &StringFeatureVector) -> SparseFeatureVector {
        self.features.to_sparse(features)
    }

    /// Computes the score of every label.
    pub fn scores(&self, x: &SparseFeatureVector) -> Vec<f64> {
        let n_features = self.weights.n_features();
        match self.n_labels() {
            0 => vec![],
            2 => {
                let mut score = self.weights.get(0, 0);
                for f in x.features().iter().filter(|f| f.index < n_features) {
                    score += self.weights.get(f.index, 0) * f.value;
                }
                vec![score, 0.0 - score]
            }
            _ => {
                let mut scores = self.weights.row(0).to_vec();
                for f in x.features().iter().filter(|f| f.index < n_features) {
                    for (s, w) in scores.iter_mut().zip(self.weights.row(f.index)) {
                        *s += w * f.value;
                    }
                }
                scores
            }
        }
    }

    /// Returns the highest-scoring label.
    pub fn predict_best(&self, x: &SparseFeatureVector) -> Option<Prediction> {
        self.predict_top2(x).map(|(first, _)| first)
    }

    /// Returns the two highest-scoring labels in one pass.
    ///
    /// On ties the smaller label index ranks first, as in [`Model::predictions`].
    pub fn predict_top2(&self, x: &SparseFeatureVector) -> Option<(Prediction, Option<Prediction>)> {
        let mut first: Option<Prediction> = None;
        let mut second: Option<Prediction> = None;
        for (label, score) in self.scores(x).into_iter().enumerate() {
            let p = Prediction::new(label, score);
            match first {
                Some(best) if score > best.score => {
                    second = first;
                    first = Some(p);
                }
                Some(_) => {
                    if second.map_or(true, |s| score > s.score) {
                        second = Some(p);
                    }
                }
                None => first = Some(p),
            }
        }
        first.map(|first| (first, second))
    }

    /// Returns all labels ranked by descending score.
    ///
    /// The sort is stable, so equal scores keep label order.
    pub fn predictions(&self, x: &SparseFeatureVector) -> Vec<Prediction> {
        let mut predictions: Vec<_> = self
            .scores(x)
            .into_iter()
            .enumerate()
            .map(|(label, score)| Prediction::new(label, score))
            .collect();
        sort_predictions(&mut predictions);
        predictions
    }

    /// Replaces scores with their softmax probabilities.
    pub fn normalize(predictions: &mut [Prediction]) {
        let scores: Vec<f64> = predictions.iter().map(|p| p.score).collect();
        for (p, prob) in predictions.iter_mut().zip(math::softmax(&scores)) {
            p.score = prob;
        }
    }

    /// Writes the model.
    ///
    /// # Errors
    ///
    /// Fails when the writer fails.
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, &mut wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Reads a model written by [`Model::write`].
    ///
    /// # Errors
    ///
    /// Truncated or inconsistent data is rejected with [`RudepError::Model`].
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        Ok(bincode::decode_from_std_read(
            &mut rdr,
            bincode::config::standard(),
        )?)
    }
}

/// Sorts predictions by descending score, keeping the order of equal scores.
///
/// `0.0` and `-0.0` compare equal, as in [`Model::predict_top2`].
pub fn sort_predictions(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

impl<Context> Decode<Context> for Model {
    #[allow(clippy::type_complexity)]
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let label_map: Vec<(String, usize)> = Decode::decode(decoder)?;
        let label_list: Vec<String> = Decode::decode(decoder)?;
        let n_labels: usize = Decode::decode(decoder)?;
        let feature_map: Vec<(String, Vec<(String, usize)>)> = Decode::decode(decoder)?;
        let n_features: usize = Decode::decode(decoder)?;
        let weights: Vec<f64> = Decode::decode(decoder)?;

        if label_list.len() != n_labels || label_map.len() != n_labels {
            return Err(DecodeError::Other("label count mismatch"));
        }
        for (label, index) in &label_map {
            if label_list.get(*index) != Some(label) {
                return Err(DecodeError::Other("label map disagrees with label list"));
            }
        }
        let labels =
            LabelDictionary::from_labels(label_list).ok_or(DecodeError::Other("duplicate label"))?;
        let features = FeatureDictionary::from_entries(feature_map, n_features)
            .ok_or(DecodeError::Other("invalid feature indices"))?;
        let weights = WeightMatrix::from_raw(n_features, n_labels, weights)
            .ok_or(DecodeError::Other("weight array size mismatch"))?;
        Ok(Self {
            labels,
            features,
            weights,
        })
    }
}

impl Encode for Model {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.labels.entries(), encoder)?;
        Encode::encode(self.labels.labels(), encoder)?;
        Encode::encode(&self.labels.len(), encoder)?;
        Encode::encode(&self.features.entries(), encoder)?;
        Encode::encode(&self.features.len(), encoder)?;
        Encode::encode(self.weights.as_slice(), encoder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::feature::Feature;

    fn sparse(features: &[(usize, f64)]) -> SparseFeatureVector {
        features.iter().map(|&(i, v)| Feature::new(i, v)).collect()
    }

    fn multiclass_model() -> Model {
        let mut model = Model::new();
        for label in ["A", "B", "C", "D"] {
            model.add_label(label);
        }
        model.add_feature("w", "x");
        model.add_feature("w", "y");
        let w = model.weights_mut();
        // bias
        w.set(0, 0, 0.5);
        w.set(0, 3, -0.25);
        // x
        w.set(1, 1, 2.0);
        w.set(1, 2, 1.0);
        // y
        w.set(2, 2, 1.5);
        w.set(2, 3, 0.5);
        model
    }

    #[test]
    fn test_multiclass_scores() {
        let model = multiclass_model();
        let scores = model.scores(&sparse(&[(1, 1.0), (2, 2.0)]));
        assert_eq!(vec![0.5, 2.0, 4.0, 0.75], scores);
        assert_eq!(vec![0.5, 0.0, 0.0, -0.25], model.scores(&sparse(&[])));
    }

    #[test]
    fn test_binary_symmetry() {
        let mut model = Model::new();
        model.add_label("yes");
        model.add_label("no");
        model.add_feature("w", "x");
        model.add_feature("w", "y");
        model.weights_mut().set(0, 0, 0.25);
        model.weights_mut().set(1, 0, 1.5);
        model.weights_mut().set(2, 1, 0.5);

        for x in [
            sparse(&[]),
            sparse(&[(1, 1.0)]),
            sparse(&[(2, 1.0)]),
            sparse(&[(1, 2.0), (2, 3.0)]),
        ] {
            let scores = model.scores(&x);
            assert_eq!(2, scores.len());
            assert_eq!(scores[1], -scores[0]);
        }
        assert_eq!(vec![1.75, -1.75], model.scores(&sparse(&[(1, 1.0)])));
    }

    #[test]
    fn test_top2_matches_full_sort() {
        let model = multiclass_model();
        for x in [
            sparse(&[(1, 1.0), (2, 2.0)]),
            sparse(&[(2, 1.0)]),
            sparse(&[(1, 1.0)]),
            sparse(&[(2, 1.0), (1, 1.0)]),
            sparse(&[]),
        ] {
            let ranked = model.predictions(&x);
            let (first, second) = model.predict_top2(&x).unwrap();
            assert_eq!(ranked[0], first);
            assert_eq!(Some(ranked[1]), second);
            assert_eq!(Some(first), model.predict_best(&x));
        }
    }

    #[test]
    fn test_ranking_is_stable() {
        let model = multiclass_model();
        // B and C both score 3.0 here
        let x = sparse(&[(1, 1.5), (2, 1.0)]);
        let mut prev = model.predictions(&x);
        for _ in 0..5 {
            let ranked = model.predictions(&x);
            assert_eq!(prev, ranked);
            prev = ranked;
        }
        let labels: Vec<_> = prev.iter().map(|p| p.label).collect();
        assert_eq!(vec![1, 2, 0, 3], labels);
        let (first, second) = model.predict_top2(&x).unwrap();
        assert_eq!((1, Some(2)), (first.label, second.map(|p| p.label)));

        let x = sparse(&[]);
        let ranked: Vec<_> = model.predictions(&x).iter().map(|p| p.label).collect();
        assert_eq!(vec![0, 1, 2, 3], ranked);
    }

    #[test]
    fn test_zero_scores_keep_label_order() {
        let mut model = Model::new();
        for label in ["A", "B", "C"] {
            model.add_label(label);
        }
        let x = sparse(&[]);
        let ranked: Vec<_> = model.predictions(&x).iter().map(|p| p.label).collect();
        assert_eq!(vec![0, 1, 2], ranked);
        let (first, second) = model.predict_top2(&x).unwrap();
        assert_eq!((0, Some(1)), (first.label, second.map(|p| p.label)));

        let mut predictions = vec![
            Prediction::new(0, -0.0),
            Prediction::new(1, 0.0),
            Prediction::new(2, 1.0),
        ];
        sort_predictions(&mut predictions);
        let labels: Vec<_> = predictions.iter().map(|p| p.label).collect();
        assert_eq!(vec![2, 0, 1], labels);
    }

    #[test]
    fn test_no_labels() {
        let model = Model::new();
        assert!(model.predict_top2(&sparse(&[])).is_none());
        assert!(model.predictions(&sparse(&[])).is_empty());
    }

    #[test]
    fn test_normalize() {
        let mut predictions = vec![Prediction::new(2, 3.0), Prediction::new(0, 1.0)];
        Model::normalize(&mut predictions);
        assert_eq!(2, predictions[0].label);
        let total: f64 = predictions.iter().map(|p| p.score).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((predictions[0].score - 1.0 / (1.0 + (-2f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_registration_idempotent() {
        let mut model = multiclass_model();
        let n_weights = model.weights().as_slice().len();
        assert_eq!(1, model.add_label("B"));
        assert_eq!(2, model.add_feature("w", "y"));
        assert_eq!(n_weights, model.weights().as_slice().len());
        assert_eq!(4, model.n_labels());
        assert_eq!(3, model.n_features());
    }

    #[test]
    fn test_registration_keeps_weights() {
        let mut model = multiclass_model();
        let before: Vec<_> = (0..3)
            .flat_map(|f| (0..4).map(move |l| (f, l)))
            .map(|(f, l)| model.weights().get(f, l))
            .collect();
        model.add_label("E");
        model.add_feature("w", "z");
        model.add_label("F");
        for f in 0..3 {
            for l in 0..4 {
                let i = model.weights().weight_index(f, l);
                assert_eq!(before[f * 4 + l], model.weights().as_slice()[i]);
            }
        }
        assert_eq!(4 * 6, model.weights().as_slice().len());
    }

    #[test]
    fn test_write_read() {
        let model = multiclass_model();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let restored = Model::read(buf.as_slice()).unwrap();
        assert_eq!(model, restored);
        assert_eq!(Some(2), restored.label_index("C"));
        assert_eq!(Some(1), restored.features().get("w", "x"));
    }

    #[test]
    fn test_read_truncated() {
        let model = multiclass_model();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(matches!(Model::read(buf.as_slice()), Err(RudepError::Model(_))));
    }

    #[test]
    fn test_read_inconsistent() {
        let feature_map: Vec<(String, Vec<(String, usize)>)> = vec![];
        let data = bincode::encode_to_vec(
            (
                vec![("A".to_string(), 0usize)],
                vec!["A".to_string()],
                1usize,
                feature_map,
                1usize,
                vec![0.0f64, 1.0],
            ),
            bincode::config::standard(),
        )
        .unwrap();
        assert!(matches!(Model::read(data.as_slice()), Err(RudepError::Model(_))));
    }
}
