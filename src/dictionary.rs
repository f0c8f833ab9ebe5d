//! Label and feature dictionaries.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::feature::{Feature, SparseFeatureVector, StringFeatureVector};

/// Bidirectional map between labels and dense indices.
///
/// Indices follow insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelDictionary {
    indices: HashMap<String, usize>,
    labels: Vec<String>,
}

impl LabelDictionary {
    /// Creates an empty dictionary.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of labels.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if the dictionary has no label.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Gets the index of the given label.
    #[inline(always)]
    pub fn get(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    /// Gets the label of the given index.
    #[inline(always)]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Gets all labels in index order.
    #[inline(always)]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Adds a label and returns its index together with `true` if it was new.
    pub fn add(&mut self, label: &str) -> (usize, bool) {
        if let Some(&index) = self.indices.get(label) {
            return (index, false);
        }
        let index = self.labels.len();
        self.indices.insert(label.to_string(), index);
        self.labels.push(label.to_string());
        (index, true)
    }

    pub(crate) fn from_labels(labels: Vec<String>) -> Option<Self> {
        let mut indices = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if indices.insert(label.clone(), i).is_some() {
                return None;
            }
        }
        Some(Self { indices, labels })
    }

    /// Pairs of `(label, index)` sorted by index.
    pub(crate) fn entries(&self) -> Vec<(String, usize)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect()
    }
}

/// Map from typed feature strings to dense indices.
///
/// Index 0 is reserved for the bias and is never assigned to a feature, so a
/// fresh dictionary already has a size of 1.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureDictionary {
    types: HashMap<String, HashMap<String, usize>>,
    n_features: usize,
}

impl Default for FeatureDictionary {
    fn default() -> Self {
        Self {
            types: HashMap::new(),
            n_features: 1,
        }
    }
}

impl FeatureDictionary {
    /// Creates a dictionary holding only the bias.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of features including the bias.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.n_features
    }

    /// Returns `true` if no feature other than the bias is registered.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.n_features <= 1
    }

    /// Gets the index of the given feature.
    #[inline(always)]
    pub fn get(&self, ftype: &str, value: &str) -> Option<usize> {
        self.types.get(ftype).and_then(|values| values.get(value)).copied()
    }

    /// Adds a feature and returns its index together with `true` if it was new.
    pub fn add(&mut self, ftype: &str, value: &str) -> (usize, bool) {
        let values = self.types.entry_ref(ftype).or_default();
        if let Some(&index) = values.get(value) {
            return (index, false);
        }
        let index = self.n_features;
        values.insert(value.to_string(), index);
        self.n_features += 1;
        (index, true)
    }

    /// Converts string features into indexed ones.
    ///
    /// Unknown features are dropped. The result may be empty; callers must
    /// check it before using it as a training instance.
    pub fn to_sparse(&self, features: &StringFeatureVector) -> SparseFeatureVector {
        features
            .iter()
            .filter_map(|f| {
                self.get(f.ftype(), f.value())
                    .map(|index| Feature::new(index, f.weight().unwrap_or(1.0)))
            })
            .collect()
    }

    pub(crate) fn from_entries(
        entries: Vec<(String, Vec<(String, usize)>)>,
        n_features: usize,
    ) -> Option<Self> {
        if n_features == 0 {
            return None;
        }
        let mut types: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut seen = vec![false; n_features];
        seen[0] = true;
        for (ftype, values) in entries {
            let map = types.entry(ftype).or_default();
            for (value, index) in values {
                if index == 0 || index >= n_features || seen[index] {
                    return None;
                }
                seen[index] = true;
                map.insert(value, index);
            }
        }
        if seen.iter().any(|&s| !s) {
            return None;
        }
        Some(Self { types, n_features })
    }

    /// Triples grouped by type, types sorted by name and values by index.
    pub(crate) fn entries(&self) -> Vec<(String, Vec<(String, usize)>)> {
        let mut entries: Vec<_> = self
            .types
            .iter()
            .map(|(ftype, values)| {
                let mut values: Vec<_> = values.iter().map(|(v, &i)| (v.clone(), i)).collect();
                values.sort_unstable_by_key(|&(_, i)| i);
                (ftype.clone(), values)
            })
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_insertion_order() {
        let mut labels = LabelDictionary::new();
        assert_eq!((0, true), labels.add("N_S"));
        assert_eq!((1, true), labels.add("L_R_nsubj"));
        assert_eq!((0, false), labels.add("N_S"));
        assert_eq!(2, labels.len());
        assert_eq!(Some(1), labels.get("L_R_nsubj"));
        assert_eq!(Some("N_S"), labels.label(0));
        assert_eq!(None, labels.get("R_S_obj"));
        assert_eq!(None, labels.label(2));
    }

    #[test]
    fn test_feature_index_starts_after_bias() {
        let mut features = FeatureDictionary::new();
        assert_eq!(1, features.len());
        assert!(features.is_empty());
        assert_eq!((1, true), features.add("f0", "John"));
        assert_eq!((2, true), features.add("p0", "NNP"));
        assert_eq!((3, true), features.add("f0", "saw"));
        assert_eq!((1, false), features.add("f0", "John"));
        assert_eq!(4, features.len());
        assert_eq!(Some(3), features.get("f0", "saw"));
        assert_eq!(None, features.get("p0", "saw"));
    }

    #[test]
    fn test_to_sparse_drops_unknown() {
        let mut features = FeatureDictionary::new();
        features.add("f0", "John");
        features.add("f1", "saw");

        let mut v = StringFeatureVector::new();
        v.push("f0", "Mary");
        v.push("f1", "saw");
        v.push_weighted("f0", "John", 0.5);
        v.push("f2", "saw");

        let x = features.to_sparse(&v);
        assert_eq!(&[Feature::new(2, 1.0), Feature::new(1, 0.5)], x.features());

        let mut v = StringFeatureVector::new();
        v.push("f9", "unknown");
        assert!(features.to_sparse(&v).is_empty());
    }

    #[test]
    fn test_entries_roundtrip() {
        let mut features = FeatureDictionary::new();
        features.add("b", "x");
        features.add("a", "y");
        features.add("b", "z");
        let restored = FeatureDictionary::from_entries(features.entries(), features.len());
        assert_eq!(Some(features), restored);

        assert!(FeatureDictionary::from_entries(vec![("a".into(), vec![("x".into(), 0)])], 2).is_none());
        assert!(FeatureDictionary::from_entries(vec![], 3).is_none());
    }
}
