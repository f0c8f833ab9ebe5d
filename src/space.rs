//! Collection of training instances and dictionary construction.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::dictionary::{FeatureDictionary, LabelDictionary};
use crate::feature::{SparseFeatureVector, StringFeatureVector};
use crate::model::Model;

/// A training instance before dictionary lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct StringInstance {
    label: String,
    features: StringFeatureVector,
}

impl StringInstance {
    /// Creates a new instance.
    pub fn new<S>(label: S, features: StringFeatureVector) -> Self
    where
        S: Into<String>,
    {
        Self {
            label: label.into(),
            features,
        }
    }

    /// Gets the gold label.
    #[inline(always)]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the features.
    #[inline(always)]
    pub fn features(&self) -> &StringFeatureVector {
        &self.features
    }
}

/// A training instance with indexed label and features.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    /// Gold label index
    pub label: usize,

    /// Indexed features
    pub features: SparseFeatureVector,
}

/// Instances with a separate iteration order.
///
/// Shuffling permutes `order` only; instance indices stay stable.
#[derive(Clone, Debug, Default)]
pub struct InstanceSet {
    instances: Vec<Instance>,
    order: Vec<usize>,
}

impl InstanceSet {
    /// Creates a set iterated in insertion order.
    pub fn new(instances: Vec<Instance>) -> Self {
        let order = (0..instances.len()).collect();
        Self { instances, order }
    }

    /// Returns the number of instances.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if there is no instance.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Gets the instances in insertion order.
    #[inline(always)]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Gets the current iteration order.
    #[inline(always)]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Restores the insertion order.
    pub fn reset_order(&mut self) {
        for (i, o) in self.order.iter_mut().enumerate() {
            *o = i;
        }
    }

    #[inline(always)]
    pub(crate) fn order_mut(&mut self) -> &mut [usize] {
        &mut self.order
    }
}

/// Accumulates string instances and the frequencies of their labels and features.
#[derive(Clone, Debug, Default)]
pub struct TrainSpace {
    instances: Vec<StringInstance>,
    label_counts: HashMap<String, usize>,
    label_order: Vec<String>,
    feature_counts: HashMap<String, HashMap<String, usize>>,
    feature_order: Vec<(String, String)>,
}

impl TrainSpace {
    /// Creates an empty space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of collected instances.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if no instance was collected.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Gets the collected instances.
    #[inline(always)]
    pub fn instances(&self) -> &[StringInstance] {
        &self.instances
    }

    fn count_label(&mut self, label: &str, n: usize) {
        let count = self.label_counts.entry_ref(label).or_insert(0);
        if *count == 0 {
            self.label_order.push(label.to_string());
        }
        *count += n;
    }

    fn count_feature(&mut self, ftype: &str, value: &str, n: usize) {
        let count = self
            .feature_counts
            .entry_ref(ftype)
            .or_default()
            .entry_ref(value)
            .or_insert(0);
        if *count == 0 {
            self.feature_order
                .push((ftype.to_string(), value.to_string()));
        }
        *count += n;
    }

    /// Adds an instance and counts its label and features.
    pub fn add_instance(&mut self, instance: StringInstance) {
        self.count_label(&instance.label, 1);
        for f in instance.features.iter() {
            self.count_feature(f.ftype(), f.value(), 1);
        }
        self.instances.push(instance);
    }

    /// Moves all instances and counts of `other` into this space.
    ///
    /// Labels and features first seen in `other` are ordered after the ones of
    /// this space.
    pub fn append(&mut self, other: Self) {
        let Self {
            instances,
            label_counts,
            label_order,
            feature_counts,
            feature_order,
        } = other;
        for label in &label_order {
            self.count_label(label, label_counts[label.as_str()]);
        }
        for (ftype, value) in &feature_order {
            let n = feature_counts[ftype.as_str()][value.as_str()];
            self.count_feature(ftype, value, n);
        }
        self.instances.extend(instances);
    }

    /// Builds the dictionaries and converts the instances.
    ///
    /// A label is kept iff its frequency exceeds `label_cutoff`, a feature iff
    /// its frequency exceeds `feature_cutoff`. Instances whose label was cut or
    /// whose features all were cut are skipped. The raw counts are discarded.
    pub fn build(self, label_cutoff: usize, feature_cutoff: usize) -> (Model, InstanceSet) {
        let mut labels = LabelDictionary::new();
        for label in &self.label_order {
            if self.label_counts[label.as_str()] > label_cutoff {
                labels.add(label);
            }
        }
        let mut features = FeatureDictionary::new();
        for (ftype, value) in &self.feature_order {
            if self.feature_counts[ftype.as_str()][value.as_str()] > feature_cutoff {
                features.add(ftype, value);
            }
        }

        let mut instances = Vec::with_capacity(self.instances.len());
        let mut n_skipped = 0;
        for instance in &self.instances {
            let x = features.to_sparse(&instance.features);
            match labels.get(&instance.label) {
                Some(label) if !x.is_empty() => instances.push(Instance { label, features: x }),
                _ => n_skipped += 1,
            }
        }
        log::debug!(
            "built {} labels, {} features, {} instances ({} skipped)",
            labels.len(),
            features.len(),
            instances.len(),
            n_skipped,
        );

        (
            Model::from_dictionaries(labels, features),
            InstanceSet::new(instances),
        )
    }
}
