use alloc::string::String;
use alloc::vec::Vec;

/// Represents a string feature produced by a feature template.
#[derive(Clone, Debug, PartialEq)]
pub struct StringFeature {
    ftype: String,
    value: String,
    weight: Option<f64>,
}

impl StringFeature {
    /// Creates a new binary feature.
    ///
    /// # Arguments
    ///
    /// * `ftype` - Feature type (template name).
    /// * `value` - Feature value.
    #[inline(always)]
    pub fn new<T, V>(ftype: T, value: V) -> Self
    where
        T: Into<String>,
        V: Into<String>,
    {
        Self {
            ftype: ftype.into(),
            value: value.into(),
            weight: None,
        }
    }

    /// Creates a new feature with an explicit weight.
    #[inline(always)]
    pub fn with_weight<T, V>(ftype: T, value: V, weight: f64) -> Self
    where
        T: Into<String>,
        V: Into<String>,
    {
        Self {
            ftype: ftype.into(),
            value: value.into(),
            weight: Some(weight),
        }
    }

    /// Gets the feature type.
    #[inline(always)]
    pub fn ftype(&self) -> &str {
        &self.ftype
    }

    /// Gets the feature value.
    #[inline(always)]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Gets the explicit weight, if any.
    #[inline(always)]
    pub const fn weight(&self) -> Option<f64> {
        self.weight
    }
}

/// Ordered list of string features extracted at one decision point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StringFeatureVector {
    features: Vec<StringFeature>,
}

impl StringFeatureVector {
    /// Creates an empty vector.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binary feature.
    #[inline(always)]
    pub fn push<T, V>(&mut self, ftype: T, value: V)
    where
        T: Into<String>,
        V: Into<String>,
    {
        self.features.push(StringFeature::new(ftype, value));
    }

    /// Appends a weighted feature.
    #[inline(always)]
    pub fn push_weighted<T, V>(&mut self, ftype: T, value: V, weight: f64)
    where
        T: Into<String>,
        V: Into<String>,
    {
        self.features
            .push(StringFeature::with_weight(ftype, value, weight));
    }

    /// Returns the number of features.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the vector has no feature.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns an iterator over the features.
    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &StringFeature> {
        self.features.iter()
    }
}

impl FromIterator<StringFeature> for StringFeatureVector {
    fn from_iter<I: IntoIterator<Item = StringFeature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Represents a feature resolved to its dictionary index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feature {
    /// Feature index (never 0, which is the bias)
    pub index: usize,

    /// Feature value
    pub value: f64,
}

impl Feature {
    /// Creates a new feature with its index and value
    #[inline(always)]
    pub const fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

/// Ordered list of indexed features.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseFeatureVector {
    features: Vec<Feature>,
}

impl SparseFeatureVector {
    /// Creates an empty vector.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a feature. Indices `0` (the bias) are ignored.
    #[inline(always)]
    pub fn push(&mut self, feature: Feature) {
        if feature.index > 0 {
            self.features.push(feature);
        }
    }

    /// Returns the number of features.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if no feature survived the dictionary lookup.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Gets the features.
    #[inline(always)]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

impl FromIterator<Feature> for SparseFeatureVector {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut v = Self::new();
        for feature in iter {
            v.push(feature);
        }
        v
    }
}
