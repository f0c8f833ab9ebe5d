//! Module for the AdaGrad solver.

use core::iter;

use alloc::vec::Vec;

use crate::errors::Result;
use crate::feature::Feature;
use crate::math;
use crate::model::Model;
use crate::solvers::{Loss, Solver};
use crate::space::Instance;
use crate::vector::{SparseGradientVector, WeightMatrix};

/// Online solver with per-weight adaptive learning rates.
///
/// The step of weight `i` is `alpha / (rho + sqrt(G[i] + eps)) * g`, where
/// `G[i]` accumulates the squared gradients seen so far.
pub struct AdaGrad {
    loss: Loss,
    alpha: f64,
    rho: f64,
    eps: f64,
    average: bool,

    shape: (usize, usize),
    accumulators: Vec<f64>,
    summed_updates: Vec<f64>,
    c: f64,
    gradient: SparseGradientVector,
}

impl AdaGrad {
    /// Creates a new solver.
    pub fn new(loss: Loss, alpha: f64, rho: f64, eps: f64, average: bool) -> Self {
        Self {
            loss,
            alpha,
            rho,
            eps,
            average,
            shape: (0, 0),
            accumulators: vec![],
            summed_updates: vec![],
            c: 1.0,
            gradient: SparseGradientVector::new(),
        }
    }

    fn prepare(&mut self, weights: &WeightMatrix) {
        let shape = (weights.n_features(), weights.n_labels());
        if shape != self.shape {
            if self.shape != (0, 0) {
                log::debug!("weight layout changed, resetting AdaGrad accumulators");
            }
            self.shape = shape;
            self.accumulators = vec![0.0; weights.as_slice().len()];
            self.summed_updates = vec![0.0; weights.as_slice().len()];
            self.c = 1.0;
        }
    }

    /// Fills `self.gradient` with the ascent direction for one instance and
    /// returns its loss.
    fn compute_gradient(&mut self, model: &Model, instance: &Instance) -> f64 {
        let features = || {
            iter::once(Feature::new(0, 1.0)).chain(instance.features.features().iter().copied())
        };
        let y = instance.label;
        let scores = model.scores(&instance.features);

        if model.weights().is_binary() {
            let t = if y == 0 { 1.0 } else { -1.0 };
            let z = t * scores[0];
            let (coef, loss) = match self.loss {
                Loss::Hinge => {
                    if z >= 1.0 {
                        return 0.0;
                    }
                    (t, 1.0 - z)
                }
                Loss::Regression => {
                    let p = math::sigmoid(2.0 * z);
                    (2.0 * t * (1.0 - p), math::log1p_exp_neg(2.0 * z))
                }
            };
            for f in features() {
                self.gradient.add(f.index, 0, coef * f.value);
            }
            return loss;
        }

        match self.loss {
            Loss::Hinge => {
                let mut augmented = scores;
                augmented[y] -= 1.0;
                let mut yp = 0;
                for (l, &s) in augmented.iter().enumerate() {
                    if s > augmented[yp] {
                        yp = l;
                    }
                }
                if yp == y {
                    return 0.0;
                }
                for f in features() {
                    self.gradient.add(f.index, y, f.value);
                    self.gradient.add(f.index, yp, -f.value);
                }
                augmented[yp] - augmented[y]
            }
            Loss::Regression => {
                let probs = math::softmax(&scores);
                for (l, &p) in probs.iter().enumerate() {
                    let g = if l == y { 1.0 - p } else { -p };
                    if g == 0.0 {
                        continue;
                    }
                    for f in features() {
                        self.gradient.add(f.index, l, g * f.value);
                    }
                }
                -probs[y].max(f64::MIN_POSITIVE).ln()
            }
        }
    }

    fn apply_gradient(&mut self, weights: &mut WeightMatrix) {
        let binary = weights.is_binary();
        let Self {
            alpha,
            rho,
            eps,
            accumulators,
            summed_updates,
            c,
            gradient,
            ..
        } = self;
        gradient.drain_into(|feature, label, g| {
            let slot = weights.weight_index(feature, if binary { 0 } else { label });
            accumulators[slot] += g * g;
            let step = *alpha / (*rho + (accumulators[slot] + *eps).sqrt()) * g;
            weights.add(feature, label, step);
            let raw_step = if binary && label != 0 { -step } else { step };
            summed_updates[slot] += *c * raw_step;
        });
    }
}

impl Solver for AdaGrad {
    fn train_pass(&mut self, model: &mut Model, instances: &[Instance], order: &[usize]) -> Result<f64> {
        self.prepare(model.weights());
        let mut loss = 0.0;
        for &i in order {
            loss += self.compute_gradient(model, &instances[i]);
            if !self.gradient.is_empty() {
                self.apply_gradient(model.weights_mut());
            }
            self.c += 1.0;
        }
        Ok(loss)
    }

    fn weights(&self, model: &Model) -> WeightMatrix {
        let mut weights = model.weights().clone();
        if self.average && self.summed_updates.len() == weights.as_slice().len() {
            for (w, s) in weights.as_mut_slice().iter_mut().zip(&self.summed_updates) {
                *w -= s / self.c;
            }
        }
        weights
    }
}
