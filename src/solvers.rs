//! Weight-update rules.

pub mod adagrad;
pub mod liblinear;

use core::str::FromStr;

use crate::errors::{Result, RudepError};
use crate::model::Model;
use crate::space::Instance;
use crate::vector::WeightMatrix;

/// Loss minimized by a solver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Loss {
    /// Margin (hinge) loss.
    Hinge,

    /// Logistic-regression loss.
    Regression,
}

impl FromStr for Loss {
    type Err = RudepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hinge" => Ok(Self::Hinge),
            "regression" => Ok(Self::Regression),
            _ => Err(RudepError::unknown_config("loss", s)),
        }
    }
}

/// A rule that updates the weights of a model from training instances.
pub trait Solver {
    /// Runs one pass over `instances` visited in `order` and returns the loss
    /// of the pass.
    ///
    /// # Errors
    ///
    /// Batch solvers may fail to converge.
    fn train_pass(&mut self, model: &mut Model, instances: &[Instance], order: &[usize]) -> Result<f64>;

    /// Returns the weights to publish: the running average in averaged mode,
    /// the current weights otherwise.
    fn weights(&self, model: &Model) -> WeightMatrix;

    /// Writes the published weights into the model.
    fn finish(&self, model: &mut Model) {
        let weights = self.weights(model);
        *model.weights_mut() = weights;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_names() {
        assert_eq!(Loss::Hinge, "hinge".parse().unwrap());
        assert_eq!(Loss::Regression, "regression".parse().unwrap());
        let e = "squared".parse::<Loss>().unwrap_err();
        assert_eq!("UnknownConfigError: unknown loss: squared", e.to_string());
    }
}
