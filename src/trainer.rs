use core::str::FromStr;
use std::time::Instant;

use alloc::boxed::Box;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::errors::{Result, RudepError};
use crate::model::Model;
use crate::solvers::adagrad::AdaGrad;
use crate::solvers::liblinear::Liblinear;
use crate::solvers::{Loss, Solver};
use crate::space::{InstanceSet, TrainSpace};

/// Training algorithm.
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Algorithm {
    /// Online AdaGrad updates.
    AdaGrad,

    /// One-vs-all batch optimization with L-BFGS.
    Liblinear,
}

impl FromStr for Algorithm {
    type Err = RudepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adagrad" => Ok(Self::AdaGrad),
            "liblinear" => Ok(Self::Liblinear),
            _ => Err(RudepError::unknown_config("algorithm", s)),
        }
    }
}

/// Trainer for the linear classifier
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Clone, Debug)]
pub struct Trainer {
    algorithm: Algorithm,
    loss: Loss,
    alpha: f64,
    rho: f64,
    eps: f64,
    cost: f64,
    bias: f64,
    average: bool,
    iterations: usize,
    max_iter: u64,
    seed: u64,
    n_threads: usize,
    label_cutoff: usize,
    feature_cutoff: usize,
    verbose: bool,
}

impl Trainer {
    /// Creates a new trainer
    pub fn new() -> Self {
        Self {
            algorithm: Algorithm::AdaGrad,
            loss: Loss::Hinge,
            alpha: 0.01,
            rho: 0.1,
            eps: 1e-5,
            cost: 0.1,
            bias: 1.0,
            average: false,
            iterations: 10,
            max_iter: 100,
            seed: 0,
            n_threads: 1,
            label_cutoff: 0,
            feature_cutoff: 0,
            verbose: false,
        }
    }

    /// Creates a trainer from an algorithm name and a loss name.
    ///
    /// # Errors
    ///
    /// Unknown names are rejected with [`RudepError::UnknownConfig`].
    pub fn from_names(algorithm: &str, loss: &str) -> Result<Self> {
        Ok(Self::new().algorithm(algorithm.parse()?).loss(loss.parse()?))
    }

    /// Sets the algorithm.
    pub const fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the loss.
    pub const fn loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    /// Sets the AdaGrad learning rate.
    pub fn alpha(mut self, alpha: f64) -> Result<Self> {
        if alpha <= 0.0 {
            return Err(RudepError::invalid_argument("alpha must be positive"));
        }
        self.alpha = alpha;
        Ok(self)
    }

    /// Sets the AdaGrad denominator offset.
    pub fn rho(mut self, rho: f64) -> Result<Self> {
        if rho < 0.0 {
            return Err(RudepError::invalid_argument("rho must be >= 0"));
        }
        self.rho = rho;
        Ok(self)
    }

    /// Sets the stabilizer of AdaGrad and the gradient tolerance of L-BFGS.
    pub fn eps(mut self, eps: f64) -> Result<Self> {
        if eps < 0.0 {
            return Err(RudepError::invalid_argument("eps must be >= 0"));
        }
        self.eps = eps;
        Ok(self)
    }

    /// Sets the loss weight `C` of the batch solver.
    pub fn cost(mut self, cost: f64) -> Result<Self> {
        if cost <= 0.0 {
            return Err(RudepError::invalid_argument("cost must be positive"));
        }
        self.cost = cost;
        Ok(self)
    }

    /// Sets the value of the bias feature used by the batch solver.
    pub fn bias(mut self, bias: f64) -> Result<Self> {
        if bias <= 0.0 {
            return Err(RudepError::invalid_argument("bias must be positive"));
        }
        self.bias = bias;
        Ok(self)
    }

    /// Publishes averaged weights instead of the last ones.
    pub const fn average(mut self, average: bool) -> Self {
        self.average = average;
        self
    }

    /// Sets the number of passes over the instances.
    pub fn iterations(mut self, iterations: usize) -> Result<Self> {
        if iterations == 0 {
            return Err(RudepError::invalid_argument("iterations must not be 0"));
        }
        self.iterations = iterations;
        Ok(self)
    }

    /// Sets the maximum number of L-BFGS iterations per pass
    pub fn max_iter(mut self, max_iter: u64) -> Result<Self> {
        if max_iter == 0 {
            return Err(RudepError::invalid_argument("max_iter must not be 0"));
        }
        self.max_iter = max_iter;
        Ok(self)
    }

    /// Sets the seed of the shuffle.
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of threads
    pub fn n_threads(mut self, n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(RudepError::invalid_argument("n_threads must not be 0"));
        }
        self.n_threads = n_threads;
        Ok(self)
    }

    /// Sets the label and feature frequency cutoffs used by [`Trainer::build_and_train`].
    pub const fn cutoffs(mut self, label_cutoff: usize, feature_cutoff: usize) -> Self {
        self.label_cutoff = label_cutoff;
        self.feature_cutoff = feature_cutoff;
        self
    }

    /// Attaches the L-BFGS progress logger.
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets a parameter by name.
    ///
    /// Recognized names: `algorithm`, `loss`, `alpha`, `rho`, `eps`, `cost`,
    /// `bias`, `average`, `iterations`, `max_iter`, `seed`, `threads`,
    /// `label_cutoff`, `feature_cutoff` and `verbose`.
    ///
    /// # Errors
    ///
    /// Unknown names fail with [`RudepError::UnknownConfig`], unparsable or
    /// out-of-range values with [`RudepError::InvalidArgument`].
    pub fn set(self, name: &str, value: &str) -> Result<Self> {
        match name {
            "algorithm" => Ok(self.algorithm(value.parse()?)),
            "loss" => Ok(self.loss(value.parse()?)),
            "alpha" => self.alpha(parse_value(value)?),
            "rho" => self.rho(parse_value(value)?),
            "eps" => self.eps(parse_value(value)?),
            "cost" => self.cost(parse_value(value)?),
            "bias" => self.bias(parse_value(value)?),
            "average" => Ok(self.average(parse_value(value)?)),
            "iterations" => self.iterations(parse_value(value)?),
            "max_iter" => self.max_iter(parse_value(value)?),
            "seed" => Ok(self.seed(parse_value(value)?)),
            "threads" => self.n_threads(parse_value(value)?),
            "label_cutoff" => {
                let label_cutoff = parse_value(value)?;
                let feature_cutoff = self.feature_cutoff;
                Ok(self.cutoffs(label_cutoff, feature_cutoff))
            }
            "feature_cutoff" => {
                let label_cutoff = self.label_cutoff;
                Ok(self.cutoffs(label_cutoff, parse_value(value)?))
            }
            "verbose" => Ok(self.verbose(parse_value(value)?)),
            _ => Err(RudepError::unknown_config("parameter", name)),
        }
    }

    fn solver(&self) -> Result<Box<dyn Solver>> {
        Ok(match self.algorithm {
            Algorithm::AdaGrad => Box::new(AdaGrad::new(
                self.loss,
                self.alpha,
                self.rho,
                self.eps,
                self.average,
            )),
            Algorithm::Liblinear => Box::new(Liblinear::new(
                self.loss,
                self.cost,
                self.bias,
                self.eps,
                self.max_iter,
                self.n_threads,
                self.average,
                self.verbose,
            )?),
        })
    }

    fn run_pass(
        &self,
        solver: &mut dyn Solver,
        rng: &mut ChaCha8Rng,
        model: &mut Model,
        instances: &mut InstanceSet,
        pass: usize,
    ) -> Result<()> {
        let start = Instant::now();
        instances.order_mut().shuffle(rng);
        let loss = solver.train_pass(model, instances.instances(), instances.order())?;
        log::info!(
            "pass {}/{}: loss = {:.6}, elapsed = {:?}",
            pass + 1,
            self.iterations,
            loss,
            start.elapsed(),
        );
        Ok(())
    }

    /// Trains the weights of `model` on `instances`.
    ///
    /// The visiting order is reshuffled before every pass by a generator
    /// seeded once, so equal inputs give bit-identical weights.
    ///
    /// # Errors
    ///
    /// Fails when the batch solver fails.
    pub fn train(&self, model: &mut Model, instances: &mut InstanceSet) -> Result<()> {
        let mut solver = self.solver()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        for pass in 0..self.iterations {
            self.run_pass(solver.as_mut(), &mut rng, model, instances, pass)?;
        }
        solver.finish(model);
        Ok(())
    }

    /// Trains like [`Trainer::train`] but scores the published weights with
    /// `evaluate` after every pass.
    ///
    /// Training stops at the first pass whose score is lower than the best so
    /// far; `model` receives the best weights and the best score is returned.
    ///
    /// # Errors
    ///
    /// Fails when the batch solver fails.
    pub fn train_with_dev<F>(
        &self,
        model: &mut Model,
        instances: &mut InstanceSet,
        mut evaluate: F,
    ) -> Result<f64>
    where
        F: FnMut(&Model) -> f64,
    {
        let mut solver = self.solver()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Model)> = None;
        for pass in 0..self.iterations {
            self.run_pass(solver.as_mut(), &mut rng, model, instances, pass)?;
            let mut snapshot = model.clone();
            solver.finish(&mut snapshot);
            let score = evaluate(&snapshot);
            log::info!("pass {}/{}: dev score = {:.6}", pass + 1, self.iterations, score);
            match &best {
                Some((best_score, _)) if score < *best_score => {
                    log::info!("dev score decreased, stopping");
                    break;
                }
                _ => best = Some((score, snapshot)),
            }
        }
        match best {
            Some((score, snapshot)) => {
                *model = snapshot;
                Ok(score)
            }
            None => Err(RudepError::invalid_argument("iterations must not be 0")),
        }
    }

    /// Builds a model from the counts of `space` and trains it.
    ///
    /// # Errors
    ///
    /// Fails when the batch solver fails.
    pub fn build_and_train(&self, space: TrainSpace) -> Result<Model> {
        let (mut model, mut instances) = space.build(self.label_cutoff, self.feature_cutoff);
        self.train(&mut model, &mut instances)?;
        Ok(model)
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn parse_value<T>(value: &str) -> Result<T>
where
    T: FromStr,
{
    value
        .parse()
        .map_err(|_| RudepError::invalid_argument("unparsable parameter value"))
}
