//! Module for the one-vs-all batch solver.

use std::thread;

use alloc::string::ToString;
use alloc::vec::Vec;

use argmin::core::observers::ObserverMode;
use argmin::core::{CostFunction, Executor, Gradient};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use argmin_math::ArgminDot;
use argmin_observer_slog::SlogLogger;

use crate::errors::{Result, RudepError};
use crate::math;
use crate::model::Model;
use crate::solvers::{Loss, Solver};
use crate::space::Instance;
use crate::vector::WeightMatrix;

/// L2-regularized binary problem separating one label from the others.
///
/// `param[0]` is the weight of a bias feature with value `bias`.
struct BinaryProblem<'a> {
    instances: &'a [Instance],
    targets: Vec<f64>,
    loss: Loss,
    cost: f64,
    bias: f64,
}

impl<'a> BinaryProblem<'a> {
    fn new(instances: &'a [Instance], positive: usize, loss: Loss, cost: f64, bias: f64) -> Self {
        let targets = instances
            .iter()
            .map(|x| if x.label == positive { 1.0 } else { -1.0 })
            .collect();
        Self {
            instances,
            targets,
            loss,
            cost,
            bias,
        }
    }

    fn margin(&self, param: &[f64], instance: &Instance) -> f64 {
        let mut z = param[0] * self.bias;
        for f in instance.features.features() {
            if let Some(w) = param.get(f.index) {
                z += w * f.value;
            }
        }
        z
    }
}

impl CostFunction for BinaryProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let mut loss_total = 0.0;
        for (instance, &y) in self.instances.iter().zip(&self.targets) {
            let yz = y * self.margin(param, instance);
            loss_total += match self.loss {
                Loss::Hinge => {
                    let xi = (1.0 - yz).max(0.0);
                    xi * xi
                }
                Loss::Regression => math::log1p_exp_neg(yz),
            };
        }
        let norm2: f64 = param.dot(param);
        Ok(0.5 * norm2 + self.cost * loss_total)
    }
}

impl Gradient for BinaryProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let mut gradients = param.clone();
        for (instance, &y) in self.instances.iter().zip(&self.targets) {
            let yz = y * self.margin(param, instance);
            let coef = match self.loss {
                Loss::Hinge => {
                    let xi = 1.0 - yz;
                    if xi <= 0.0 {
                        continue;
                    }
                    -2.0 * self.cost * xi * y
                }
                Loss::Regression => -self.cost * y * (1.0 - math::sigmoid(yz)),
            };
            gradients[0] += coef * self.bias;
            for f in instance.features.features() {
                if let Some(g) = gradients.get_mut(f.index) {
                    *g += coef * f.value;
                }
            }
        }
        Ok(gradients)
    }
}

/// Batch solver training one L2-regularized binary classifier per label with
/// L-BFGS.
///
/// Hinge selects the squared-hinge SVM objective, regression the logistic
/// objective. Every pass re-optimizes all columns starting from the current
/// weights.
pub struct Liblinear {
    loss: Loss,
    cost: f64,
    bias: f64,
    eps: f64,
    max_iter: u64,
    n_threads: usize,
    average: bool,
    verbose: bool,

    summed: Vec<f64>,
    n_passes: usize,
}

impl Liblinear {
    /// Creates a new solver.
    ///
    /// # Errors
    ///
    /// `bias` must be positive and `n_threads` must be at least 1.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        loss: Loss,
        cost: f64,
        bias: f64,
        eps: f64,
        max_iter: u64,
        n_threads: usize,
        average: bool,
        verbose: bool,
    ) -> Result<Self> {
        if bias <= 0.0 {
            return Err(RudepError::invalid_argument("bias must be positive"));
        }
        if n_threads == 0 {
            return Err(RudepError::invalid_argument("n_threads must be >= 1"));
        }
        Ok(Self {
            loss,
            cost,
            bias,
            eps,
            max_iter,
            n_threads,
            average,
            verbose,
            summed: vec![],
            n_passes: 0,
        })
    }

    fn solve_column(&self, instances: &[Instance], label: usize, init: Vec<f64>) -> Result<(Vec<f64>, f64)> {
        let problem = BinaryProblem::new(instances, label, self.loss, self.cost, self.bias);
        let linesearch = MoreThuenteLineSearch::new()
            .with_c(1e-4, 0.9)
            .map_err(|e| RudepError::solver(e.to_string()))?;
        let solver = LBFGS::new(linesearch, 7)
            .with_tolerance_grad(self.eps)
            .map_err(|e| RudepError::solver(e.to_string()))?;
        let mut executor = Executor::new(problem, solver)
            .configure(|state| state.param(init).max_iters(self.max_iter));
        if self.verbose {
            executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
        }
        let res = executor
            .run()
            .map_err(|e| RudepError::solver(e.to_string()))?;
        let cost = res.state.best_cost;
        let param = res
            .state
            .best_param
            .or(res.state.param)
            .ok_or_else(|| RudepError::solver("L-BFGS returned no parameter"))?;
        Ok((param, cost))
    }

    /// Optimizes the given label columns and returns them with their objective.
    fn solve_columns(&self, model: &Model, instances: &[Instance], labels: &[usize]) -> Result<Vec<(usize, Vec<f64>, f64)>> {
        let weights = model.weights();
        let (s, r) = crossbeam_channel::unbounded();
        for &label in labels {
            let mut init: Vec<f64> = (0..weights.n_features()).map(|f| weights.get(f, label)).collect();
            init[0] /= self.bias;
            s.send((label, init))
                .map_err(|_| RudepError::solver("column queue closed"))?;
        }
        drop(s);

        let results = thread::scope(|scope| {
            let mut threads = vec![];
            for _ in 0..self.n_threads.min(labels.len()) {
                let t = scope.spawn(|| {
                    let mut solved = vec![];
                    while let Ok((label, init)) = r.try_recv() {
                        let res = self.solve_column(instances, label, init);
                        let failed = res.is_err();
                        solved.push(res.map(|(param, cost)| (label, param, cost)));
                        if failed {
                            break;
                        }
                    }
                    solved
                });
                threads.push(t);
            }
            let mut results = vec![];
            for t in threads {
                match t.join() {
                    Ok(solved) => results.extend(solved),
                    Err(_) => results.push(Err(RudepError::solver("L-BFGS worker panicked"))),
                }
            }
            results
        });

        let mut columns = results.into_iter().collect::<Result<Vec<_>>>()?;
        columns.sort_by_key(|&(label, _, _)| label);
        Ok(columns)
    }
}

impl Solver for Liblinear {
    fn train_pass(&mut self, model: &mut Model, instances: &[Instance], _order: &[usize]) -> Result<f64> {
        let labels: Vec<usize> = match model.n_labels() {
            0 => vec![],
            2 => vec![0],
            n => (0..n).collect(),
        };
        if labels.is_empty() || instances.is_empty() {
            return Ok(0.0);
        }

        let columns = self.solve_columns(model, instances, &labels)?;
        let mut objective = 0.0;
        let weights = model.weights_mut();
        for (label, mut param, cost) in columns {
            param[0] *= self.bias;
            for (f, w) in param.into_iter().enumerate() {
                weights.set(f, label, w);
            }
            objective += cost;
        }

        if self.summed.len() != weights.as_slice().len() {
            self.summed = vec![0.0; weights.as_slice().len()];
            self.n_passes = 0;
        }
        for (s, w) in self.summed.iter_mut().zip(weights.as_slice()) {
            *s += w;
        }
        self.n_passes += 1;

        Ok(objective)
    }

    fn weights(&self, model: &Model) -> WeightMatrix {
        let mut weights = model.weights().clone();
        if self.average && self.n_passes != 0 && self.summed.len() == weights.as_slice().len() {
            let n = self.n_passes as f64;
            for (w, s) in weights.as_mut_slice().iter_mut().zip(&self.summed) {
                *w = s / n;
            }
        }
        weights
    }
}
