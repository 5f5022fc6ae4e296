// Binary logistic regression over sparse TF-IDF rows.
//
// Serving only needs `predict_proba`: a dot product, the intercept, and the
// logistic function. Training minimizes the L2-regularized log loss
//
//     ½‖w‖² + C · Σᵢ (log(1 + exp(zᵢ)) − yᵢ·zᵢ),   zᵢ = w·xᵢ + b
//
// with L-BFGS and a backtracking line search. The intercept is not
// penalized.

use std::collections::VecDeque;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::features::SparseVector;
use crate::preprocess::PREPROCESS_VERSION;

/// Optimizer settings for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    /// Inverse regularization strength.
    pub c: f64,
    /// Hard cap on L-BFGS iterations.
    pub max_iter: usize,
    /// Stop once the largest gradient component is below this.
    pub tol: f64,
    /// Number of curvature pairs L-BFGS remembers.
    pub history: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            history: 10,
        }
    }
}

/// A fitted linear model: one weight per feature plus an intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Version of `preprocess` the training texts went through.
    pub preprocess_version: u32,
    weights: Vec<f64>,
    intercept: f64,
    pub n_features: usize,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticRegression {
    /// Build a model directly from known parameters.
    pub fn from_parameters(weights: Vec<f64>, intercept: f64) -> Self {
        Self {
            preprocess_version: PREPROCESS_VERSION,
            n_features: weights.len(),
            weights,
            intercept,
            trained_at: Utc::now(),
            train_rows: 0,
            iterations: 0,
            converged: true,
        }
    }

    /// Fit on `rows` with binary targets (`true` = positive class).
    pub fn fit(
        rows: &[SparseVector],
        targets: &[bool],
        n_features: usize,
        params: TrainParams,
    ) -> Result<Self> {
        if rows.len() != targets.len() {
            anyhow::bail!(
                "Got {} feature rows but {} targets",
                rows.len(),
                targets.len()
            );
        }
        if rows.is_empty() {
            anyhow::bail!("Cannot fit a classifier on zero rows");
        }
        let positives = targets.iter().filter(|t| **t).count();
        if positives == 0 || positives == targets.len() {
            anyhow::bail!(
                "Training data needs both classes, got {positives} positive of {} rows",
                targets.len()
            );
        }
        if let Some(max) = rows.iter().filter_map(|r| r.max_index()).max() {
            if max >= n_features {
                anyhow::bail!("Feature index {max} out of range for {n_features} features");
            }
        }
        if params.c <= 0.0 || params.max_iter == 0 || params.history == 0 {
            anyhow::bail!("Invalid optimizer settings: {params:?}");
        }

        let problem = Problem {
            rows,
            targets,
            n_features,
            c: params.c,
        };
        let outcome = lbfgs(&problem, params);

        if outcome.converged {
            info!(
                iterations = outcome.iterations,
                loss = outcome.loss,
                "Logistic regression converged"
            );
        } else {
            warn!(
                iterations = outcome.iterations,
                max_iter = params.max_iter,
                loss = outcome.loss,
                "Logistic regression stopped before converging"
            );
        }

        let mut theta = outcome.theta;
        let intercept = theta.pop().unwrap_or(0.0);

        Ok(Self {
            preprocess_version: PREPROCESS_VERSION,
            weights: theta,
            intercept,
            n_features,
            trained_at: Utc::now(),
            train_rows: rows.len(),
            iterations: outcome.iterations,
            converged: outcome.converged,
        })
    }

    /// Raw linear score `w·x + b`.
    pub fn decision_function(&self, x: &SparseVector) -> f64 {
        x.dot(&self.weights) + self.intercept
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, x: &SparseVector) -> f64 {
        sigmoid(self.decision_function(x))
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Check internal consistency of a deserialized model.
    pub fn validate(&self) -> Result<()> {
        if self.weights.len() != self.n_features {
            anyhow::bail!(
                "Model declares {} features but stores {} weights",
                self.n_features,
                self.weights.len()
            );
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            anyhow::bail!("Model contains non-finite parameters");
        }
        Ok(())
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

struct Problem<'a> {
    rows: &'a [SparseVector],
    targets: &'a [bool],
    n_features: usize,
    c: f64,
}

impl Problem<'_> {
    fn dim(&self) -> usize {
        self.n_features + 1
    }

    /// Loss and gradient at `theta` (weights followed by the intercept).
    fn evaluate(&self, theta: &[f64]) -> (f64, Vec<f64>) {
        let (weights, intercept) = theta.split_at(self.n_features);
        let b = intercept[0];

        let mut loss = 0.5 * weights.iter().map(|w| w * w).sum::<f64>();
        let mut grad = Vec::with_capacity(self.dim());
        grad.extend_from_slice(weights);
        grad.push(0.0);

        for (row, &target) in self.rows.iter().zip(self.targets) {
            let z = row.dot(weights) + b;
            let y = if target { 1.0 } else { 0.0 };
            loss += self.c * (softplus(z) - y * z);

            let residual = self.c * (sigmoid(z) - y);
            for (i, v) in row.iter() {
                grad[i] += residual * v;
            }
            grad[self.n_features] += residual;
        }

        (loss, grad)
    }
}

struct Outcome {
    theta: Vec<f64>,
    loss: f64,
    iterations: usize,
    converged: bool,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// Limited-memory BFGS with an Armijo backtracking line search.
fn lbfgs(problem: &Problem<'_>, params: TrainParams) -> Outcome {
    const ARMIJO: f64 = 1e-4;
    const MIN_STEP: f64 = 1e-20;

    let mut theta = vec![0.0; problem.dim()];
    let (mut loss, mut grad) = problem.evaluate(&theta);

    // (s, y, 1 / y·s) curvature pairs, oldest first
    let mut memory: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(params.history);

    let mut iterations = 0;
    let mut converged = max_abs(&grad) <= params.tol;

    while !converged && iterations < params.max_iter {
        // Two-loop recursion: direction = -H·grad
        let mut q = grad.clone();
        let mut alphas = Vec::with_capacity(memory.len());
        for (s, y, rho) in memory.iter().rev() {
            let alpha = rho * dot(s, &q);
            for (qi, yi) in q.iter_mut().zip(y) {
                *qi -= alpha * yi;
            }
            alphas.push(alpha);
        }
        let gamma = match memory.back() {
            Some((s, y, _)) => dot(s, y) / dot(y, y),
            None => 1.0,
        };
        for qi in &mut q {
            *qi *= gamma;
        }
        for ((s, y, rho), alpha) in memory.iter().zip(alphas.iter().rev()) {
            let beta = rho * dot(y, &q);
            for (qi, si) in q.iter_mut().zip(s) {
                *qi += (alpha - beta) * si;
            }
        }
        let mut direction: Vec<f64> = q.iter().map(|v| -v).collect();

        let mut slope = dot(&grad, &direction);
        if !(slope < 0.0) {
            // Not a descent direction; restart from steepest descent.
            memory.clear();
            direction = grad.iter().map(|g| -g).collect();
            slope = -dot(&grad, &grad);
        }

        let mut step = 1.0;
        let accepted = loop {
            let candidate: Vec<f64> = theta
                .iter()
                .zip(&direction)
                .map(|(t, d)| t + step * d)
                .collect();
            let (candidate_loss, candidate_grad) = problem.evaluate(&candidate);
            if candidate_loss <= loss + ARMIJO * step * slope {
                break Some((candidate, candidate_loss, candidate_grad));
            }
            step *= 0.5;
            if step < MIN_STEP {
                break None;
            }
        };

        let Some((next, next_loss, next_grad)) = accepted else {
            debug!(iterations, "Line search failed to make progress");
            break;
        };

        let s: Vec<f64> = next.iter().zip(&theta).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = next_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > 1e-10 {
            if memory.len() == params.history {
                memory.pop_front();
            }
            memory.push_back((s, y, 1.0 / sy));
        }

        theta = next;
        loss = next_loss;
        grad = next_grad;
        iterations += 1;
        converged = max_abs(&grad) <= params.tol;
    }

    Outcome {
        theta,
        loss,
        iterations,
        converged,
    }
}
