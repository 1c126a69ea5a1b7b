//! Логистическая регрессия (базовая модель)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogisticParams {
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Обратная сила L2-регуляризации
    pub c: f64,
    /// Остановка, когда максимальная компонента градиента меньше порога
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            learning_rate: 0.1,
            c: 1.0,
            tolerance: 1e-6,
        }
    }
}

/// Взвешенная логистическая регрессия, обучаемая полным градиентным спуском
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn from_parameters(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Минимизирует sum(w_i * logloss_i) / sum(w) + ||beta||^2 / (2 * C * sum(w))
    pub fn fit(
        X: &Array2<f64>,
        y: &[usize],
        sample_weights: &[f64],
        params: &LogisticParams,
    ) -> Result<Self> {
        let n_samples = X.nrows();
        let n_features = X.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::EmptyDataset);
        }
        if y.len() != n_samples || sample_weights.len() != n_samples {
            return Err(PipelineError::Training(format!(
                "{} samples, {} labels, {} weights",
                n_samples,
                y.len(),
                sample_weights.len()
            )));
        }
        if params.c <= 0.0 {
            return Err(PipelineError::Training("C must be positive".to_string()));
        }

        let targets: Array1<f64> = y.iter().map(|&l| l as f64).collect();
        let w = Array1::from(sample_weights.to_vec());
        let total_weight = w.sum();
        let lambda = 1.0 / (params.c * total_weight);

        let mut beta = Array1::<f64>::zeros(n_features);
        let mut intercept = 0.0;
        let mut iterations = 0;

        for iter in 0..params.max_iter {
            iterations = iter + 1;

            let z = X.dot(&beta) + intercept;
            let p = z.mapv(sigmoid);
            let residual = (&p - &targets) * &w;

            let grad_beta = X.t().dot(&residual) / total_weight + &beta * lambda;
            let grad_intercept = residual.sum() / total_weight;

            beta = beta - &grad_beta * params.learning_rate;
            intercept -= grad_intercept * params.learning_rate;

            let max_grad = grad_beta
                .iter()
                .fold(grad_intercept.abs(), |acc, g| acc.max(g.abs()));
            if max_grad < params.tolerance {
                break;
            }
        }

        tracing::debug!(iterations, "Logistic regression fitted");

        Ok(Self {
            weights: beta.to_vec(),
            intercept,
        })
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if X.ncols() != self.weights.len() {
            return Err(PipelineError::FeatureMismatch {
                expected: self.weights.len(),
                found: X.ncols(),
            });
        }
        let beta = Array1::from(self.weights.clone());
        Ok((X.dot(&beta) + self.intercept).mapv(sigmoid))
    }
}
