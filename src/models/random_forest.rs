//! Случайный лес на деревьях решений linfa-tree

#![allow(non_snake_case)]

use linfa::prelude::*;
use linfa_tree::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// None - деревья растут до чистых листьев. Глубина ограничена
    /// по умолчанию: артефакт читается serde_json с лимитом вложенности.
    pub max_depth: Option<usize>,
    /// Минимальный суммарный вес узла для разделения
    pub min_weight_split: f32,
    /// Размер случайного подпространства признаков на дерево;
    /// None - все признаки (обычный бэггинг)
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(32),
            min_weight_split: 2.0,
            max_features: None,
            seed: 42,
        }
    }
}

/// Дерево и индексы признаков, на которых оно обучено
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForestTree {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

/// Бэггинг деревьев: каждое дерево обучено на бутстрэп-выборке.
/// Подмножество признаков выбирается один раз на дерево, а не в каждом
/// узле; по умолчанию дерево видит все признаки. Вероятность
/// мошенничества - доля деревьев, проголосовавших за класс 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<ForestTree>,
}

impl RandomForest {
    pub fn fit(
        X: &Array2<f64>,
        y: &[usize],
        sample_weights: &[f64],
        params: &ForestParams,
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
        if params.n_trees == 0 {
            return Err(PipelineError::Training("n_trees must be positive".to_string()));
        }

        let max_features = params
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features);

        // Веса нормируются так, чтобы минимальный вес был 1:
        // min_weight_split остается в единицах "строк" мажоритарного класса
        let min_weight = sample_weights
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .max(f64::EPSILON);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);

        for tree_idx in 0..params.n_trees {
            let rows: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let mut features =
                rand::seq::index::sample(&mut rng, n_features, max_features).into_vec();
            features.sort_unstable();

            let records = X.select(Axis(0), &rows).select(Axis(1), &features);
            let targets: Array1<usize> = rows.iter().map(|&i| y[i]).collect();
            let weights: Array1<f32> = rows
                .iter()
                .map(|&i| (sample_weights[i] / min_weight) as f32)
                .collect();

            let dataset = Dataset::new(records, targets).with_weights(weights);
            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(params.max_depth)
                .min_weight_split(params.min_weight_split)
                .fit(&dataset)
                .map_err(|e| PipelineError::Training(format!("tree {}: {}", tree_idx, e)))?;

            trees.push(ForestTree { features, tree });
        }

        tracing::debug!(
            n_trees = trees.len(),
            max_features,
            "Random forest fitted"
        );

        Ok(Self { n_features, trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if X.ncols() != self.n_features {
            return Err(PipelineError::FeatureMismatch {
                expected: self.n_features,
                found: X.ncols(),
            });
        }

        let mut votes = Array1::<f64>::zeros(X.nrows());
        for forest_tree in &self.trees {
            let subset = X.select(Axis(1), &forest_tree.features);
            let predicted: Array1<usize> = forest_tree.tree.predict(&subset);
            for (vote, &label) in votes.iter_mut().zip(predicted.iter()) {
                if label == 1 {
                    *vote += 1.0;
                }
            }
        }

        Ok(votes / self.trees.len().max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Два облака точек: класс 1 вокруг (3, 3), класс 0 вокруг (-3, -3)
    fn blobs(n_per_class: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut X = Array2::zeros((2 * n_per_class, 3));
        let mut y = Vec::with_capacity(2 * n_per_class);
        for i in 0..2 * n_per_class {
            let label = usize::from(i >= n_per_class);
            let center = if label == 1 { 3.0 } else { -3.0 };
            X[[i, 0]] = center + rng.gen_range(-1.0..1.0);
            X[[i, 1]] = center + rng.gen_range(-1.0..1.0);
            X[[i, 2]] = rng.gen_range(-1.0..1.0);
            y.push(label);
        }
        (X, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            max_features: Some(2),
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_forest_learns_separable_blobs() {
        let (X, y) = blobs(40, 1);
        let forest = RandomForest::fit(&X, &y, &vec![1.0; y.len()], &small_params()).unwrap();
        assert_eq!(forest.n_trees(), 15);

        let predicted = Classifier::predict(&forest, &X).unwrap();
        let correct = predicted.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / y.len() as f64 > 0.9);
    }

    /// Класс задается одним признаком из десяти, остальные - шум
    fn single_signal(n: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let X = Array2::from_shape_fn((n, 10), |_| rng.gen_range(-1.0..1.0));
        let y = X.column(0).iter().map(|&v| usize::from(v > 0.0)).collect();
        (X, y)
    }

    fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
        let correct = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
        correct as f64 / truth.len() as f64
    }

    #[test]
    fn test_default_forest_keeps_up_with_single_tree() {
        let (X, y) = single_signal(300, 6);
        let (X_test, y_test) = single_signal(200, 7);

        let dataset = Dataset::new(X.clone(), Array1::from(y.clone()));
        let tree = DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .fit(&dataset)
            .unwrap();
        let tree_predicted: Array1<usize> = tree.predict(&X_test);
        let tree_accuracy = accuracy(tree_predicted.as_slice().unwrap(), &y_test);

        let params = ForestParams {
            n_trees: 15,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&X, &y, &vec![1.0; y.len()], &params).unwrap();
        let forest_predicted = Classifier::predict(&forest, &X_test).unwrap();
        let forest_accuracy = accuracy(&forest_predicted, &y_test);

        assert!(tree_accuracy > 0.95, "tree {}", tree_accuracy);
        assert!(
            forest_accuracy >= tree_accuracy - 0.02,
            "forest {} vs tree {}",
            forest_accuracy,
            tree_accuracy
        );
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let (X, y) = blobs(20, 2);
        let w = vec![1.0; y.len()];
        let a = RandomForest::fit(&X, &y, &w, &small_params()).unwrap();
        let b = RandomForest::fit(&X, &y, &w, &small_params()).unwrap();
        assert_eq!(a.predict_proba(&X).unwrap(), b.predict_proba(&X).unwrap());
    }

    #[test]
    fn test_forest_probabilities_are_vote_fractions() {
        let (X, y) = blobs(10, 3);
        let forest = RandomForest::fit(&X, &y, &vec![1.0; y.len()], &small_params()).unwrap();
        let proba = forest.predict_proba(&X).unwrap();
        for p in proba.iter() {
            assert!((0.0..=1.0).contains(p));
            let votes = p * 15.0;
            assert!((votes - votes.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_forest_survives_serde() {
        let (X, y) = blobs(10, 4);
        let forest = RandomForest::fit(&X, &y, &vec![1.0; y.len()], &small_params()).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.predict_proba(&X).unwrap(), forest.predict_proba(&X).unwrap());
    }

    #[test]
    fn test_forest_rejects_wrong_width() {
        let (X, y) = blobs(5, 5);
        let forest = RandomForest::fit(&X, &y, &vec![1.0; y.len()], &small_params()).unwrap();
        let narrow = Array2::zeros((2, 2));
        assert!(forest.predict_proba(&narrow).is_err());
    }
}
