//! Модели классификации транзакций

#![allow(non_snake_case)]

pub mod evaluation;
pub mod logistic;
pub mod random_forest;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub use evaluation::{BinaryMetrics, ClassificationReport, SelectionMetric};
pub use logistic::{LogisticParams, LogisticRegression};
pub use random_forest::{ForestParams, RandomForest};

use crate::error::{PipelineError, Result};
use crate::preprocessing::FeatureMatrix;

/// Метка мошеннической транзакции
pub const FRAUD: usize = 1;

pub trait Classifier {
    fn n_features(&self) -> usize;

    /// Вероятность класса 1 для каждой строки
    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>>;

    /// Класс 1, если вероятность строго больше 0.5
    fn predict(&self, X: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(X)?;
        Ok(proba.iter().map(|&p| usize::from(p > 0.5)).collect())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::LogisticRegression => f.write_str("Logistic Regression"),
            ModelKind::RandomForest => f.write_str("Random Forest"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FraudModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

impl FraudModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FraudModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            FraudModel::RandomForest(_) => ModelKind::RandomForest,
        }
    }
}

impl Classifier for FraudModel {
    fn n_features(&self) -> usize {
        match self {
            FraudModel::LogisticRegression(m) => m.n_features(),
            FraudModel::RandomForest(m) => m.n_features(),
        }
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FraudModel::LogisticRegression(m) => m.predict_proba(X),
            FraudModel::RandomForest(m) => m.predict_proba(X),
        }
    }
}

/// Веса "balanced": n_samples / (n_classes * n_samples_in_class)
pub fn balanced_weights(labels: &[usize]) -> Vec<f64> {
    let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut counts = vec![0usize; n_classes];
    for &label in labels {
        counts[label] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count() as f64;
    let n = labels.len() as f64;

    labels
        .iter()
        .map(|&label| n / (present * counts[label] as f64))
        .collect()
}

/// Сохраняемая модель вместе с именами признаков, на которых она обучена
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub model: FraudModel,
    #[serde(default)]
    pub metrics: Option<BinaryMetrics>,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(feature_names: Vec<String>, model: FraudModel) -> Self {
        Self {
            feature_names,
            model,
            metrics: None,
            trained_at: Utc::now(),
        }
    }

    pub fn with_metrics(mut self, metrics: BinaryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        tracing::info!(path = %path.display(), kind = %self.kind(), "Model artifact saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        tracing::info!(
            path = %path.display(),
            kind = %artifact.kind(),
            features = artifact.feature_names.len(),
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Предсказания для матрицы признаков. Проверяется только число признаков:
    /// расхождение имен лишь логируется.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<usize>> {
        let expected = self.model.n_features();
        if features.n_features() != expected {
            return Err(PipelineError::FeatureMismatch {
                expected,
                found: features.n_features(),
            });
        }
        if features.names != self.feature_names {
            tracing::warn!(
                expected = ?self.feature_names,
                found = ?features.names,
                "Feature names differ from training features"
            );
        }
        self.model.predict(&features.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn artifact() -> ModelArtifact {
        let model = LogisticRegression::from_parameters(vec![2.0, -1.0], 0.5);
        ModelArtifact::new(
            vec!["V1".to_string(), "V2".to_string()],
            FraudModel::LogisticRegression(model),
        )
    }

    #[test]
    fn test_balanced_weights() {
        let weights = balanced_weights(&[0, 0, 0, 1]);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[3] - 2.0).abs() < 1e-12);
        // Сумма весов равна числу строк
        assert!((weights.iter().sum::<f64>() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_artifact_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let original = artifact().with_metrics(BinaryMetrics {
            accuracy: 0.99,
            precision: 0.8,
            recall: 0.7,
            f1: 0.75,
        });
        original.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.kind(), ModelKind::LogisticRegression);
        assert_eq!(loaded.feature_names, original.feature_names);
        assert_eq!(loaded.metrics, original.metrics);

        let X = array![[1.0, 0.0], [-1.0, 3.0]];
        assert_eq!(
            loaded.model.predict_proba(&X).unwrap(),
            original.model.predict_proba(&X).unwrap()
        );
    }

    #[test]
    fn test_predict_checks_feature_count_only() {
        let model = artifact();
        let renamed = FeatureMatrix {
            names: vec!["a".to_string(), "b".to_string()],
            values: array![[1.0, 0.0], [-3.0, 0.0]],
        };
        assert_eq!(model.predict(&renamed).unwrap(), vec![1, 0]);

        let narrow = FeatureMatrix {
            names: vec!["V1".to_string()],
            values: array![[1.0]],
        };
        assert!(matches!(
            model.predict(&narrow),
            Err(PipelineError::FeatureMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_missing_artifact_is_io_error() {
        assert!(matches!(
            ModelArtifact::load("does/not/exist.json"),
            Err(PipelineError::Io(_))
        ));
    }
}
