//! Обучение: стратифицированное разделение, две модели, выбор лучшей

#![allow(non_snake_case)]

use std::path::PathBuf;

use ndarray::Axis;

use crate::config::{DataConfig, TrainingConfig};
use crate::error::Result;
use crate::models::{
    balanced_weights, BinaryMetrics, Classifier, ClassificationReport, FraudModel,
    LogisticRegression, ModelArtifact, ModelKind, RandomForest, SelectionMetric,
};
use crate::preprocessing::{stratified_split, FeatureEngineer};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub train_rows: usize,
    pub test_rows: usize,
    pub logistic: BinaryMetrics,
    pub forest: BinaryMetrics,
    pub selected: ModelKind,
    pub model_path: PathBuf,
}

/// Сравнение по выбранной метрике; при равенстве побеждает случайный лес
pub fn select_model(
    metric: SelectionMetric,
    logistic: &BinaryMetrics,
    forest: &BinaryMetrics,
) -> ModelKind {
    if metric.value(forest) >= metric.value(logistic) {
        ModelKind::RandomForest
    } else {
        ModelKind::LogisticRegression
    }
}

pub fn train(data: &DataConfig, training: &TrainingConfig) -> Result<TrainOutcome> {
    let table = Table::read_csv(&data.cleaned_path)?;
    tracing::info!(path = %data.cleaned_path.display(), rows = table.n_rows(), "Cleaned dataset loaded");
    println!("Dataset loaded successfully!");
    println!("Shape: {:?}", table.shape());

    let (features, labels) = FeatureEngineer::extract_training_features(&table, &data.label_column)?;
    let split = stratified_split(&labels, training.test_size, training.seed)?;

    let X_train = features.values.select(Axis(0), &split.train);
    let X_test = features.values.select(Axis(0), &split.test);
    let y_train: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

    println!(
        "Training set: ({}, {}) Test set: ({}, {})",
        X_train.nrows(),
        X_train.ncols(),
        X_test.nrows(),
        X_test.ncols()
    );

    let weights = balanced_weights(&y_train);

    let logistic = LogisticRegression::fit(&X_train, &y_train, &weights, &training.logistic)?;
    let logistic_metrics = evaluate(ModelKind::LogisticRegression, &logistic, &X_test, &y_test)?;

    let forest = RandomForest::fit(&X_train, &y_train, &weights, &training.forest)?;
    let forest_metrics = evaluate(ModelKind::RandomForest, &forest, &X_test, &y_test)?;

    let selected = select_model(training.selection_metric, &logistic_metrics, &forest_metrics);
    let (model, metrics) = match selected {
        ModelKind::LogisticRegression => (FraudModel::LogisticRegression(logistic), logistic_metrics),
        ModelKind::RandomForest => (FraudModel::RandomForest(forest), forest_metrics),
    };
    tracing::info!(
        selected = %selected,
        metric = %training.selection_metric,
        logistic = training.selection_metric.value(&logistic_metrics),
        forest = training.selection_metric.value(&forest_metrics),
        "Model selected"
    );

    let artifact = ModelArtifact::new(features.names, model).with_metrics(metrics);
    artifact.save(&training.model_path)?;
    println!(
        "\nBest model ({}) saved as {}",
        selected,
        training.model_path.display()
    );

    Ok(TrainOutcome {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        logistic: logistic_metrics,
        forest: forest_metrics,
        selected,
        model_path: training.model_path.clone(),
    })
}

/// Метрики на отложенной выборке и печать отчета
fn evaluate<C: Classifier>(
    kind: ModelKind,
    model: &C,
    X_test: &ndarray::Array2<f64>,
    y_test: &[usize],
) -> Result<BinaryMetrics> {
    let y_pred = model.predict(X_test)?;
    let metrics = BinaryMetrics::compute(y_test, &y_pred)?;
    let report = ClassificationReport::new(y_test, &y_pred)?;

    println!("\n--- {} Performance ---", kind);
    println!("Accuracy: {}", metrics.accuracy);
    println!("Precision: {}", metrics.precision);
    println!("Recall: {}", metrics.recall);
    println!("F1-score: {}", metrics.f1);
    println!("\nClassification Report:\n{}", report);

    tracing::debug!(model = %kind, ?metrics, "Model evaluated");
    Ok(metrics)
}
