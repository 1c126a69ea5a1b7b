//! Извлечение признаков из таблицы транзакций

use ndarray::{Array2, ArrayView1};

use crate::error::{PipelineError, Result};
use crate::table::{is_missing, parse_number, Table};

/// Столбцы с разметкой, которые никогда не попадают в признаки при инференсе
pub const LABEL_COLUMNS: [&str; 2] = ["isFraud", "Class"];

/// Матрица признаков с именами столбцов в порядке следования
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }
}

/// Признаки для инференса и то, что было отброшено по пути
#[derive(Debug, Clone)]
pub struct InferenceFeatures {
    pub matrix: FeatureMatrix,
    /// Столбцы разметки, найденные в загруженной таблице
    pub dropped_labels: Vec<String>,
    /// Нечисловые столбцы, исключенные из признаков
    pub excluded: Vec<String>,
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Признаки для обучения: все столбцы, кроме метки; каждый обязан быть числовым
    pub fn extract_training_features(
        table: &Table,
        label_column: &str,
    ) -> Result<(FeatureMatrix, Vec<usize>)> {
        if table.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let label_idx = table.require_column(label_column)?;
        let labels = Self::parse_labels(table, label_idx)?;

        let columns: Vec<usize> = (0..table.n_cols()).filter(|&i| i != label_idx).collect();
        if columns.is_empty() {
            return Err(PipelineError::NoFeatures);
        }

        let matrix = Self::build_matrix(table, &columns)?;
        Ok((matrix, labels))
    }

    /// Признаки для инференса: без столбцов разметки и только числовые столбцы
    pub fn extract_inference_features(table: &Table) -> Result<InferenceFeatures> {
        if table.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let mut dropped_labels = Vec::new();
        let mut excluded = Vec::new();
        let mut columns = Vec::new();

        for (idx, name) in table.headers().iter().enumerate() {
            if LABEL_COLUMNS.contains(&name.as_str()) {
                dropped_labels.push(name.clone());
            } else if table.is_numeric(idx) {
                columns.push(idx);
            } else {
                excluded.push(name.clone());
            }
        }

        if !excluded.is_empty() {
            tracing::warn!(columns = ?excluded, "Non-numeric columns excluded from features");
        }

        if columns.is_empty() {
            return Err(PipelineError::NoFeatures);
        }

        let matrix = Self::build_matrix(table, &columns)?;
        Ok(InferenceFeatures {
            matrix,
            dropped_labels,
            excluded,
        })
    }

    fn build_matrix(table: &Table, columns: &[usize]) -> Result<FeatureMatrix> {
        let n_samples = table.n_rows();
        let n_features = columns.len();
        let mut values = Array2::zeros((n_samples, n_features));

        for (j, &idx) in columns.iter().enumerate() {
            let column = table.numeric_values(idx)?;
            for (i, v) in column.into_iter().enumerate() {
                values[[i, j]] = v;
            }
        }

        let names = columns.iter().map(|&i| table.headers()[i].clone()).collect();
        Ok(FeatureMatrix { names, values })
    }

    /// Метки классов: допускаются только 0 и 1 (в том числе "0.0", "1.0")
    fn parse_labels(table: &Table, idx: usize) -> Result<Vec<usize>> {
        table
            .records()
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let value = record.get(idx).unwrap_or("");
                let invalid = || PipelineError::InvalidLabel {
                    row,
                    value: value.to_string(),
                };
                if is_missing(value) {
                    return Err(invalid());
                }
                match parse_number(value) {
                    Some(v) if v == 0.0 => Ok(0),
                    Some(v) if v == 1.0 => Ok(1),
                    _ => Err(invalid()),
                }
            })
            .collect()
    }
}
