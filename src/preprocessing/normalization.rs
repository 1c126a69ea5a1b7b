//! Нормализация данных (стандартизация: нулевое среднее, единичное отклонение)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};

use crate::error::{PipelineError, Result};

pub struct DataNormalizer {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
    is_fitted: bool,
}

impl DataNormalizer {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::EmptyDataset);
        }

        // Среднее и стандартное отклонение (ddof = 0) по каждому признаку
        self.mean = Some(X.mean_axis(Axis(0)).ok_or(PipelineError::EmptyDataset)?);
        self.std = Some(X.std_axis(Axis(0), 0.0));

        // Постоянный столбец делится на 1
        if let Some(ref mut std) = self.std {
            for val in std.iter_mut() {
                if *val < 1e-10 {
                    *val = 1.0;
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) if self.is_fitted => (mean, std),
            _ => return Err(PipelineError::Training("Normalizer not fitted".to_string())),
        };

        if X.ncols() != mean.len() {
            return Err(PipelineError::FeatureMismatch {
                expected: mean.len(),
                found: X.ncols(),
            });
        }

        // (X - mean) / std
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    /// Стандартизация одного столбца, независимо от остальных
    pub fn scale_column(values: &[f64]) -> Result<Vec<f64>> {
        let X = Array2::from_shape_vec((values.len(), 1), values.to_vec())
            .map_err(|e| PipelineError::Training(e.to_string()))?;
        let scaled = Self::new().fit_transform(&X)?;
        Ok(scaled.column(0).to_vec())
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn std(&self) -> Option<&Array1<f64>> {
        self.std.as_ref()
    }
}

impl Default for DataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
