//! Пакетный скоринг загруженной таблицы транзакций

use serde::Serialize;

use crate::error::Result;
use crate::models::{ModelArtifact, FRAUD};
use crate::preprocessing::FeatureEngineer;
use crate::table::Table;

/// Столбец с предсказанием, добавляемый к загруженной таблице
pub const PREDICTION_COLUMN: &str = "Fraud_Prediction";

/// Имя файла выгрузки мошеннических транзакций
pub const EXPORT_FILE_NAME: &str = "fraud_transactions.csv";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub fraud: usize,
    pub legit: usize,
}

impl Summary {
    pub fn from_predictions(predictions: &[usize]) -> Self {
        let fraud = predictions.iter().filter(|&&p| p == FRAUD).count();
        Self {
            total: predictions.len(),
            fraud,
            legit: predictions.len() - fraud,
        }
    }

    pub fn fraud_share(&self) -> f64 {
        percent(self.fraud, self.total)
    }

    pub fn legit_share(&self) -> f64 {
        percent(self.legit, self.total)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Результат анализа одной загрузки
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Таблица в том виде, в каком ее загрузили
    pub uploaded: Table,
    /// Та же таблица со столбцом Fraud_Prediction
    pub annotated: Table,
    pub predictions: Vec<usize>,
    pub summary: Summary,
    pub excluded_columns: Vec<String>,
    pub dropped_labels: Vec<String>,
}

impl Analysis {
    pub fn fraud_indices(&self) -> Vec<usize> {
        self.predictions
            .iter()
            .enumerate()
            .filter(|(_, &p)| p == FRAUD)
            .map(|(i, _)| i)
            .collect()
    }

    /// Только строки, помеченные как мошеннические (со столбцом предсказания)
    pub fn flagged(&self) -> Table {
        self.annotated.select_rows(&self.fraud_indices())
    }

    /// CSV для выгрузки; None, если мошенничество не найдено
    pub fn flagged_csv(&self) -> Result<Option<Vec<u8>>> {
        if self.summary.fraud == 0 {
            return Ok(None);
        }
        self.flagged().to_csv_bytes().map(Some)
    }
}

/// Прогоняет модель по всем строкам и размечает таблицу.
/// Ошибка в любой строке отменяет весь анализ.
pub fn analyze(artifact: &ModelArtifact, uploaded: Table) -> Result<Analysis> {
    let features = FeatureEngineer::extract_inference_features(&uploaded)?;
    let predictions = artifact.predict(&features.matrix)?;

    let mut annotated = uploaded.clone();
    annotated.set_column(
        PREDICTION_COLUMN,
        predictions.iter().map(|p| p.to_string()).collect(),
    )?;

    let summary = Summary::from_predictions(&predictions);
    tracing::info!(
        total = summary.total,
        fraud = summary.fraud,
        legit = summary.legit,
        "Batch scored"
    );

    Ok(Analysis {
        uploaded,
        annotated,
        predictions,
        summary,
        excluded_columns: features.excluded,
        dropped_labels: features.dropped_labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FraudModel, LogisticRegression};
    use crate::PipelineError;

    /// Модель с фиксированными параметрами: мошенничество, если V1 > 0
    fn artifact() -> ModelArtifact {
        let model = LogisticRegression::from_parameters(vec![10.0, 0.0], 0.0);
        ModelArtifact::new(
            vec!["V1".to_string(), "Amount_Scaled".to_string()],
            FraudModel::LogisticRegression(model),
        )
    }

    fn upload(fraud_rows: &[usize], n: usize) -> Table {
        let mut csv = String::from("V1,Amount_Scaled,Merchant,Class\n");
        for i in 0..n {
            let v1 = if fraud_rows.contains(&i) { 2.5 } else { -1.5 };
            csv.push_str(&format!("{},{}.5,shop{},0\n", v1, i, i));
        }
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_three_of_hundred_flagged() {
        let analysis = analyze(&artifact(), upload(&[4, 50, 99], 100)).unwrap();

        assert_eq!(analysis.predictions.len(), 100);
        assert_eq!(
            analysis.summary,
            Summary {
                total: 100,
                fraud: 3,
                legit: 97
            }
        );
        assert_eq!(format!("{:.1}", analysis.summary.fraud_share()), "3.0");
        assert_eq!(format!("{:.1}", analysis.summary.legit_share()), "97.0");
        assert_eq!(analysis.fraud_indices(), vec![4, 50, 99]);

        let csv = String::from_utf8(analysis.flagged_csv().unwrap().unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "V1,Amount_Scaled,Merchant,Class,Fraud_Prediction");
        assert!(lines[1..].iter().all(|l| l.ends_with(",1")));
    }

    #[test]
    fn test_prediction_column_appended() {
        let analysis = analyze(&artifact(), upload(&[1], 3)).unwrap();
        let headers = analysis.annotated.headers();
        assert_eq!(headers.last().map(String::as_str), Some(PREDICTION_COLUMN));
        assert_eq!(analysis.uploaded.n_cols() + 1, analysis.annotated.n_cols());
        assert_eq!(analysis.annotated.n_rows(), 3);
    }

    #[test]
    fn test_no_fraud_means_no_export() {
        let analysis = analyze(&artifact(), upload(&[], 10)).unwrap();
        assert_eq!(analysis.summary.fraud, 0);
        assert_eq!(analysis.summary.legit, 10);
        assert!(analysis.flagged_csv().unwrap().is_none());
        assert!(analysis.flagged().is_empty());
    }

    #[test]
    fn test_text_and_label_columns_are_not_features() {
        let analysis = analyze(&artifact(), upload(&[0], 5)).unwrap();
        assert_eq!(analysis.excluded_columns, vec!["Merchant".to_string()]);
        assert_eq!(analysis.dropped_labels, vec!["Class".to_string()]);
        // Нечисловой столбец остается в отображаемой таблице
        assert!(analysis.annotated.column_index("Merchant").is_some());
    }

    #[test]
    fn test_feature_count_mismatch_fails_whole_batch() {
        let table = Table::from_reader("V1,V2,V3\n1,2,3\n".as_bytes()).unwrap();
        assert!(matches!(
            analyze(&artifact(), table),
            Err(PipelineError::FeatureMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_summary_shares() {
        let summary = Summary::from_predictions(&[1, 0, 0, 0]);
        assert_eq!(summary.fraud_share(), 25.0);
        assert_eq!(summary.legit_share(), 75.0);
        assert_eq!(Summary::from_predictions(&[]).fraud_share(), 0.0);
    }
}
