//! Подготовка данных: загрузка, отчет о пропусках, масштабирование Amount/Time

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::charts::{self, Category, ChartSettings, FRAUD_COLOR, LEGIT_COLOR};
use crate::config::DataConfig;
use crate::error::Result;
use crate::preprocessing::DataNormalizer;
use crate::table::{parse_number, Table};

/// Пары (исходный столбец, масштабированный), в порядке добавления
pub const SCALED_COLUMNS: [(&str, &str); 2] =
    [("Amount", "Amount_Scaled"), ("Time", "Time_Scaled")];

pub const CLASS_BALANCE_CHART: &str = "class_balance.svg";
pub const AMOUNT_HISTOGRAM_CHART: &str = "amount_scaled_distribution.svg";

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOutcome {
    pub rows: usize,
    pub columns: usize,
    pub missing: Vec<(String, usize)>,
    pub charts: Vec<PathBuf>,
    pub cleaned_path: PathBuf,
}

pub fn prepare(data: &DataConfig) -> Result<PrepareOutcome> {
    let table = load_dataset(&data.raw_path)?;
    table.require_column(&data.label_column)?;

    let missing = report_missing(&table);
    let cleaned = standardize(&table)?;
    let charts = plot(&cleaned, &data.label_column, &data.charts_dir, data.histogram_bins)?;
    save(&cleaned, &data.cleaned_path)?;

    Ok(PrepareOutcome {
        rows: cleaned.n_rows(),
        columns: cleaned.n_cols(),
        missing,
        charts,
        cleaned_path: data.cleaned_path.clone(),
    })
}

pub fn load_dataset(path: &Path) -> Result<Table> {
    let table = Table::read_csv(path)?;
    tracing::info!(path = %path.display(), rows = table.n_rows(), "Dataset loaded");

    println!("Dataset loaded successfully!");
    println!("{}", table.head(5).render_text(5));
    println!("Dataset shape: {:?}", table.shape());
    Ok(table)
}

/// Только отчет: пропуски не заполняются
pub fn report_missing(table: &Table) -> Vec<(String, usize)> {
    let missing = table.missing_counts();
    let width = missing.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    println!("\nMissing values per column:");
    for (name, count) in &missing {
        println!("{:<width$} {}", name, count, width = width);
    }

    let total: usize = missing.iter().map(|(_, c)| c).sum();
    if total > 0 {
        tracing::warn!(total, "Dataset contains missing values");
    }
    missing
}

/// Заменяет Amount и Time независимо стандартизованными столбцами
/// Amount_Scaled и Time_Scaled в конце таблицы
pub fn standardize(table: &Table) -> Result<Table> {
    let mut scaled = Vec::with_capacity(SCALED_COLUMNS.len());
    for (source, target) in SCALED_COLUMNS {
        let values = table.numeric_column(source)?;
        let column = DataNormalizer::scale_column(&values)?;
        scaled.push((target, column));
    }

    let sources: Vec<&str> = SCALED_COLUMNS.iter().map(|(source, _)| *source).collect();
    let mut cleaned = table.drop_columns(&sources);
    for (target, column) in scaled {
        cleaned.set_column(target, column.iter().map(|v| v.to_string()).collect())?;
    }

    tracing::debug!(columns = ?cleaned.headers(), "Columns standardized");
    Ok(cleaned)
}

/// Графики для просмотра человеком; на сохраняемую таблицу не влияют
pub fn plot(table: &Table, label_column: &str, dir: &Path, bins: usize) -> Result<Vec<PathBuf>> {
    let label_idx = table.require_column(label_column)?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in table.records() {
        *counts
            .entry(record.get(label_idx).unwrap_or("").trim().to_string())
            .or_insert(0) += 1;
    }

    let categories: Vec<Category> = counts
        .iter()
        .map(|(label, &count)| {
            let color = if parse_number(label).map_or(false, |v| v == 1.0) {
                FRAUD_COLOR
            } else {
                LEGIT_COLOR
            };
            Category::new(label, count as f64, color)
        })
        .collect();

    let balance = charts::bar_chart(
        &categories,
        &ChartSettings::new("Fraud (1) vs Non-Fraud (0) Transactions", 640, 420)
            .labels(label_column, "count"),
    )?;
    let balance_path = dir.join(CLASS_BALANCE_CHART);
    charts::write_svg(&balance_path, &balance)?;

    let amounts = table.numeric_column("Amount_Scaled")?;
    let histogram = charts::histogram(
        &amounts,
        bins,
        &ChartSettings::new("Distribution of Transaction Amounts (Scaled)", 640, 420)
            .labels("Amount_Scaled", "count"),
    )?;
    let histogram_path = dir.join(AMOUNT_HISTOGRAM_CHART);
    charts::write_svg(&histogram_path, &histogram)?;

    tracing::info!(dir = %dir.display(), "Charts written");
    Ok(vec![balance_path, histogram_path])
}

pub fn save(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    table.write_csv(path)?;
    tracing::info!(path = %path.display(), "Cleaned dataset saved");
    println!("\nCleaned dataset saved as {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;

    fn raw() -> Table {
        let csv = "Time,V1,V2,Amount,Class\n\
                   0,1.0,-0.5,10.0,0\n\
                   10,0.5,0.25,20.0,0\n\
                   20,-1.0,1.5,30.0,1\n\
                   30,2.0,0.0,40.0,0\n";
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn mean_and_std(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_standardize_replaces_columns() {
        let cleaned = standardize(&raw()).unwrap();
        assert_eq!(
            cleaned.headers(),
            &["V1", "V2", "Class", "Amount_Scaled", "Time_Scaled"]
        );
        assert_eq!(cleaned.n_rows(), 4);
        assert_eq!(cleaned.n_cols(), raw().n_cols());

        for name in ["Amount_Scaled", "Time_Scaled"] {
            let (mean, std) = mean_and_std(&cleaned.numeric_column(name).unwrap());
            assert!(mean.abs() < 1e-9, "{} mean {}", name, mean);
            assert!((std - 1.0).abs() < 1e-9, "{} std {}", name, std);
        }

        // Остальные столбцы не меняются
        assert_eq!(cleaned.records()[2].get(0), Some("-1.0"));
        assert_eq!(cleaned.records()[2].get(2), Some("1"));
    }

    #[test]
    fn test_standardize_requires_amount_and_time() {
        let table = raw().drop_columns(&["Time"]);
        assert!(matches!(
            standardize(&table),
            Err(PipelineError::MissingColumn(name)) if name == "Time"
        ));
    }

    #[test]
    fn test_standardize_rejects_text_amount() {
        let csv = "Time,Amount,Class\n0,abc,0\n1,2.0,1\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            standardize(&table),
            Err(PipelineError::NonNumericColumn { .. })
        ));
    }

    #[test]
    fn test_prepare_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("creditcard.csv");
        raw().write_csv(&raw_path).unwrap();

        let data = DataConfig {
            raw_path,
            cleaned_path: dir.path().join("out").join("cleaned.csv"),
            charts_dir: dir.path().join("charts"),
            ..DataConfig::default()
        };
        let outcome = prepare(&data).unwrap();

        assert_eq!(outcome.rows, 4);
        assert_eq!(outcome.columns, 5);
        assert!(outcome.missing.iter().all(|(_, c)| *c == 0));
        assert_eq!(outcome.charts.len(), 2);
        for chart in &outcome.charts {
            let svg = std::fs::read_to_string(chart).unwrap();
            assert!(svg.contains("<svg"));
        }

        let cleaned = Table::read_csv(&data.cleaned_path).unwrap();
        assert_eq!(cleaned.shape(), (4, 5));
        assert!(cleaned.column_index("Amount").is_none());
        assert!(cleaned.column_index("Time_Scaled").is_some());
    }

    #[test]
    fn test_prepare_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataConfig {
            raw_path: dir.path().join("absent.csv"),
            ..DataConfig::default()
        };
        assert!(matches!(prepare(&data), Err(PipelineError::Io(_))));
    }
}
