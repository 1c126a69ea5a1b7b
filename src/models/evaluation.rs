//! Метрики качества бинарной классификации

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Метрика, по которой выбирается лучшая модель
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMetric {
    Accuracy,
    Precision,
    Recall,
    #[default]
    F1,
}

impl SelectionMetric {
    pub fn value(&self, metrics: &BinaryMetrics) -> f64 {
        match self {
            SelectionMetric::Accuracy => metrics.accuracy,
            SelectionMetric::Precision => metrics.precision,
            SelectionMetric::Recall => metrics.recall,
            SelectionMetric::F1 => metrics.f1,
        }
    }
}

impl fmt::Display for SelectionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionMetric::Accuracy => "accuracy",
            SelectionMetric::Precision => "precision",
            SelectionMetric::Recall => "recall",
            SelectionMetric::F1 => "f1",
        };
        f.write_str(name)
    }
}

/// Метрики для положительного класса (1 = мошенничество)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BinaryMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Counts {
    fn tally(y_true: &[usize], y_pred: &[usize], positive: usize) -> Self {
        let mut counts = Counts::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == positive, p == positive) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }
}

/// Деление с нулем в знаменателе дает 0
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn harmonic(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn check_lengths(y_true: &[usize], y_pred: &[usize]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::Training(format!(
            "label length mismatch: {} vs {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    Ok(())
}

impl BinaryMetrics {
    pub fn compute(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let c = Counts::tally(y_true, y_pred, 1);
        let precision = ratio(c.tp, c.tp + c.fp);
        let recall = ratio(c.tp, c.tp + c.fn_);

        Ok(Self {
            accuracy: ratio(c.tp + c.tn, y_true.len()),
            precision,
            recall,
            f1: harmonic(precision, recall),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Текстовый отчет по классам 0 и 1 со средними значениями
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<(usize, ClassScores)>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn new(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let classes: Vec<(usize, ClassScores)> = [0usize, 1]
            .iter()
            .map(|&class| {
                let c = Counts::tally(y_true, y_pred, class);
                let precision = ratio(c.tp, c.tp + c.fp);
                let recall = ratio(c.tp, c.tp + c.fn_);
                let scores = ClassScores {
                    precision,
                    recall,
                    f1: harmonic(precision, recall),
                    support: c.tp + c.fn_,
                };
                (class, scores)
            })
            .collect();

        let total = y_true.len();
        let n = classes.len() as f64;
        let macro_avg = ClassScores {
            precision: classes.iter().map(|(_, s)| s.precision).sum::<f64>() / n,
            recall: classes.iter().map(|(_, s)| s.recall).sum::<f64>() / n,
            f1: classes.iter().map(|(_, s)| s.f1).sum::<f64>() / n,
            support: total,
        };
        let weighted_avg = ClassScores {
            precision: weighted_mean(&classes, total, |s| s.precision),
            recall: weighted_mean(&classes, total, |s| s.recall),
            f1: weighted_mean(&classes, total, |s| s.f1),
            support: total,
        };

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        Ok(Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        })
    }
}

fn weighted_mean(
    classes: &[(usize, ClassScores)],
    total: usize,
    score: impl Fn(&ClassScores) -> f64,
) -> f64 {
    classes
        .iter()
        .map(|(_, s)| score(s) * s.support as f64)
        .sum::<f64>()
        / total as f64
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (class, s) in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                class, s.precision, s.recall, s.f1, s.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, s) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, s.precision, s.recall, s.f1, s.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y_TRUE: [usize; 10] = [0, 0, 0, 0, 0, 0, 1, 1, 1, 1];
    const Y_PRED: [usize; 10] = [0, 0, 0, 0, 1, 1, 1, 1, 1, 0];

    #[test]
    fn test_binary_metrics() {
        let m = BinaryMetrics::compute(&Y_TRUE, &Y_PRED).unwrap();
        assert!((m.accuracy - 0.7).abs() < 1e-12);
        assert!((m.precision - 0.6).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        assert!((m.f1 - 2.0 * 0.6 * 0.75 / 1.35).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions_gives_zero_precision() {
        let m = BinaryMetrics::compute(&[0, 1, 1], &[0, 0, 0]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_metric_errors() {
        assert!(BinaryMetrics::compute(&[0, 1], &[0]).is_err());
        assert!(BinaryMetrics::compute(&[], &[]).is_err());
    }

    #[test]
    fn test_report_supports_and_averages() {
        let report = ClassificationReport::new(&Y_TRUE, &Y_PRED).unwrap();
        assert_eq!(report.classes[0].1.support, 6);
        assert_eq!(report.classes[1].1.support, 4);
        assert!((report.accuracy - 0.7).abs() < 1e-12);

        let class0_recall = 4.0 / 6.0;
        let expected_macro = (class0_recall + 0.75) / 2.0;
        assert!((report.macro_avg.recall - expected_macro).abs() < 1e-12);
        // Взвешенный recall совпадает с accuracy
        assert!((report.weighted_avg.recall - 0.7).abs() < 1e-12);

        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("0.70"));
    }

    #[test]
    fn test_selection_metric_value() {
        let m = BinaryMetrics {
            accuracy: 0.9,
            precision: 0.5,
            recall: 0.8,
            f1: 0.6,
        };
        assert_eq!(SelectionMetric::default(), SelectionMetric::F1);
        assert_eq!(SelectionMetric::Recall.value(&m), 0.8);
        assert_eq!(SelectionMetric::Accuracy.to_string(), "accuracy");
    }
}
