//! Стратифицированное разделение train/test

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// Индексы строк обучающей и тестовой выборок
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Разделение с сохранением долей классов в обеих выборках.
///
/// Для каждого класса в тест уходит `round(n_class * test_size)` строк,
/// но не меньше одной и не больше `n_class - 1`.
/// Порядок детерминирован при одинаковом `seed`.
pub fn stratified_split(labels: &[usize], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if labels.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::Split(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_classes = labels.iter().copied().max().unwrap_or(0) + 1;
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label].push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for (class, mut indices) in by_class.into_iter().enumerate() {
        if indices.is_empty() {
            continue;
        }
        if indices.len() < 2 {
            return Err(PipelineError::Split(format!(
                "class {} has only {} member, need at least 2",
                class,
                indices.len()
            )));
        }

        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64 * test_size).round() as usize).clamp(1, indices.len() - 1);
        let rest = indices.split_off(n_test);
        test.extend(indices);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        "Stratified split: {} train, {} test (seed {})",
        train.len(),
        test.len(),
        seed
    );

    Ok(SplitIndices { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fraud_ratio(labels: &[usize], indices: &[usize]) -> f64 {
        let fraud = indices.iter().filter(|&&i| labels[i] == 1).count();
        fraud as f64 / indices.len() as f64
    }

    fn imbalanced(n: usize, fraud_every: usize) -> Vec<usize> {
        (0..n).map(|i| usize::from(i % fraud_every == 0)).collect()
    }

    #[test]
    fn test_split_covers_every_row_once() {
        let labels = imbalanced(1000, 50);
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(split.train.len() + split.test.len(), labels.len());

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_preserves_class_ratio() {
        let labels = imbalanced(5000, 100);
        let split = stratified_split(&labels, 0.2, 42).unwrap();
        let full = fraud_ratio(&labels, &(0..labels.len()).collect::<Vec<_>>());

        assert!((fraud_ratio(&labels, &split.train) - full).abs() < 0.002);
        assert!((fraud_ratio(&labels, &split.test) - full).abs() < 0.002);
        assert_eq!(split.test.len(), 1000);
    }

    #[test]
    fn test_split_is_reproducible() {
        let labels = imbalanced(300, 7);
        let a = stratified_split(&labels, 0.2, 42).unwrap();
        let b = stratified_split(&labels, 0.2, 42).unwrap();
        let c = stratified_split(&labels, 0.2, 7).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_rejects_degenerate_input() {
        assert!(matches!(
            stratified_split(&[], 0.2, 42),
            Err(PipelineError::EmptyDataset)
        ));
        assert!(stratified_split(&[0, 0, 0, 1], 0.2, 42).is_err());
        assert!(stratified_split(&[0, 1, 0, 1], 1.5, 42).is_err());
    }
}
