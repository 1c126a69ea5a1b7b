use fraud_detect::config::AppConfig;
use fraud_detect::{analyze, pipeline, ForestParams, ModelArtifact, Table, PREDICTION_COLUMN};

/// Сырые транзакции в формате creditcard.csv: мошенничество при V1 > 0
fn raw_csv(n: usize) -> (String, usize) {
    let mut csv = String::from("Time,V1,V2,Amount,Class\n");
    let mut frauds = 0;
    for i in 0..n {
        let fraud = i % 6 == 0;
        frauds += usize::from(fraud);
        let spread = (i % 5) as f64 * 0.2;
        let v1 = if fraud { 2.5 + spread } else { -1.5 - spread };
        let v2 = ((i * 17) % 13) as f64 / 13.0 - 0.5;
        let amount = ((i * 29) % 97) as f64 + 0.99;
        csv.push_str(&format!("{},{},{},{},{}\n", i * 3, v1, v2, amount, u8::from(fraud)));
    }
    (csv, frauds)
}

fn config(dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.data.raw_path = dir.join("creditcard.csv");
    config.data.cleaned_path = dir.join("cleaned_creditcard.csv");
    config.data.charts_dir = dir.join("charts");
    config.training.model_path = dir.join("fraud_detection_model.pkl");
    config.training.forest = ForestParams {
        n_trees: 12,
        max_features: Some(4),
        ..ForestParams::default()
    };
    config
}

#[test]
fn test_prepare_train_and_score() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (raw, frauds) = raw_csv(120);
    std::fs::write(&config.data.raw_path, &raw).unwrap();

    let prepared = pipeline::prepare(&config.data).unwrap();
    assert_eq!(prepared.rows, 120);
    assert_eq!(prepared.columns, 5);
    assert!(config.data.charts_dir.join("class_balance.svg").exists());
    assert!(config.data.charts_dir.join("amount_scaled_distribution.svg").exists());

    let cleaned = Table::read_csv(&config.data.cleaned_path).unwrap();
    assert_eq!(
        cleaned.headers(),
        &["V1", "V2", "Class", "Amount_Scaled", "Time_Scaled"]
    );

    let trained = pipeline::train(&config.data, &config.training).unwrap();
    assert_eq!(trained.train_rows + trained.test_rows, 120);
    assert!(config.training.model_path.exists());

    // Сервер получает тот же очищенный файл: Class отбрасывается как разметка
    let artifact = ModelArtifact::load(&config.training.model_path).unwrap();
    assert_eq!(artifact.kind(), trained.selected);

    let analysis = analyze(&artifact, cleaned).unwrap();
    assert_eq!(analysis.predictions.len(), 120);
    assert_eq!(analysis.summary.fraud + analysis.summary.legit, 120);
    assert_eq!(analysis.summary.fraud, frauds);
    assert_eq!(analysis.dropped_labels, vec!["Class".to_string()]);
    assert_eq!(
        analysis.annotated.headers().last().map(String::as_str),
        Some(PREDICTION_COLUMN)
    );

    let export = String::from_utf8(analysis.flagged_csv().unwrap().unwrap()).unwrap();
    assert_eq!(export.lines().count(), frauds + 1);
}

#[test]
fn test_prepare_fails_without_amount() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    std::fs::write(&config.data.raw_path, "Time,V1,Class\n0,1.0,0\n1,2.0,1\n").unwrap();

    assert!(pipeline::prepare(&config.data).is_err());
    assert!(!config.data.cleaned_path.exists());
}
