//! Конфигурация пайплайна: TOML-файл и переменные окружения FRAUD__*

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{ForestParams, LogisticParams, SelectionMetric};

/// Файл конфигурации по умолчанию (необязательный)
pub const DEFAULT_CONFIG_FILE: &str = "fraud_detect.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub server: ServerConfig,
}

/// Пути к данным и параметры подготовки
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub raw_path: PathBuf,
    pub cleaned_path: PathBuf,
    pub label_column: String,
    /// Каталог для SVG-графиков подготовки
    pub charts_dir: PathBuf,
    pub histogram_bins: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("creditcard.csv"),
            cleaned_path: PathBuf::from("cleaned_creditcard.csv"),
            label_column: "Class".to_string(),
            charts_dir: PathBuf::from("charts"),
            histogram_bins: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_path: PathBuf,
    pub test_size: f64,
    pub seed: u64,
    pub selection_metric: SelectionMetric,
    pub logistic: LogisticParams,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("fraud_detection_model.pkl"),
            test_size: 0.2,
            seed: 42,
            selection_metric: SelectionMetric::F1,
            logistic: LogisticParams::default(),
            forest: ForestParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Ограничение размера загружаемого файла
    pub max_upload_mb: usize,
    pub preview_rows: usize,
    pub highlight_rows: usize,
    /// Сколько выгрузок хранится в памяти одновременно
    pub export_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_mb: 200,
            preview_rows: 20,
            highlight_rows: 200,
            export_capacity: 32,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn body_limit(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

impl AppConfig {
    /// Явно указанный файл обязателен; файл по умолчанию может отсутствовать.
    /// Переменные окружения (FRAUD__SERVER__PORT=9000) перекрывают файл.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("FRAUD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        tracing::debug!(?app_config, "Configuration loaded");
        Ok(app_config)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }
}
