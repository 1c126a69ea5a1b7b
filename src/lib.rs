//! Fraud Detect - обнаружение мошеннических транзакций по картам

pub mod charts;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod scoring;
pub mod server;
pub mod table;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use models::*;
pub use preprocessing::*;
pub use scoring::{analyze, Analysis, Summary, PREDICTION_COLUMN};
pub use table::Table;
