/// CLI: подготовка данных, обучение и сервер анализа

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fraud_detect::{pipeline, server, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "fraud-detect", version, about = "Credit card fraud detection pipeline")]
struct Cli {
    /// Путь к TOML-конфигурации (по умолчанию fraud_detect.toml, если есть)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Масштабирует Amount/Time и сохраняет очищенный датасет
    Prepare {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Обучает обе модели и сохраняет лучшую
    Train {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Запускает веб-панель анализа
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fraud_detect=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Prepare { input, output } => {
            if let Some(input) = input {
                config.data.raw_path = input;
            }
            if let Some(output) = output {
                config.data.cleaned_path = output;
            }
            let outcome = pipeline::prepare(&config.data).with_context(|| {
                format!("Preparation failed for {}", config.data.raw_path.display())
            })?;
            tracing::info!(rows = outcome.rows, columns = outcome.columns, "Preparation finished");
        }
        Command::Train { data, model } => {
            if let Some(data) = data {
                config.data.cleaned_path = data;
            }
            if let Some(model) = model {
                config.training.model_path = model;
            }
            let outcome = pipeline::train(&config.data, &config.training).with_context(|| {
                format!("Training failed for {}", config.data.cleaned_path.display())
            })?;
            tracing::info!(selected = %outcome.selected, "Training finished");
        }
        Command::Serve { host, port, model } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(model) = model {
                config.training.model_path = model;
            }
            server::serve(&config).await.context("Server failed")?;
        }
    }

    Ok(())
}
