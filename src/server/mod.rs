/// HTTP-панель анализа транзакций

pub mod error;
pub mod exports;
pub mod pages;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

pub use error::{ApiError, AppError, AppResult};
pub use exports::ExportStore;

use crate::config::{AppConfig, ServerConfig};
use crate::error::Result;
use crate::models::ModelArtifact;
use crate::scoring::{self, Analysis, EXPORT_FILE_NAME};
use crate::table::Table;

/// Состояние роутера: модель загружается один раз и только читается
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelArtifact>,
    pub exports: Arc<ExportStore>,
    pub settings: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(model: ModelArtifact, settings: ServerConfig) -> Self {
        Self {
            model: Arc::new(model),
            exports: Arc::new(ExportStore::new(settings.export_capacity)),
            settings: Arc::new(settings),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub total: usize,
    pub fraud: usize,
    pub legit: usize,
    pub excluded_columns: Vec<String>,
    pub predictions: Vec<usize>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let body_limit = state.settings.body_limit();

    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze))
        .route("/exports/:id", get(download_export))
        .route("/api/predict", post(predict))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Загружает модель и слушает адрес из конфигурации
pub async fn serve(config: &AppConfig) -> Result<()> {
    let model = ModelArtifact::load(&config.training.model_path)?;
    let state = AppState::new(model, config.server.clone());
    let app = router(state);

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(pages::upload_page())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn is_blank(data: &[u8]) -> bool {
    data.iter().all(u8::is_ascii_whitespace)
}

/// Первое поле `file` из формы; None, если файла нет
async fn read_upload(multipart: &mut Multipart) -> AppResult<Option<Bytes>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await?;
        tracing::info!(file = %file_name, bytes = data.len(), "Upload received");
        return Ok(Some(data));
    }
    Ok(None)
}

/// Синхронная работа (разбор CSV, инференс, графики) в пуле блокирующих задач
async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?
        .map_err(AppError::from)
}

fn score_upload(model: &ModelArtifact, data: &[u8]) -> Result<Analysis> {
    let table = Table::from_reader(data)?;
    scoring::analyze(model, table)
}

async fn analyze(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<Html<String>> {
    let data = match read_upload(&mut multipart).await? {
        Some(data) if !is_blank(&data) => data,
        _ => return Ok(Html(pages::upload_page())),
    };

    let model = Arc::clone(&state.model);
    let (analysis, flagged) = run_blocking(move || {
        let analysis = score_upload(&model, &data)?;
        let flagged = analysis.flagged_csv()?;
        Ok((analysis, flagged))
    })
    .await?;

    let export_id = match flagged {
        Some(csv) => Some(state.exports.insert(csv).await),
        None => None,
    };

    let settings = Arc::clone(&state.settings);
    let page = run_blocking(move || pages::results_page(&analysis, &settings, export_id)).await?;
    Ok(Html(page))
}

async fn download_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::ExportNotFound)?;
    let data = state.exports.get(&id).await.ok_or(AppError::ExportNotFound)?;

    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

async fn predict(
    State(state): State<AppState>,
    body: String,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    if body.trim().is_empty() {
        return Err(AppError::BadUpload("empty request body".to_string()).into());
    }

    let model = Arc::clone(&state.model);
    let analysis = run_blocking(move || score_upload(&model, body.as_bytes())).await?;
    tracing::info!(rows = analysis.summary.total, "Predict request");

    Ok(Json(PredictResponse {
        total: analysis.summary.total,
        fraud: analysis.summary.fraud,
        legit: analysis.summary.legit,
        excluded_columns: analysis.excluded_columns,
        predictions: analysis.predictions,
    }))
}
