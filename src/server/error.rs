//! Ошибки HTTP-обработчиков

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::pages;
use crate::error::PipelineError;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid upload: {0}")]
    BadUpload(String),

    #[error("Upload exceeds the size limit: {0}")]
    UploadTooLarge(String),

    #[error("Export not found")]
    ExportNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::UploadTooLarge(err.body_text())
        } else {
            AppError::BadUpload(err.body_text())
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadUpload(_) => StatusCode::BAD_REQUEST,
            AppError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExportNotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Pipeline(err) => match err {
                PipelineError::Csv(_) => StatusCode::BAD_REQUEST,
                PipelineError::MissingColumn(_)
                | PipelineError::NonNumericColumn { .. }
                | PipelineError::MissingValue { .. }
                | PipelineError::InvalidLabel { .. }
                | PipelineError::ColumnLength { .. }
                | PipelineError::EmptyDataset
                | PipelineError::NoFeatures
                | PipelineError::FeatureMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Сообщение для клиента; подробности только для ошибок во входных данных
    fn message(&self) -> (&'static str, Option<String>) {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            return ("Internal server error", None);
        }
        tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        let title = match status {
            StatusCode::BAD_REQUEST => "The uploaded file could not be read as CSV.",
            StatusCode::NOT_FOUND => "The requested export does not exist or has expired.",
            StatusCode::PAYLOAD_TOO_LARGE => "The uploaded file is larger than the server accepts.",
            _ => "The uploaded data could not be analyzed.",
        };
        (title, Some(self.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (title, detail) = self.message();
        (status, Html(pages::error_page(title, detail.as_deref()))).into_response()
    }
}

/// Та же ошибка для JSON API
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(AppError::Pipeline(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let (title, detail) = self.0.message();
        let body = Json(json!({
            "error": title,
            "detail": detail,
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}
