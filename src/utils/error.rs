use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::models::{ImportParseError, ImportReport, MissingField};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Entrada inválida, duplicada ou mal formada (400)
    #[error("{0}")]
    Validation(String),
    /// Índice único rejeitou a escrita (400)
    #[error("{message}")]
    Conflict {
        field: String,
        message: String,
        detail: String,
        inserted: usize,
    },
    #[error("{0}")]
    NotFound(String),
    /// Importação recusada; o relatório é o corpo da resposta (400)
    #[error("{}", .0.message)]
    ImportRejected(Box<ImportReport>),
    #[error("{0}")]
    DatabaseError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// Traduz um erro do store; `on_conflict` monta a mensagem a partir do campo.
    pub fn from_store(err: StoreError, on_conflict: impl FnOnce(&str) -> String) -> Self {
        match err {
            StoreError::ConstraintViolation { field, message, inserted } => AppError::Conflict {
                message: on_conflict(&field),
                field,
                detail: message,
                inserted,
            },
            StoreError::InvalidPattern(_) => AppError::Validation("Invalid search pattern".to_string()),
            StoreError::Backend(message) => AppError::DatabaseError(message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::from_store(err, |field| format!("This {} is already in use", field))
    }
}

impl From<MissingField> for AppError {
    fn from(err: MissingField) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ImportParseError> for AppError {
    fn from(err: ImportParseError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict { .. } | AppError::ImportRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        match self {
            AppError::Conflict { field, message, detail, inserted } => builder.json(serde_json::json!({
                "message": message,
                "field": field,
                "error": detail,
                "insertedCount": inserted,
            })),
            AppError::ImportRejected(report) => builder.json(report),
            other => builder.json(serde_json::json!({ "message": other.to_string() })),
        }
    }
}
