// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    services::case_validation::error_codes,
};

// Erros de infraestrutura. As regras do quadro não passam por aqui:
// elas viram `Outcome`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Período inválido: {0}")]
    InvalidPeriod(String),

    #[error("Armazenamento indisponível: {0}")]
    StoreUnavailable(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "error.validation"),
            AppError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, "error.not_found"),
            AppError::InvalidPeriod(_) => (StatusCode::BAD_REQUEST, "error.invalid_period"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "error.store_unavailable"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error.database"),
            AppError::InternalServerError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error.internal"),
        }
    }

    /// Traduz o erro para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let (status, key) = self.status_and_key();

        let details = match self {
            AppError::ValidationError(errors) => Some(json!(error_codes(errors))),
            AppError::ResourceNotFound(id) | AppError::InvalidPeriod(id) => Some(json!(id)),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        ApiError {
            status,
            error: i18n.translate(&locale.0, key),
            details,
        }
    }
}

// --- Resposta de erro ---

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    #[schema(example = "Período inválido. Use o formato AAAA-MM.")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.error,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_store_failure_to_service_unavailable() {
        let i18n = I18nStore::new("pt");
        let err = AppError::StoreUnavailable("offline".into())
            .to_api_error(&Locale("en".into()), &i18n);

        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error, i18n.translate("en", "error.store_unavailable"));
        assert!(err.details.is_none());
    }

    #[test]
    fn invalid_period_carries_the_rejected_value() {
        let i18n = I18nStore::new("pt");
        let err = AppError::InvalidPeriod("janeiro".into()).to_api_error(&Locale("pt".into()), &i18n);

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details, Some(json!("janeiro")));
    }
}
