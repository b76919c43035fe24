//! Typed errors and HTTP mapping.

use crate::tenant::TenantId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("config: {0}")]
    Validation(String),
}

/// Failures of tenant resolution and pool management. None of these are ever
/// recovered by substituting another tenant's pool.
///
/// Cloneable so that every caller waiting on one pool construction receives
/// its outcome.
#[derive(Error, Debug, Clone)]
pub enum TenantError {
    #[error("tenant registry unavailable: {0}")]
    RegistryUnavailable(#[source] Arc<sqlx::Error>),
    #[error("unknown tenant: {0}")]
    UnknownTenant(TenantId),
    #[error("no tenant resolved for this unit of work")]
    NoTenantResolved,
    #[error("failed to build connection pool for tenant {tenant_id}: {source}")]
    PoolConstructionFailed {
        tenant_id: TenantId,
        #[source]
        source: Arc<sqlx::Error>,
    },
    #[error("tenant context used outside of a unit of work")]
    OutsideUnitOfWork,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tenant(#[from] TenantError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TenantError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            TenantError::RegistryUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "registry_unavailable"),
            TenantError::UnknownTenant(_) => (StatusCode::FORBIDDEN, "unknown_tenant"),
            TenantError::NoTenantResolved => (StatusCode::UNAUTHORIZED, "no_tenant_resolved"),
            TenantError::PoolConstructionFailed { .. } => (StatusCode::SERVICE_UNAVAILABLE, "pool_construction_failed"),
            TenantError::OutsideUnitOfWork => (StatusCode::INTERNAL_SERVER_ERROR, "outside_unit_of_work"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Tenant(e) => e.status_and_code(),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
