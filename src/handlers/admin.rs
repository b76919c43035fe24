//! Tenant registry administration.
//!
//! Registry writes go to the master table; the cached pool of the affected
//! tenant is invalidated so the next unit of work picks up the new descriptor.

use crate::error::AppError;
use crate::response::{success_many, success_one, success_one_ok};
use crate::state::AppState;
use crate::store::{delete_tenant, upsert_tenant};
use crate::tenant::{PgPoolConnector, TenantDescriptor, TenantId, TenantSummary};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct TenantRegistration {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct InvalidateResponse {
    pub tenant_id: TenantId,
    pub invalidated: bool,
}

fn summary(state: &AppState, descriptor: TenantDescriptor) -> TenantSummary {
    let pool = state.cache().get(&descriptor.tenant_id);
    TenantSummary {
        pool_cached: pool.is_some(),
        pool_created_at: pool.map(|p| p.created_at()),
        tenant_id: descriptor.tenant_id,
        connection_url: descriptor.connection_url,
        username: descriptor.username,
    }
}

fn tenant_path(raw: &str) -> Result<TenantId, AppError> {
    TenantId::parse(raw).ok_or_else(|| AppError::BadRequest("tenant id must not be blank".into()))
}

pub async fn list_tenants(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let descriptors = state.router.registry().list_all().await?;
    let tenants: Vec<TenantSummary> = descriptors.into_iter().map(|d| summary(&state, d)).collect();
    Ok(success_many(tenants))
}

pub async fn put_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<TenantRegistration>,
) -> Result<impl IntoResponse, AppError> {
    let tenant_id = tenant_path(&tenant_id)?;
    let descriptor = TenantDescriptor::new(tenant_id.clone(), body.url, body.username, body.password);
    PgPoolConnector::connect_options(&descriptor)
        .map_err(|e| AppError::BadRequest(format!("invalid connection url: {}", e)))?;

    let replaced = upsert_tenant(&state.master_pool, &state.registry_table, &descriptor).await?;
    state.cache().invalidate(&tenant_id);
    tracing::info!(tenant = %tenant_id, replaced, "tenant registered");

    let body = summary(&state, descriptor);
    Ok(if replaced { success_one_ok(body) } else { success_one(body) })
}

pub async fn remove_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let tenant_id = tenant_path(&tenant_id)?;
    if !delete_tenant(&state.master_pool, &state.registry_table, &tenant_id).await? {
        return Err(AppError::NotFound(format!("tenant {}", tenant_id)));
    }
    state.cache().invalidate(&tenant_id);
    tracing::info!(tenant = %tenant_id, "tenant deregistered");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invalidate_pool(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tenant_id = tenant_path(&tenant_id)?;
    let invalidated = state.cache().invalidate(&tenant_id);
    Ok(success_one_ok(InvalidateResponse { tenant_id, invalidated }))
}
