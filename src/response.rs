//! Standard response envelope helpers.
//!
//! Lists read from a tenant database name that tenant in `meta`, so a client
//! can see which tenant answered.

use crate::tenant::TenantId;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

#[derive(Serialize)]
pub struct Meta {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantId>,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    many(data, None)
}

/// A list read from `tenant`'s database.
pub fn success_many_for<T: Serialize>(tenant: &TenantId, data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    many(data, Some(tenant.clone()))
}

fn many<T: Serialize>(data: Vec<T>, tenant: Option<TenantId>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: Meta { count, tenant },
        }),
    )
}
