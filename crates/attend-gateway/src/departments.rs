// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Department and membership routes.

use attend_core::{Department, Membership, Role};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::context::Caller;
use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct CreateDepartment {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateDepartment {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberBody {
    pub role: Role,
}

/// GET /v1/departments
pub async fn list_departments(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
) -> Result<Json<Vec<Department>>, ApiError> {
    Ok(Json(state.engine.departments().list(&ctx.tenant_id).await?))
}

/// POST /v1/departments
pub async fn create_department(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Json(body): Json<CreateDepartment>,
) -> Result<(StatusCode, Json<Department>), ApiError> {
    let department = state
        .engine
        .departments()
        .create(&ctx, &body.name, body.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(department)))
}

/// PUT /v1/departments/{id}
pub async fn update_department(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    Json(body): Json<UpdateDepartment>,
) -> Result<Json<Department>, ApiError> {
    let department = state
        .engine
        .departments()
        .update(&ctx, &id, body.name.as_deref(), body.description.as_deref())
        .await?;
    Ok(Json(department))
}

/// DELETE /v1/departments/{id}
pub async fn delete_department(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.departments().delete(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/departments/{id}/members
pub async fn list_members(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<Membership>>, ApiError> {
    Ok(Json(
        state
            .engine
            .departments()
            .list_members(&ctx.tenant_id, &id)
            .await?,
    ))
}

/// PUT /v1/departments/{id}/members/{user_id}
pub async fn put_member(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path((id, user_id)): Path<(String, String)>,
    Json(body): Json<MemberBody>,
) -> Result<Json<Membership>, ApiError> {
    let membership = state
        .engine
        .departments()
        .add_member(&ctx, &id, &user_id, body.role)
        .await?;
    Ok(Json(membership))
}

/// DELETE /v1/departments/{id}/members/{user_id}
pub async fn delete_member(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .departments()
        .remove_member(&ctx, &id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
