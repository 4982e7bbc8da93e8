// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for attendances, the queue, leads and sync.
//!
//! Every mutation responds with the full resulting attendance.

use attend_core::{
    AttendError, Attendance, AttendanceDetails, AttendanceFilter, AttendanceStats,
    AttendanceStatus, CloseRequest, HealthStatus, Lead, PluginAdapter, Priority, SyncReport,
    TransferRequest,
};
use attend_storage::database::now_timestamp;
use attend_storage::queries::leads;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::context::{Caller, IdempotencyKey};
use crate::error::ApiError;
use crate::server::GatewayState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `degraded` or `unhealthy`.
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: u64,
    /// Storage health detail.
    pub storage: String,
    pub ws_connections: usize,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (status, storage) = match state.health.storage.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", "healthy".to_string()),
        Ok(HealthStatus::Degraded(detail)) => ("degraded", detail),
        Ok(HealthStatus::Unhealthy(detail)) => ("unhealthy", detail),
        Err(e) => ("unhealthy", e.to_string()),
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        storage,
        ws_connections: state.ws_clients.len(),
    };
    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body)).into_response()
}

/// Query string for GET /v1/attendances.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<AttendanceStatus>,
    pub priority: Option<Priority>,
    pub department_id: Option<String>,
    pub assigned_user_id: Option<String>,
    pub urgent: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl ListParams {
    fn filter(&self) -> AttendanceFilter {
        AttendanceFilter {
            status: self.status,
            priority: self.priority,
            department_id: self.department_id.clone(),
            assigned_user_id: self.assigned_user_id.clone(),
            urgent: self.urgent,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

/// GET /v1/attendances
pub async fn list_attendances(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Attendance>> {
    let rows = state
        .engine
        .list(&ctx, &params.filter(), params.limit)
        .await?;
    Ok(Json(rows))
}

/// GET /v1/attendances/stats
pub async fn get_stats(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
) -> ApiResult<AttendanceStats> {
    Ok(Json(state.engine.get_stats(&ctx).await?))
}

/// GET /v1/attendances/{id}
pub async fn get_attendance(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<AttendanceDetails> {
    Ok(Json(state.engine.get_details(&ctx, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub limit: Option<usize>,
}

/// Response body for GET /v1/queue.
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    /// Claimable attendances in the queue, before `limit`.
    pub total: usize,
    pub items: Vec<Attendance>,
}

/// GET /v1/queue
pub async fn get_queue(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Query(params): Query<QueueParams>,
) -> ApiResult<QueueResponse> {
    let max = state.engine.settings().max_page_size;
    let limit = params.limit.unwrap_or(max).min(max);
    let queue = state.engine.get_queue(&ctx).await?;
    Ok(Json(QueueResponse {
        total: queue.len(),
        items: queue.top(limit),
    }))
}

/// Optional notes on claim and reopen.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotesBody {
    pub notes: Option<String>,
}

/// POST /v1/leads/{lead_id}/claim
pub async fn claim(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    key: IdempotencyKey,
    Path(lead_id): Path<String>,
    body: Option<Json<NotesBody>>,
) -> ApiResult<Attendance> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let attendance = state
        .engine
        .claim(&ctx, &lead_id, body.notes.as_deref(), key.as_deref())
        .await?;
    Ok(Json(attendance))
}

/// POST /v1/attendances/{id}/transfer
pub async fn transfer(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    key: IdempotencyKey,
    Path(id): Path<String>,
    Json(request): Json<TransferRequest>,
) -> ApiResult<Attendance> {
    let attendance = state
        .engine
        .transfer(&ctx, &id, &request, key.as_deref())
        .await?;
    Ok(Json(attendance))
}

/// POST /v1/attendances/{id}/accept
pub async fn accept(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    key: IdempotencyKey,
    Path(id): Path<String>,
) -> ApiResult<Attendance> {
    Ok(Json(state.engine.accept(&ctx, &id, key.as_deref()).await?))
}

/// POST /v1/attendances/{id}/close
pub async fn close(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    key: IdempotencyKey,
    Path(id): Path<String>,
    body: Option<Json<CloseRequest>>,
) -> ApiResult<Attendance> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let attendance = state
        .engine
        .close(&ctx, &id, &request, key.as_deref())
        .await?;
    Ok(Json(attendance))
}

/// POST /v1/attendances/{id}/reopen
pub async fn reopen(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    body: Option<Json<NotesBody>>,
) -> ApiResult<Attendance> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(
        state
            .engine
            .reopen(&ctx, &id, body.notes.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct PriorityBody {
    pub priority: Priority,
}

/// PUT /v1/attendances/{id}/priority
pub async fn update_priority(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    key: IdempotencyKey,
    Path(id): Path<String>,
    Json(body): Json<PriorityBody>,
) -> ApiResult<Attendance> {
    let attendance = state
        .engine
        .update_priority(&ctx, &id, body.priority, key.as_deref())
        .await?;
    Ok(Json(attendance))
}

/// POST /v1/sync
///
/// Reconciles the caller's tenant. Tenant admins only.
pub async fn sync(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
) -> ApiResult<SyncReport> {
    if !ctx.is_admin() {
        return Err(AttendError::Forbidden("only tenant admins can run sync".into()).into());
    }
    Ok(Json(state.engine.sync(&ctx.tenant_id).await?))
}

/// Request body for PUT /v1/leads/{lead_id}.
#[derive(Debug, Deserialize)]
pub struct LeadUpsert {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Response body for PUT /v1/leads/{lead_id}.
#[derive(Debug, Serialize)]
pub struct LeadSynced {
    pub lead: Lead,
    /// The lead's open attendance; absent for terminal leads.
    pub attendance: Option<Attendance>,
}

/// PUT /v1/leads/{lead_id}
///
/// Ingestion hook: mirror the lead, then make sure it has an open attendance.
pub async fn put_lead(
    State(state): State<GatewayState>,
    Caller(ctx): Caller,
    Path(lead_id): Path<String>,
    Json(body): Json<LeadUpsert>,
) -> ApiResult<LeadSynced> {
    if body.status.trim().is_empty() {
        return Err(AttendError::InvalidArgument("lead status must not be empty".into()).into());
    }
    let now = now_timestamp();
    let lead = leads::upsert_lead(
        state.engine.database(),
        &Lead {
            id: lead_id,
            tenant_id: ctx.tenant_id.clone(),
            name: body.name,
            phone: body.phone,
            status: body.status,
            tags: body.tags,
            created_at: now.clone(),
            updated_at: now,
        },
    )
    .await?;
    let attendance = state.engine.sync_lead(&ctx.tenant_id, &lead.id).await?;
    Ok(Json(LeadSynced { lead, attendance }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_drop_blank_search() {
        let params = ListParams {
            search: Some("   ".into()),
            urgent: Some(true),
            ..ListParams::default()
        };
        let filter = params.filter();
        assert!(filter.search.is_none());
        assert_eq!(filter.urgent, Some(true));
    }

    #[test]
    fn list_params_parse_from_query_string() {
        let params: ListParams =
            parse_query("status=IN_PROGRESS&priority=HIGH&urgent=true&limit=5");
        assert_eq!(params.status, Some(AttendanceStatus::InProgress));
        assert_eq!(params.priority, Some(Priority::High));
        assert_eq!(params.limit, Some(5));
    }

    fn parse_query(query: &str) -> ListParams {
        let uri: axum::http::Uri = format!("/v1/attendances?{query}").parse().unwrap();
        Query::<ListParams>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn lead_upsert_defaults_tags() {
        let body: LeadUpsert =
            serde_json::from_str(r#"{"name":"Ana","status":"new"}"#).unwrap();
        assert!(body.tags.is_empty());
        assert!(body.phone.is_none());
    }
}
