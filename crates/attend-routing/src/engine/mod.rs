// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The attendance routing engine.
//!
//! Commands (claim, transfer, accept, close, priority, reopen) validate the
//! caller's request against the current row, then hand a guarded write to
//! the store, which re-checks the precondition inside its transaction. A
//! committed change is published as an event; publication never fails the
//! command.

mod claim;
mod close;
mod priority;
mod transfer;

use std::sync::Arc;
use std::time::Duration;

use attend_config::AttendConfig;
use attend_core::{
    AttendError, Attendance, AttendanceDetails, AttendanceEvent, AttendanceFilter,
    AttendanceStats, EventPublisher, EventType, LeadDirectory, Priority, Role, TenantContext,
    TransferMode,
};
use attend_storage::database::now_timestamp;
use attend_storage::queries::{attendances, history, idempotency, stats};
use attend_storage::{Database, IdempotencyToken, Operation, ReplayTarget};
use chrono::Utc;

use crate::departments::DepartmentRegistry;
use crate::ranker::{RankedQueue, SlaPolicy};
use crate::retry::RetryPolicy;

/// Engine tunables, usually derived from [`AttendConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub sla: SlaPolicy,
    pub default_priority: Priority,
    pub transfer_mode: TransferMode,
    pub max_page_size: usize,
    pub sync_batch_size: usize,
    /// Lowercased lead statuses that never get an attendance.
    pub terminal_lead_statuses: Vec<String>,
    pub retry: RetryPolicy,
    pub idempotency_ttl_hours: u64,
}

impl EngineSettings {
    pub fn from_config(config: &AttendConfig) -> Self {
        Self {
            sla: SlaPolicy::from_minutes(config.queue.sla_minutes),
            default_priority: config.queue.default_priority,
            transfer_mode: config.routing.transfer_mode,
            max_page_size: config.queue.max_page_size,
            sync_batch_size: config.sync.batch_size,
            terminal_lead_statuses: config
                .sync
                .terminal_lead_statuses
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            retry: RetryPolicy::new(
                config.engine.transient_retries,
                Duration::from_millis(config.engine.retry_backoff_ms),
            ),
            idempotency_ttl_hours: config.engine.idempotency_ttl_hours,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AttendConfig::default())
    }
}

/// Shared, cloneable handle to the routing engine.
#[derive(Clone)]
pub struct RoutingEngine {
    pub(crate) db: Database,
    pub(crate) leads: Arc<dyn LeadDirectory>,
    pub(crate) departments: DepartmentRegistry,
    events: Arc<dyn EventPublisher>,
    pub(crate) settings: Arc<EngineSettings>,
}

impl RoutingEngine {
    pub fn new(
        db: Database,
        leads: Arc<dyn LeadDirectory>,
        events: Arc<dyn EventPublisher>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            departments: DepartmentRegistry::new(db.clone()),
            db,
            leads,
            events,
            settings: Arc::new(settings),
        }
    }

    pub fn departments(&self) -> &DepartmentRegistry {
        &self.departments
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn emit(&self, event_type: EventType, actor: Option<&str>, attendance: &Attendance) {
        self.events.publish(AttendanceEvent {
            event_type,
            tenant_id: attendance.tenant_id.clone(),
            actor_user_id: actor.map(str::to_string),
            attendance: attendance.clone(),
            occurred_at: now_timestamp(),
        });
    }

    /// Evaluate urgency as of now.
    pub(crate) fn present(&self, attendance: Attendance) -> Attendance {
        self.settings.sla.apply(attendance, Utc::now())
    }

    pub(crate) async fn load(
        &self,
        tenant_id: &str,
        attendance_id: &str,
    ) -> Result<Attendance, AttendError> {
        attendances::get_by_id(&self.db, tenant_id, attendance_id)
            .await?
            .ok_or_else(|| AttendError::not_found("attendance", attendance_id))
    }

    /// Idempotency token for a command `ctx` sends against `target`.
    pub(crate) fn token(
        ctx: &TenantContext,
        key: Option<&str>,
        operation: Operation,
        target: ReplayTarget,
    ) -> Option<IdempotencyToken> {
        key.map(|k| IdempotencyToken::new(k, operation, target, ctx.user_id.clone()))
    }

    /// Result stored for a retried command, if this key was seen before.
    pub(crate) async fn replayed(
        &self,
        ctx: &TenantContext,
        token: Option<&IdempotencyToken>,
    ) -> Result<Option<Attendance>, AttendError> {
        match token {
            Some(token) => idempotency::find(&self.db, &ctx.tenant_id, token).await,
            None => Ok(None),
        }
    }

    /// Tenant admin, the assignee, or any member of the attendance's
    /// department (everyone when it has none).
    pub(crate) async fn has_access(
        &self,
        ctx: &TenantContext,
        attendance: &Attendance,
    ) -> Result<bool, AttendError> {
        if ctx.is_admin() || attendance.assigned_user_id.as_deref() == Some(ctx.user_id.as_str()) {
            return Ok(true);
        }
        match &attendance.department_id {
            None => Ok(true),
            Some(department_id) => Ok(self
                .departments
                .member_role(&ctx.tenant_id, department_id, &ctx.user_id)
                .await?
                .is_some()),
        }
    }

    /// Tenant admin, the assignee, or an ADMIN member of the attendance's department.
    pub(crate) async fn can_manage(
        &self,
        ctx: &TenantContext,
        attendance: &Attendance,
    ) -> Result<bool, AttendError> {
        if ctx.is_admin() || attendance.assigned_user_id.as_deref() == Some(ctx.user_id.as_str()) {
            return Ok(true);
        }
        match &attendance.department_id {
            None => Ok(false),
            Some(department_id) => Ok(self
                .departments
                .member_role(&ctx.tenant_id, department_id, &ctx.user_id)
                .await?
                == Some(Role::Admin)),
        }
    }

    /// An attendance and its full history.
    pub async fn get_details(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
    ) -> Result<AttendanceDetails, AttendError> {
        let attendance = self.load(&ctx.tenant_id, attendance_id).await?;
        let history = history::list_history(&self.db, &ctx.tenant_id, attendance_id).await?;
        Ok(AttendanceDetails {
            attendance: self.present(attendance),
            history,
        })
    }

    /// Attendances matching `filter`, newest first, capped at the configured page size.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: &AttendanceFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Attendance>, AttendError> {
        let now = Utc::now();
        let limit = limit
            .unwrap_or(self.settings.max_page_size)
            .min(self.settings.max_page_size);
        let rows = attendances::list_by_filter(
            &self.db,
            &ctx.tenant_id,
            filter,
            &self.settings.sla.cutoff(now),
            limit,
        )
        .await?;
        Ok(rows
            .into_iter()
            .map(|a| self.settings.sla.apply(a, now))
            .collect())
    }

    /// The requester's smart queue: claimable attendances in queue order.
    pub async fn get_queue(&self, ctx: &TenantContext) -> Result<RankedQueue, AttendError> {
        let candidates =
            attendances::list_queue_candidates(&self.db, &ctx.tenant_id, &ctx.user_id).await?;
        Ok(RankedQueue::new(candidates, &self.settings.sla, Utc::now()))
    }

    pub async fn get_stats(&self, ctx: &TenantContext) -> Result<AttendanceStats, AttendError> {
        stats::stats(&self.db, &ctx.tenant_id, &self.settings.sla.cutoff(Utc::now())).await
    }

    /// Forget idempotency keys older than the configured TTL.
    pub async fn prune_idempotency(&self) -> Result<usize, AttendError> {
        let hours = i64::try_from(self.settings.idempotency_ttl_hours).unwrap_or(i64::MAX / 3_600_000);
        let cutoff = (Utc::now() - chrono::Duration::hours(hours))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        idempotency::prune(&self.db, &cutoff).await
    }
}
