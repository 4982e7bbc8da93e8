// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use attend_core::{
    AttendError, Attendance, AttendanceStatus, CloseRequest, EventType, HistoryAction,
    TenantContext,
};
use attend_storage::queries::attendances;
use attend_storage::{AttendanceUpdate, EnsureOutcome, Operation, ReplayTarget, Stamp, UpdateOutcome};
use tracing::{debug, info};

use super::RoutingEngine;

impl RoutingEngine {
    /// Close an owned attendance. Closing an already closed attendance is a
    /// no-op that returns it unchanged and writes no history.
    pub async fn close(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        request: &CloseRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        self.settings
            .retry
            .run("close", move || {
                self.close_once(ctx, attendance_id, request, idempotency_key)
            })
            .await
    }

    async fn close_once(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        request: &CloseRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        let token = Self::token(
            ctx,
            idempotency_key,
            Operation::Close,
            ReplayTarget::Attendance(attendance_id.to_string()),
        );
        if let Some(stored) = self.replayed(ctx, token.as_ref()).await? {
            return Ok(self.present(stored));
        }

        let current = self.load(&ctx.tenant_id, attendance_id).await?;
        match current.status {
            AttendanceStatus::Closed => return Ok(self.present(current)),
            AttendanceStatus::Open => {
                return Err(AttendError::Conflict(format!(
                    "attendance {} is OPEN; claim it before closing",
                    current.id
                )));
            }
            AttendanceStatus::InProgress | AttendanceStatus::Transferred => {}
        }

        if !self.can_manage(ctx, &current).await? {
            return Err(AttendError::Forbidden(
                "only the owner, a tenant admin, or a department admin can close this attendance"
                    .into(),
            ));
        }

        let mut update = AttendanceUpdate::from_current(&current, HistoryAction::Close, &ctx.user_id);
        update.status = AttendanceStatus::Closed;
        update.stamp = Some(Stamp::Closed);
        update.notes = request.notes.clone();
        update.idempotency = token;

        match attendances::apply_update(&self.db, update).await? {
            UpdateOutcome::Applied(after) => {
                let after = self.present(after);
                info!(
                    tenant_id = %ctx.tenant_id,
                    attendance_id = %after.id,
                    user_id = %ctx.user_id,
                    "attendance closed"
                );
                self.emit(EventType::Updated, Some(&ctx.user_id), &after);
                Ok(after)
            }
            UpdateOutcome::Replayed(stored) => Ok(self.present(stored)),
            // A concurrent close already did the work.
            UpdateOutcome::Stale(now) if now.status == AttendanceStatus::Closed => {
                Ok(self.present(now))
            }
            UpdateOutcome::Stale(now) => Err(AttendError::Conflict(format!(
                "attendance {} was modified concurrently",
                now.id
            ))),
        }
    }

    /// Start a fresh OPEN attendance for the lead of a closed one.
    ///
    /// The closed attendance is left untouched; the new one keeps its
    /// priority, and its department unless that has since been deleted.
    pub async fn reopen(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        notes: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        let closed = self.load(&ctx.tenant_id, attendance_id).await?;
        if closed.status != AttendanceStatus::Closed {
            return Err(AttendError::Conflict(format!(
                "attendance {} is {}; only CLOSED attendances can be reopened",
                closed.id, closed.status
            )));
        }
        if !self.has_access(ctx, &closed).await? {
            return Err(AttendError::Forbidden(
                "you have no access to this attendance".into(),
            ));
        }

        // A department deleted since the close is dropped.
        let department_id = match &closed.department_id {
            Some(department_id)
                if self
                    .departments
                    .get(&ctx.tenant_id, department_id)
                    .await?
                    .is_none() =>
            {
                debug!(
                    attendance_id = %closed.id,
                    department_id = %department_id,
                    "department no longer exists, reopening without it"
                );
                None
            }
            other => other.clone(),
        };

        let outcome = self
            .settings
            .retry
            .run("reopen", || {
                attendances::create_open(
                    &self.db,
                    &ctx.tenant_id,
                    &closed.lead_id,
                    department_id.as_deref(),
                    closed.priority,
                )
            })
            .await?;

        match outcome {
            EnsureOutcome::Created(fresh) => {
                let fresh = self.present(fresh);
                info!(
                    tenant_id = %ctx.tenant_id,
                    closed_id = %closed.id,
                    attendance_id = %fresh.id,
                    lead_id = %fresh.lead_id,
                    notes = notes.unwrap_or(""),
                    "attendance reopened"
                );
                self.emit(EventType::New, Some(&ctx.user_id), &fresh);
                Ok(fresh)
            }
            EnsureOutcome::Existing(open) => Err(AttendError::Conflict(format!(
                "lead {} already has an open attendance {}",
                open.lead_id, open.id
            ))),
        }
    }
}
