// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use attend_core::{AttendError, Attendance, EventType, HistoryAction, Priority, TenantContext};
use attend_storage::queries::attendances;
use attend_storage::{AttendanceUpdate, Operation, ReplayTarget, UpdateOutcome};
use tracing::info;

use super::RoutingEngine;

impl RoutingEngine {
    /// Change the priority of a non-closed attendance.
    ///
    /// Setting the current priority again returns the attendance unchanged.
    pub async fn update_priority(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        priority: Priority,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        self.settings
            .retry
            .run("update_priority", move || {
                self.update_priority_once(ctx, attendance_id, priority, idempotency_key)
            })
            .await
    }

    async fn update_priority_once(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        priority: Priority,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        let token = Self::token(
            ctx,
            idempotency_key,
            Operation::Priority,
            ReplayTarget::Attendance(attendance_id.to_string()),
        );
        if let Some(stored) = self.replayed(ctx, token.as_ref()).await? {
            return Ok(self.present(stored));
        }

        let current = self.load(&ctx.tenant_id, attendance_id).await?;
        if current.status.is_terminal() {
            return Err(AttendError::Conflict(format!(
                "attendance {} is closed",
                current.id
            )));
        }
        if !self.has_access(ctx, &current).await? {
            return Err(AttendError::Forbidden(
                "you have no access to this attendance".into(),
            ));
        }
        if current.priority == priority {
            return Ok(self.present(current));
        }

        let mut update =
            AttendanceUpdate::from_current(&current, HistoryAction::Priority, &ctx.user_id);
        update.priority = priority;
        update.idempotency = token;

        match attendances::apply_update(&self.db, update).await? {
            UpdateOutcome::Applied(after) => {
                let after = self.present(after);
                info!(
                    tenant_id = %ctx.tenant_id,
                    attendance_id = %after.id,
                    from = %current.priority,
                    to = %after.priority,
                    "priority changed"
                );
                self.emit(EventType::Updated, Some(&ctx.user_id), &after);
                Ok(after)
            }
            UpdateOutcome::Replayed(stored) => Ok(self.present(stored)),
            UpdateOutcome::Stale(now) => Err(AttendError::Conflict(format!(
                "attendance {} was modified concurrently",
                now.id
            ))),
        }
    }
}
