// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use attend_core::{
    AttendError, Attendance, AttendanceStatus, DepartmentDirectory, EventType, HistoryAction,
    TenantContext, TransferMode, TransferRequest,
};
use attend_storage::queries::attendances;
use attend_storage::{AttendanceUpdate, Operation, ReplayTarget, Stamp, UpdateOutcome};
use tracing::info;

use super::RoutingEngine;

fn concurrent_change(attendance: &Attendance) -> AttendError {
    AttendError::Conflict(format!(
        "attendance {} was modified concurrently",
        attendance.id
    ))
}

impl RoutingEngine {
    /// Hand an owned attendance to another user and/or department.
    ///
    /// A department-only transfer releases ownership: the attendance goes
    /// back to OPEN in the target department's queue. With a target user it
    /// lands IN_PROGRESS under that user, or TRANSFERRED until they accept
    /// when the engine runs in accept mode.
    pub async fn transfer(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        request: &TransferRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        self.settings
            .retry
            .run("transfer", move || {
                self.transfer_once(ctx, attendance_id, request, idempotency_key)
            })
            .await
    }

    async fn transfer_once(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        request: &TransferRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        let token = Self::token(
            ctx,
            idempotency_key,
            Operation::Transfer,
            ReplayTarget::Attendance(attendance_id.to_string()),
        );
        if let Some(stored) = self.replayed(ctx, token.as_ref()).await? {
            return Ok(self.present(stored));
        }

        let current = self.load(&ctx.tenant_id, attendance_id).await?;
        if !current.status.is_owned() {
            return Err(AttendError::Conflict(format!(
                "attendance {} is {}; only IN_PROGRESS or TRANSFERRED attendances can be transferred",
                current.id, current.status
            )));
        }

        let target_user = request
            .target_user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let target_department = request
            .target_department_id
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        if target_user.is_none() && target_department.is_none() {
            return Err(AttendError::InvalidArgument(
                "transfer needs a target user, a target department, or both".into(),
            ));
        }

        let department_changes =
            target_department.is_some_and(|d| current.department_id.as_deref() != Some(d));
        if let Some(user) = target_user
            && current.assigned_user_id.as_deref() == Some(user)
            && !department_changes
        {
            return Err(AttendError::InvalidArgument(format!(
                "attendance is already assigned to {user}"
            )));
        }

        if let Some(department_id) = target_department
            && self
                .departments
                .get(&ctx.tenant_id, department_id)
                .await?
                .is_none()
        {
            return Err(AttendError::not_found("department", department_id));
        }

        let resulting_department = target_department
            .map(str::to_string)
            .or_else(|| current.department_id.clone());

        if let Some(user) = target_user
            && let Some(department_id) = &resulting_department
            && !self
                .departments
                .is_member(&ctx.tenant_id, department_id, user)
                .await?
        {
            return Err(AttendError::InvalidArgument(format!(
                "user {user} is not a member of department {department_id}"
            )));
        }

        if !self.can_manage(ctx, &current).await? {
            return Err(AttendError::Forbidden(
                "only the owner, a tenant admin, or a department admin can transfer this attendance"
                    .into(),
            ));
        }

        let mut update = AttendanceUpdate::from_current(&current, HistoryAction::Transfer, &ctx.user_id);
        update.department_id = resulting_department;
        update.require_department = target_department.map(str::to_string);
        match target_user {
            None => {
                update.status = AttendanceStatus::Open;
                update.assigned_user_id = None;
            }
            Some(user) => {
                update.status = match self.settings.transfer_mode {
                    TransferMode::Push => AttendanceStatus::InProgress,
                    TransferMode::Accept => AttendanceStatus::Transferred,
                };
                update.assigned_user_id = Some(user.to_string());
            }
        }
        if let Some(priority) = request.priority {
            update.priority = priority;
        }
        update.stamp = Some(Stamp::Transferred);
        update.notes = request.notes.clone();
        update.idempotency = token;

        match attendances::apply_update(&self.db, update).await? {
            UpdateOutcome::Applied(after) => {
                let after = self.present(after);
                info!(
                    tenant_id = %ctx.tenant_id,
                    attendance_id = %after.id,
                    from_user = current.assigned_user_id.as_deref().unwrap_or(""),
                    to_user = after.assigned_user_id.as_deref().unwrap_or(""),
                    to_department = after.department_id.as_deref().unwrap_or(""),
                    status = %after.status,
                    "attendance transferred"
                );
                self.emit(EventType::Transferred, Some(&ctx.user_id), &after);
                Ok(after)
            }
            UpdateOutcome::Replayed(stored) => Ok(self.present(stored)),
            UpdateOutcome::Stale(now) => Err(concurrent_change(&now)),
        }
    }

    /// Accept a transfer addressed to the caller (accept mode).
    pub async fn accept(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        self.settings
            .retry
            .run("accept", move || {
                self.accept_once(ctx, attendance_id, idempotency_key)
            })
            .await
    }

    async fn accept_once(
        &self,
        ctx: &TenantContext,
        attendance_id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        let token = Self::token(
            ctx,
            idempotency_key,
            Operation::Accept,
            ReplayTarget::Attendance(attendance_id.to_string()),
        );
        if let Some(stored) = self.replayed(ctx, token.as_ref()).await? {
            return Ok(self.present(stored));
        }

        let current = self.load(&ctx.tenant_id, attendance_id).await?;
        if current.status != AttendanceStatus::Transferred {
            return Err(AttendError::Conflict(format!(
                "attendance {} is {}; only TRANSFERRED attendances can be accepted",
                current.id, current.status
            )));
        }
        if current.assigned_user_id.as_deref() != Some(ctx.user_id.as_str()) {
            return Err(AttendError::Forbidden(
                "only the transfer target can accept this attendance".into(),
            ));
        }

        let mut update = AttendanceUpdate::from_current(&current, HistoryAction::Accept, &ctx.user_id);
        update.status = AttendanceStatus::InProgress;
        update.idempotency = token;

        match attendances::apply_update(&self.db, update).await? {
            UpdateOutcome::Applied(after) => {
                let after = self.present(after);
                info!(tenant_id = %ctx.tenant_id, attendance_id = %after.id, "transfer accepted");
                self.emit(EventType::Updated, Some(&ctx.user_id), &after);
                Ok(after)
            }
            UpdateOutcome::Replayed(stored) => Ok(self.present(stored)),
            UpdateOutcome::Stale(now) => Err(concurrent_change(&now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use attend_core::{AttendanceFilter, Priority, Role};

    use super::*;
    use crate::engine::EngineSettings;
    use crate::test_support::{engine_with, engine_with_recorder, lead, test_settings};

    fn agent(user: &str) -> TenantContext {
        TenantContext::new("t1", user, Role::Agent)
    }

    fn to_user(user: &str) -> TransferRequest {
        TransferRequest {
            target_user_id: Some(user.to_string()),
            ..TransferRequest::default()
        }
    }

    #[tokio::test]
    async fn push_transfer_reassigns_immediately() {
        let (engine, recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        let claimed = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();

        let request = TransferRequest {
            target_user_id: Some("u2".into()),
            priority: Some(Priority::High),
            notes: Some("needs billing".into()),
            ..TransferRequest::default()
        };
        let moved = engine.transfer(&agent("u1"), &claimed.id, &request, None).await.unwrap();
        assert_eq!(moved.status, AttendanceStatus::InProgress);
        assert_eq!(moved.assigned_user_id.as_deref(), Some("u2"));
        assert_eq!(moved.priority, Priority::High);
        assert!(moved.last_transferred_at.is_some());
        assert_eq!(recorder.last().unwrap().event_type, EventType::Transferred);

        let details = engine.get_details(&agent("u2"), &claimed.id).await.unwrap();
        assert_eq!(details.history.len(), 2);
        let entry = &details.history[1];
        assert_eq!(entry.action, HistoryAction::Transfer);
        assert_eq!(entry.from_user_id.as_deref(), Some("u1"));
        assert_eq!(entry.to_user_id.as_deref(), Some("u2"));
        assert_eq!(entry.notes.as_deref(), Some("needs billing"));
    }

    #[tokio::test]
    async fn department_only_transfer_releases_to_queue() {
        let (engine, _recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        let admin = TenantContext::new("t1", "boss", Role::Admin);
        let support = engine.departments().create(&admin, "Support", None).await.unwrap();
        engine
            .departments()
            .add_member(&admin, &support.id, "u2", Role::Agent)
            .await
            .unwrap();
        let claimed = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();

        let request = TransferRequest {
            target_department_id: Some(support.id.clone()),
            ..TransferRequest::default()
        };
        let released = engine.transfer(&agent("u1"), &claimed.id, &request, None).await.unwrap();
        assert_eq!(released.status, AttendanceStatus::Open);
        assert_eq!(released.assigned_user_id, None);
        assert_eq!(released.department_id.as_deref(), Some(support.id.as_str()));

        let queue = engine.get_queue(&agent("u2")).await.unwrap();
        assert_eq!(queue.top(10)[0].id, claimed.id);
        assert!(engine.get_queue(&agent("u3")).await.unwrap().is_empty());

        // The previous owner neither queues nor owns it any more.
        assert!(engine.get_queue(&agent("u1")).await.unwrap().is_empty());
        let owned_by_u1 = AttendanceFilter {
            assigned_user_id: Some("u1".into()),
            ..AttendanceFilter::default()
        };
        assert!(
            engine
                .list(&agent("u1"), &owned_by_u1, None)
                .await
                .unwrap()
                .is_empty()
        );

        let details = engine.get_details(&admin, &claimed.id).await.unwrap();
        let entry = details.history.last().unwrap();
        assert_eq!(entry.action, HistoryAction::Transfer);
        assert_eq!(entry.from_user_id.as_deref(), Some("u1"));
        assert_eq!(entry.to_user_id, None);
        assert_eq!(entry.from_department_id, None);
        assert_eq!(entry.to_department_id.as_deref(), Some(support.id.as_str()));
        assert_eq!(entry.to_status, AttendanceStatus::Open);

        let reclaimed = engine.claim(&agent("u2"), "l1", None, None).await.unwrap();
        assert_eq!(reclaimed.id, claimed.id);
    }

    #[tokio::test]
    async fn target_user_must_belong_to_target_department() {
        let (engine, _recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        let admin = TenantContext::new("t1", "boss", Role::Admin);
        let support = engine.departments().create(&admin, "Support", None).await.unwrap();
        let claimed = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();

        let request = TransferRequest {
            target_user_id: Some("u2".into()),
            target_department_id: Some(support.id.clone()),
            ..TransferRequest::default()
        };
        let err = engine
            .transfer(&agent("u1"), &claimed.id, &request, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn malformed_and_unauthorized_transfers_are_rejected() {
        let (engine, _recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        let claimed = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();

        let err = engine
            .transfer(&agent("u1"), &claimed.id, &TransferRequest::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::InvalidArgument(_)));

        let err = engine
            .transfer(&agent("u1"), &claimed.id, &to_user("u1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::InvalidArgument(_)));

        let err = engine
            .transfer(&agent("u3"), &claimed.id, &to_user("u2"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::Forbidden(_)));

        let request = TransferRequest {
            target_department_id: Some("no-such-department".into()),
            ..TransferRequest::default()
        };
        let err = engine
            .transfer(&agent("u1"), &claimed.id, &request, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::NotFound { entity: "department", .. }));
    }

    #[tokio::test]
    async fn open_attendance_cannot_be_transferred() {
        let (engine, _recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        engine.sync("t1").await.unwrap();
        let open = engine.list(&agent("u1"), &Default::default(), None).await.unwrap();

        let err = engine
            .transfer(&agent("u1"), &open[0].id, &to_user("u2"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::Conflict(_)));
    }

    #[tokio::test]
    async fn accept_mode_waits_for_target() {
        let settings = EngineSettings {
            transfer_mode: TransferMode::Accept,
            ..test_settings()
        };
        let (engine, recorder, db, _dir) = engine_with(settings).await;
        lead(&db, "t1", "l1", "new").await;
        let claimed = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();

        let pending = engine
            .transfer(&agent("u1"), &claimed.id, &to_user("u2"), None)
            .await
            .unwrap();
        assert_eq!(pending.status, AttendanceStatus::Transferred);
        assert_eq!(pending.assigned_user_id.as_deref(), Some("u2"));

        let err = engine.accept(&agent("u3"), &claimed.id, None).await.unwrap_err();
        assert!(matches!(err, AttendError::Forbidden(_)));

        let accepted = engine.accept(&agent("u2"), &claimed.id, Some("acc-1")).await.unwrap();
        assert_eq!(accepted.status, AttendanceStatus::InProgress);
        assert_eq!(recorder.last().unwrap().event_type, EventType::Updated);

        let replay = engine.accept(&agent("u2"), &claimed.id, Some("acc-1")).await.unwrap();
        assert_eq!(replay.version, accepted.version);
        let err = engine.accept(&agent("u2"), &claimed.id, None).await.unwrap_err();
        assert!(matches!(err, AttendError::Conflict(_)));

        let details = engine.get_details(&agent("u2"), &claimed.id).await.unwrap();
        let actions: Vec<_> = details.history.iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![HistoryAction::Claim, HistoryAction::Transfer, HistoryAction::Accept]
        );
    }

    #[tokio::test]
    async fn transfer_key_is_scoped_to_its_attendance() {
        let (engine, _recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        lead(&db, "t1", "l2", "new").await;
        let a1 = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();
        let a2 = engine.claim(&agent("u1"), "l2", None, None).await.unwrap();

        engine
            .transfer(&agent("u1"), &a1.id, &to_user("u2"), Some("t-1"))
            .await
            .unwrap();
        let err = engine
            .transfer(&agent("u1"), &a2.id, &to_user("u2"), Some("t-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::Conflict(_)), "got {err:?}");

        let a2_now = engine.get_details(&agent("u1"), &a2.id).await.unwrap();
        assert_eq!(a2_now.attendance.assigned_user_id.as_deref(), Some("u1"));
        assert_eq!(a2_now.history.len(), 1);
    }
}
