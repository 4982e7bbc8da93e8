// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use attend_core::{AttendError, Attendance, EventType, TenantContext};
use attend_storage::queries::attendances;
use attend_storage::{ClaimCommand, ClaimOutcome, Operation, ReplayTarget};
use tracing::{debug, info};

use super::RoutingEngine;

impl RoutingEngine {
    /// Claim the open attendance of a lead, creating it if absent.
    ///
    /// Exactly one of any number of concurrent claims for the same lead wins;
    /// the rest get `Conflict`.
    pub async fn claim(
        &self,
        ctx: &TenantContext,
        lead_id: &str,
        notes: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        self.settings
            .retry
            .run("claim", move || {
                self.claim_once(ctx, lead_id, notes, idempotency_key)
            })
            .await
    }

    async fn claim_once(
        &self,
        ctx: &TenantContext,
        lead_id: &str,
        notes: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<Attendance, AttendError> {
        if self
            .leads
            .get_lead(&ctx.tenant_id, lead_id)
            .await?
            .is_none()
        {
            return Err(AttendError::not_found("lead", lead_id));
        }

        let outcome = attendances::claim_open(
            &self.db,
            ClaimCommand {
                tenant_id: ctx.tenant_id.clone(),
                lead_id: lead_id.to_string(),
                user_id: ctx.user_id.clone(),
                default_priority: self.settings.default_priority,
                notes: notes.map(str::to_string),
                idempotency: Self::token(
                    ctx,
                    idempotency_key,
                    Operation::Claim,
                    ReplayTarget::Lead(lead_id.to_string()),
                ),
            },
        )
        .await?;

        match outcome {
            ClaimOutcome::Claimed {
                attendance,
                created,
            } => {
                let attendance = self.present(attendance);
                info!(
                    tenant_id = %ctx.tenant_id,
                    attendance_id = %attendance.id,
                    lead_id,
                    user_id = %ctx.user_id,
                    created,
                    "attendance claimed"
                );
                if created {
                    self.emit(EventType::New, Some(&ctx.user_id), &attendance);
                }
                self.emit(EventType::Claimed, Some(&ctx.user_id), &attendance);
                Ok(attendance)
            }
            ClaimOutcome::AlreadyClaimed(current) => {
                debug!(
                    attendance_id = %current.id,
                    owner = current.assigned_user_id.as_deref().unwrap_or(""),
                    "claim lost"
                );
                if current.assigned_user_id.as_deref() == Some(ctx.user_id.as_str()) {
                    Err(AttendError::Conflict("lead already claimed by you".into()))
                } else {
                    Err(AttendError::Conflict(
                        "lead already claimed by another agent".into(),
                    ))
                }
            }
            ClaimOutcome::NotEligible(current) => Err(AttendError::Forbidden(format!(
                "attendance {} belongs to a department you are not a member of",
                current.id
            ))),
            ClaimOutcome::Replayed(stored) => Ok(self.present(stored)),
        }
    }
}

#[cfg(test)]
mod tests {
    use attend_core::{AttendanceStatus, HistoryAction, Priority, Role};
    use attend_storage::queries::attendances;

    use super::*;
    use crate::test_support::{engine_with_recorder, lead};

    fn agent(user: &str) -> TenantContext {
        TenantContext::new("t1", user, Role::Agent)
    }

    #[tokio::test]
    async fn claim_on_demand_creates_then_claims() {
        let (engine, recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;

        let claimed = engine.claim(&agent("u1"), "l1", Some("calling back"), None).await.unwrap();
        assert_eq!(claimed.status, AttendanceStatus::InProgress);
        assert_eq!(claimed.assigned_user_id.as_deref(), Some("u1"));
        assert!(claimed.claimed_at.is_some());
        assert_eq!(recorder.types(), vec![EventType::New, EventType::Claimed]);

        let details = engine.get_details(&agent("u1"), &claimed.id).await.unwrap();
        assert_eq!(details.history.len(), 1);
        assert_eq!(details.history[0].action, HistoryAction::Claim);
        assert_eq!(details.history[0].notes.as_deref(), Some("calling back"));
    }

    #[tokio::test]
    async fn second_claim_conflicts() {
        let (engine, recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        engine.claim(&agent("u1"), "l1", None, None).await.unwrap();

        let err = engine.claim(&agent("u2"), "l1", None, None).await.unwrap_err();
        assert!(matches!(err, AttendError::Conflict(ref m) if m.contains("another agent")));
        let err = engine.claim(&agent("u1"), "l1", None, None).await.unwrap_err();
        assert!(matches!(err, AttendError::Conflict(ref m) if m.contains("by you")));
        assert_eq!(recorder.count(), 2);
    }

    #[tokio::test]
    async fn claim_of_unknown_lead_is_not_found() {
        let (engine, _recorder, _db, _dir) = engine_with_recorder().await;
        let err = engine.claim(&agent("u1"), "ghost", None, None).await.unwrap_err();
        assert!(matches!(err, AttendError::NotFound { entity: "lead", .. }));
    }

    #[tokio::test]
    async fn claim_with_same_key_replays_result() {
        let (engine, recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;

        let first = engine.claim(&agent("u1"), "l1", None, Some("k-1")).await.unwrap();
        let second = engine.claim(&agent("u1"), "l1", None, Some("k-1")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.version, second.version);
        assert_eq!(recorder.count(), 2);
    }

    #[tokio::test]
    async fn claim_key_reused_for_another_lead_conflicts() {
        let (engine, recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        lead(&db, "t1", "l2", "new").await;

        engine.claim(&agent("u1"), "l1", None, Some("k-1")).await.unwrap();
        let err = engine
            .claim(&agent("u1"), "l2", None, Some("k-1"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AttendError::Conflict(ref m) if m.contains("another attendance")),
            "got {err:?}"
        );
        assert!(
            attendances::get_open_by_lead(&db, "t1", "l2")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(recorder.count(), 2);

        let err = engine
            .claim(&agent("u2"), "l1", None, Some("k-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::Conflict(ref m) if m.contains("another user")));
    }

    #[tokio::test]
    async fn department_attendance_is_only_claimable_by_members() {
        let (engine, _recorder, db, _dir) = engine_with_recorder().await;
        lead(&db, "t1", "l1", "new").await;
        let admin = TenantContext::new("t1", "boss", Role::Admin);
        let sales = engine.departments().create(&admin, "Sales", None).await.unwrap();
        engine
            .departments()
            .add_member(&admin, &sales.id, "u1", Role::Agent)
            .await
            .unwrap();
        attendances::create_open(&db, "t1", "l1", Some(&sales.id), Priority::Normal)
            .await
            .unwrap();

        let err = engine.claim(&agent("u2"), "l1", None, None).await.unwrap_err();
        assert!(matches!(err, AttendError::Forbidden(_)));
        let claimed = engine.claim(&agent("u1"), "l1", None, None).await.unwrap();
        assert_eq!(claimed.department_id.as_deref(), Some(sales.id.as_str()));
    }
}
