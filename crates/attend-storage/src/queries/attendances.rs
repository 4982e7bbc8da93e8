// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attendance persistence.
//!
//! Every mutation here is one `IMMEDIATE` transaction that re-checks its
//! precondition against the stored row, writes, appends exactly one history
//! entry when status, owner or department moves, and records the idempotency
//! key. Business rules (who may do what) are decided by the caller.

use attend_core::AttendError;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};

use crate::database::{Database, TxError, map_tr_err, map_tx_err, now_timestamp};
use crate::models::{
    Attendance, AttendanceFilter, AttendanceStatus, AttendanceUpdate, ClaimCommand, ClaimOutcome,
    EnsureOutcome, HistoryAction, Priority, Stamp, UpdateOutcome,
};
use crate::queries::{
    ATTENDANCE_COLUMNS, ATTENDANCE_COLUMNS_A, attendance_from_row, history, idempotency,
};

fn select_by_id(
    conn: &Connection,
    tenant_id: &str,
    id: &str,
) -> rusqlite::Result<Option<Attendance>> {
    let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE tenant_id = ?1 AND id = ?2");
    conn.query_row(&sql, params![tenant_id, id], attendance_from_row)
        .optional()
}

fn select_open_by_lead(
    conn: &Connection,
    tenant_id: &str,
    lead_id: &str,
) -> rusqlite::Result<Option<Attendance>> {
    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendances
         WHERE tenant_id = ?1 AND lead_id = ?2 AND status != 'CLOSED'"
    );
    conn.query_row(&sql, params![tenant_id, lead_id], attendance_from_row)
        .optional()
}

fn department_exists(
    conn: &Connection,
    tenant_id: &str,
    department_id: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM departments WHERE tenant_id = ?1 AND id = ?2)",
        params![tenant_id, department_id],
        |row| row.get(0),
    )
}

fn is_department_member(
    conn: &Connection,
    tenant_id: &str,
    department_id: &str,
    user_id: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM department_members
         WHERE tenant_id = ?1 AND department_id = ?2 AND user_id = ?3)",
        params![tenant_id, department_id, user_id],
        |row| row.get(0),
    )
}

/// Create the open attendance for a lead unless one already exists.
///
/// The partial unique index on `(tenant_id, lead_id) WHERE status != 'CLOSED'`
/// is the arbiter: the insert is ignored when it would create a second open
/// attendance, and the surviving row is re-read.
fn ensure_open_in(
    conn: &Connection,
    tenant_id: &str,
    lead_id: &str,
    department_id: Option<&str>,
    priority: Priority,
) -> rusqlite::Result<EnsureOutcome> {
    let now = now_timestamp();
    let inserted = conn.execute(
        "INSERT INTO attendances
             (id, tenant_id, lead_id, status, priority, department_id, created_at, updated_at, version)
         VALUES (?1, ?2, ?3, 'OPEN', ?4, ?5, ?6, ?6, 0)
         ON CONFLICT DO NOTHING",
        params![
            uuid::Uuid::new_v4().to_string(),
            tenant_id,
            lead_id,
            priority.to_string(),
            department_id,
            now,
        ],
    )?;
    let attendance =
        select_open_by_lead(conn, tenant_id, lead_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    Ok(if inserted == 1 {
        EnsureOutcome::Created(attendance)
    } else {
        EnsureOutcome::Existing(attendance)
    })
}

/// Get an attendance by id within a tenant.
pub async fn get_by_id(
    db: &Database,
    tenant_id: &str,
    id: &str,
) -> Result<Option<Attendance>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_by_id(conn, &tenant_id, &id))
        .await
        .map_err(map_tr_err)
}

/// The non-closed attendance of a lead, if any.
pub async fn get_open_by_lead(
    db: &Database,
    tenant_id: &str,
    lead_id: &str,
) -> Result<Option<Attendance>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| select_open_by_lead(conn, &tenant_id, &lead_id))
        .await
        .map_err(map_tr_err)
}

/// Create an OPEN attendance for a lead, or return the one that already exists.
pub async fn create_open(
    db: &Database,
    tenant_id: &str,
    lead_id: &str,
    department_id: Option<&str>,
    priority: Priority,
) -> Result<EnsureOutcome, AttendError> {
    let tenant_id = tenant_id.to_string();
    let lead_id = lead_id.to_string();
    let department_id = department_id.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<EnsureOutcome, TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let outcome =
                ensure_open_in(&tx, &tenant_id, &lead_id, department_id.as_deref(), priority)?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tx_err)
}

/// Ensure an open attendance for every lead in one transaction.
///
/// Outcomes are returned in input order.
pub async fn ensure_open_batch(
    db: &Database,
    tenant_id: &str,
    lead_ids: Vec<String>,
    priority: Priority,
) -> Result<Vec<EnsureOutcome>, AttendError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<EnsureOutcome>, TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut outcomes = Vec::with_capacity(lead_ids.len());
            for lead_id in &lead_ids {
                outcomes.push(ensure_open_in(&tx, &tenant_id, lead_id, None, priority)?);
            }
            tx.commit()?;
            Ok(outcomes)
        })
        .await
        .map_err(map_tx_err)
}

/// Resolve or create the open attendance for a lead and claim it.
pub async fn claim_open(db: &Database, cmd: ClaimCommand) -> Result<ClaimOutcome, AttendError> {
    db.connection()
        .call(move |conn| -> Result<ClaimOutcome, TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(token) = &cmd.idempotency
                && let Some(stored) = idempotency::lookup(&tx, &cmd.tenant_id, token)?
            {
                return Ok(ClaimOutcome::Replayed(stored));
            }

            let ensured = ensure_open_in(
                &tx,
                &cmd.tenant_id,
                &cmd.lead_id,
                None,
                cmd.default_priority,
            )?;
            let created = matches!(ensured, EnsureOutcome::Created(_));
            let current = match ensured {
                EnsureOutcome::Created(a) | EnsureOutcome::Existing(a) => a,
            };

            if current.status != AttendanceStatus::Open {
                return Ok(ClaimOutcome::AlreadyClaimed(current));
            }
            if let Some(department_id) = &current.department_id
                && !is_department_member(&tx, &cmd.tenant_id, department_id, &cmd.user_id)?
            {
                return Ok(ClaimOutcome::NotEligible(current));
            }

            let now = now_timestamp();
            let changed = tx.execute(
                "UPDATE attendances
                 SET status = 'IN_PROGRESS', assigned_user_id = ?1, claimed_at = ?2,
                     updated_at = ?2, version = version + 1
                 WHERE id = ?3 AND tenant_id = ?4 AND status = 'OPEN'",
                params![cmd.user_id, now, current.id, cmd.tenant_id],
            )?;
            let claimed = select_by_id(&tx, &cmd.tenant_id, &current.id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            if changed == 0 {
                return Ok(ClaimOutcome::AlreadyClaimed(claimed));
            }

            history::append_transition(
                &tx,
                &current,
                &claimed,
                HistoryAction::Claim,
                &cmd.user_id,
                cmd.notes.as_deref(),
            )?;
            if let Some(token) = &cmd.idempotency {
                idempotency::record(&tx, &cmd.tenant_id, token, &claimed)?;
            }
            tx.commit()?;
            Ok(ClaimOutcome::Claimed {
                attendance: claimed,
                created,
            })
        })
        .await
        .map_err(map_tx_err)
}

/// Apply a compare-and-swap update and its history entry.
pub async fn apply_update(
    db: &Database,
    update: AttendanceUpdate,
) -> Result<UpdateOutcome, AttendError> {
    db.connection()
        .call(move |conn| -> Result<UpdateOutcome, TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(token) = &update.idempotency
                && let Some(stored) = idempotency::lookup(&tx, &update.tenant_id, token)?
            {
                return Ok(UpdateOutcome::Replayed(stored));
            }

            if let Some(department_id) = &update.require_department
                && !department_exists(&tx, &update.tenant_id, department_id)?
            {
                return Err(AttendError::not_found("department", department_id).into());
            }

            let current = select_by_id(&tx, &update.tenant_id, &update.attendance_id)?
                .ok_or_else(|| AttendError::not_found("attendance", &update.attendance_id))?;
            if current.version != update.expected_version || current.status.is_terminal() {
                return Ok(UpdateOutcome::Stale(current));
            }

            let now = now_timestamp();
            let mut claimed_at = current.claimed_at.clone();
            let mut last_transferred_at = current.last_transferred_at.clone();
            let mut closed_at = current.closed_at.clone();
            match update.stamp {
                Some(Stamp::Claimed) => claimed_at = Some(now.clone()),
                Some(Stamp::Transferred) => last_transferred_at = Some(now.clone()),
                Some(Stamp::Closed) => closed_at = Some(now.clone()),
                None => {}
            }

            let changed = tx.execute(
                "UPDATE attendances
                 SET status = ?1, assigned_user_id = ?2, department_id = ?3, priority = ?4,
                     claimed_at = ?5, last_transferred_at = ?6, closed_at = ?7,
                     updated_at = ?8, version = version + 1
                 WHERE id = ?9 AND tenant_id = ?10 AND version = ?11",
                params![
                    update.status.to_string(),
                    update.assigned_user_id,
                    update.department_id,
                    update.priority.to_string(),
                    claimed_at,
                    last_transferred_at,
                    closed_at,
                    now,
                    update.attendance_id,
                    update.tenant_id,
                    update.expected_version,
                ],
            )?;
            let after = select_by_id(&tx, &update.tenant_id, &update.attendance_id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            if changed == 0 {
                return Ok(UpdateOutcome::Stale(after));
            }

            history::append_transition(
                &tx,
                &current,
                &after,
                update.action,
                &update.actor_user_id,
                update.notes.as_deref(),
            )?;
            if let Some(token) = &update.idempotency {
                idempotency::record(&tx, &update.tenant_id, token, &after)?;
            }
            tx.commit()?;
            Ok(UpdateOutcome::Applied(after))
        })
        .await
        .map_err(map_tx_err)
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// List a tenant's attendances matching `filter`, newest first.
///
/// `urgent_cutoff` is the creation timestamp before which a non-closed
/// attendance counts as urgent.
pub async fn list_by_filter(
    db: &Database,
    tenant_id: &str,
    filter: &AttendanceFilter,
    urgent_cutoff: &str,
    limit: usize,
) -> Result<Vec<Attendance>, AttendError> {
    let mut clauses = vec!["a.tenant_id = ?".to_string()];
    let mut values = vec![Value::Text(tenant_id.to_string())];

    if let Some(status) = filter.status {
        clauses.push("a.status = ?".into());
        values.push(Value::Text(status.to_string()));
    }
    if let Some(priority) = filter.priority {
        clauses.push("a.priority = ?".into());
        values.push(Value::Text(priority.to_string()));
    }
    if let Some(department_id) = &filter.department_id {
        clauses.push("a.department_id = ?".into());
        values.push(Value::Text(department_id.clone()));
    }
    if let Some(user_id) = &filter.assigned_user_id {
        clauses.push("a.assigned_user_id = ?".into());
        values.push(Value::Text(user_id.clone()));
    }
    if let Some(urgent) = filter.urgent {
        let expr = "(a.status != 'CLOSED' AND a.created_at < ?)";
        clauses.push(if urgent {
            expr.to_string()
        } else {
            format!("NOT {expr}")
        });
        values.push(Value::Text(urgent_cutoff.to_string()));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        clauses.push(
            "(a.id LIKE ? ESCAPE '\\' OR a.lead_id LIKE ? ESCAPE '\\' \
             OR l.name LIKE ? ESCAPE '\\' OR l.phone LIKE ? ESCAPE '\\')"
                .into(),
        );
        let pattern = like_pattern(term);
        values.extend(std::iter::repeat_n(Value::Text(pattern), 4));
    }
    values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS_A} FROM attendances a
         LEFT JOIN leads l ON l.tenant_id = a.tenant_id AND l.id = a.lead_id
         WHERE {}
         ORDER BY a.created_at DESC, a.id ASC
         LIMIT ?",
        clauses.join(" AND ")
    );

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), attendance_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// OPEN attendances a user may claim: no department, or one they belong to.
pub async fn list_queue_candidates(
    db: &Database,
    tenant_id: &str,
    user_id: &str,
) -> Result<Vec<Attendance>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {ATTENDANCE_COLUMNS} FROM attendances
                 WHERE tenant_id = ?1 AND status = 'OPEN'
                   AND (department_id IS NULL OR department_id IN (
                        SELECT department_id FROM department_members
                        WHERE tenant_id = ?1 AND user_id = ?2))"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tenant_id, user_id], attendance_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IdempotencyToken, Operation, ReplayTarget};
    use crate::queries::history::list_history;
    use crate::queries::test_support::setup_db;
    use crate::queries::{departments, leads};

    fn claim_cmd(lead: &str, user: &str) -> ClaimCommand {
        ClaimCommand {
            tenant_id: "t1".into(),
            lead_id: lead.into(),
            user_id: user.into(),
            default_priority: Priority::Normal,
            notes: None,
            idempotency: None,
        }
    }

    async fn claimed(db: &Database, lead: &str, user: &str) -> Attendance {
        match claim_open(db, claim_cmd(lead, user)).await.unwrap() {
            ClaimOutcome::Claimed { attendance, .. } => attendance,
            other => panic!("expected claim, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_open_is_idempotent_per_lead() {
        let (db, _dir) = setup_db().await;
        let first = create_open(&db, "t1", "l1", None, Priority::High)
            .await
            .unwrap();
        let second = create_open(&db, "t1", "l1", None, Priority::Low)
            .await
            .unwrap();
        assert!(matches!(first, EnsureOutcome::Created(_)));
        assert!(matches!(second, EnsureOutcome::Existing(_)));
        assert_eq!(first.attendance().id, second.attendance().id);
        assert_eq!(second.attendance().priority, Priority::High);
        assert_eq!(second.attendance().version, 0);
    }

    #[tokio::test]
    async fn creation_writes_no_history() {
        let (db, _dir) = setup_db().await;
        let created = create_open(&db, "t1", "l1", None, Priority::Normal)
            .await
            .unwrap();
        let history = list_history(&db, "t1", &created.attendance().id)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn claim_creates_on_demand_and_second_claim_loses() {
        let (db, _dir) = setup_db().await;
        let first = claim_open(&db, claim_cmd("l1", "u1")).await.unwrap();
        let ClaimOutcome::Claimed {
            attendance,
            created,
        } = first
        else {
            panic!("expected first claim to win");
        };
        assert!(created);
        assert_eq!(attendance.status, AttendanceStatus::InProgress);
        assert_eq!(attendance.assigned_user_id.as_deref(), Some("u1"));
        assert!(attendance.claimed_at.is_some());
        assert_eq!(attendance.version, 1);

        let second = claim_open(&db, claim_cmd("l1", "u2")).await.unwrap();
        match second {
            ClaimOutcome::AlreadyClaimed(current) => {
                assert_eq!(current.assigned_user_id.as_deref(), Some("u1"));
            }
            other => panic!("expected AlreadyClaimed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn claim_respects_department_eligibility() {
        let (db, _dir) = setup_db().await;
        let dept = departments::create_department(&db, "t1", "Sales", None)
            .await
            .unwrap();
        create_open(&db, "t1", "l1", Some(&dept.id), Priority::Normal)
            .await
            .unwrap();

        let outsider = claim_open(&db, claim_cmd("l1", "u1")).await.unwrap();
        assert!(matches!(outsider, ClaimOutcome::NotEligible(_)));

        departments::upsert_member(&db, "t1", &dept.id, "u2", attend_core::Role::Agent)
            .await
            .unwrap();
        let won = claim_open(&db, claim_cmd("l1", "u2")).await.unwrap();
        assert!(matches!(won, ClaimOutcome::Claimed { created: false, .. }));
    }

    #[tokio::test]
    async fn claim_reads_membership_at_commit_time() {
        let (db, _dir) = setup_db().await;
        let dept = departments::create_department(&db, "t1", "Sales", None)
            .await
            .unwrap();
        departments::upsert_member(&db, "t1", &dept.id, "u1", attend_core::Role::Agent)
            .await
            .unwrap();
        create_open(&db, "t1", "l1", Some(&dept.id), Priority::Normal)
            .await
            .unwrap();

        departments::remove_member(&db, "t1", &dept.id, "u1")
            .await
            .unwrap();
        let outcome = claim_open(&db, claim_cmd("l1", "u1")).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::NotEligible(_)), "got {outcome:?}");
    }

    #[tokio::test]
    async fn update_into_deleted_department_is_rejected() {
        let (db, _dir) = setup_db().await;
        let dept = departments::create_department(&db, "t1", "Sales", None)
            .await
            .unwrap();
        let current = claimed(&db, "l1", "u1").await;

        let mut release = AttendanceUpdate::from_current(&current, HistoryAction::Transfer, "u1");
        release.status = AttendanceStatus::Open;
        release.assigned_user_id = None;
        release.department_id = Some(dept.id.clone());
        release.require_department = Some(dept.id.clone());

        // The department goes away after the caller validated it.
        departments::delete_department(&db, "t1", &dept.id)
            .await
            .unwrap();

        let err = apply_update(&db, release).await.unwrap_err();
        assert!(matches!(err, AttendError::NotFound { .. }), "got {err:?}");
        let after = get_by_id(&db, "t1", &current.id).await.unwrap().unwrap();
        assert_eq!(after.status, AttendanceStatus::InProgress);
        assert_eq!(after.department_id, None);
        assert_eq!(list_history(&db, "t1", &current.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_version_is_not_applied() {
        let (db, _dir) = setup_db().await;
        let current = claimed(&db, "l1", "u1").await;

        let mut close = AttendanceUpdate::from_current(&current, HistoryAction::Close, "u1");
        close.status = AttendanceStatus::Closed;
        close.stamp = Some(Stamp::Closed);
        let mut stale = close.clone();
        stale.expected_version = current.version - 1;

        let outcome = apply_update(&db, stale).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Stale(ref a) if a.status == AttendanceStatus::InProgress));

        let outcome = apply_update(&db, close).await.unwrap();
        let UpdateOutcome::Applied(after) = outcome else {
            panic!("expected close to apply");
        };
        assert_eq!(after.status, AttendanceStatus::Closed);
        assert!(after.closed_at.is_some());
        assert_eq!(after.assigned_user_id.as_deref(), Some("u1"));
        assert_eq!(after.version, current.version + 1);

        let history = list_history(&db, "t1", &current.id).await.unwrap();
        let actions: Vec<_> = history.iter().map(|h| h.action).collect();
        assert_eq!(actions, vec![HistoryAction::Claim, HistoryAction::Close]);
    }

    #[tokio::test]
    async fn closed_attendance_is_never_updated() {
        let (db, _dir) = setup_db().await;
        let current = claimed(&db, "l1", "u1").await;
        let mut close = AttendanceUpdate::from_current(&current, HistoryAction::Close, "u1");
        close.status = AttendanceStatus::Closed;
        let UpdateOutcome::Applied(closed) = apply_update(&db, close).await.unwrap() else {
            panic!("expected close to apply");
        };

        let mut reprioritize =
            AttendanceUpdate::from_current(&closed, HistoryAction::Priority, "u1");
        reprioritize.priority = Priority::High;
        let outcome = apply_update(&db, reprioritize).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Stale(ref a) if a.priority == Priority::Normal));
    }

    #[tokio::test]
    async fn release_to_queue_and_reopen_after_close() {
        let (db, _dir) = setup_db().await;
        let current = claimed(&db, "l1", "u1").await;

        let mut release = AttendanceUpdate::from_current(&current, HistoryAction::Transfer, "u1");
        release.status = AttendanceStatus::Open;
        release.assigned_user_id = None;
        release.stamp = Some(Stamp::Transferred);
        let UpdateOutcome::Applied(open) = apply_update(&db, release).await.unwrap() else {
            panic!("expected release to apply");
        };
        assert_eq!(open.status, AttendanceStatus::Open);
        assert!(open.last_transferred_at.is_some());

        let again = claimed(&db, "l1", "u2").await;
        let mut close = AttendanceUpdate::from_current(&again, HistoryAction::Close, "u2");
        close.status = AttendanceStatus::Closed;
        apply_update(&db, close).await.unwrap();

        let fresh = create_open(&db, "t1", "l1", None, Priority::Normal)
            .await
            .unwrap();
        assert!(matches!(fresh, EnsureOutcome::Created(_)));
        assert_ne!(fresh.attendance().id, current.id);
    }

    #[tokio::test]
    async fn replayed_update_returns_stored_result() {
        let (db, _dir) = setup_db().await;
        let current = claimed(&db, "l1", "u1").await;
        let mut close = AttendanceUpdate::from_current(&current, HistoryAction::Close, "u1");
        close.status = AttendanceStatus::Closed;
        close.idempotency = Some(IdempotencyToken::new(
            "close-1",
            Operation::Close,
            ReplayTarget::Attendance(current.id.clone()),
            "u1",
        ));

        let UpdateOutcome::Applied(first) = apply_update(&db, close.clone()).await.unwrap() else {
            panic!("expected close to apply");
        };
        let replay = apply_update(&db, close).await.unwrap();
        assert_eq!(replay, UpdateOutcome::Replayed(first));
        assert_eq!(list_history(&db, "t1", &current.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn batch_reports_created_and_existing() {
        let (db, _dir) = setup_db().await;
        create_open(&db, "t1", "l2", None, Priority::Normal)
            .await
            .unwrap();
        let outcomes = ensure_open_batch(
            &db,
            "t1",
            vec!["l1".into(), "l2".into(), "l3".into()],
            Priority::Normal,
        )
        .await
        .unwrap();
        let created: Vec<bool> = outcomes
            .iter()
            .map(|o| matches!(o, EnsureOutcome::Created(_)))
            .collect();
        assert_eq!(created, vec![true, false, true]);
    }

    #[tokio::test]
    async fn filter_by_status_search_and_urgency() {
        let (db, _dir) = setup_db().await;
        let mut lead = attend_core::Lead {
            id: "l1".into(),
            tenant_id: "t1".into(),
            name: "Maria Souza".into(),
            phone: Some("+55 11 90000-1234".into()),
            status: "new".into(),
            tags: vec![],
            created_at: String::new(),
            updated_at: String::new(),
        };
        leads::upsert_lead(&db, &lead).await.unwrap();
        lead.id = "l2".into();
        lead.name = "John 50%_Off".into();
        lead.phone = None;
        leads::upsert_lead(&db, &lead).await.unwrap();

        claimed(&db, "l1", "u1").await;
        create_open(&db, "t1", "l2", None, Priority::High)
            .await
            .unwrap();
        create_open(&db, "t2", "l1", None, Priority::High)
            .await
            .unwrap();

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE attendances SET created_at = '2000-01-01T00:00:00.000Z'
                     WHERE tenant_id = 't1' AND lead_id = 'l2'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let cutoff = "2020-01-01T00:00:00.000Z";
        let all = list_by_filter(&db, "t1", &AttendanceFilter::default(), cutoff, 100)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let by_name = AttendanceFilter {
            search: Some("maria".into()),
            ..AttendanceFilter::default()
        };
        let found = list_by_filter(&db, "t1", &by_name, cutoff, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lead_id, "l1");

        let by_phone = AttendanceFilter {
            search: Some("90000-1234".into()),
            ..AttendanceFilter::default()
        };
        assert_eq!(
            list_by_filter(&db, "t1", &by_phone, cutoff, 100)
                .await
                .unwrap()
                .len(),
            1
        );

        let literal = AttendanceFilter {
            search: Some("50%_".into()),
            ..AttendanceFilter::default()
        };
        let found = list_by_filter(&db, "t1", &literal, cutoff, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lead_id, "l2");

        let urgent = AttendanceFilter {
            urgent: Some(true),
            ..AttendanceFilter::default()
        };
        let found = list_by_filter(&db, "t1", &urgent, cutoff, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lead_id, "l2");

        let open = AttendanceFilter {
            status: Some(AttendanceStatus::InProgress),
            assigned_user_id: Some("u1".into()),
            ..AttendanceFilter::default()
        };
        let found = list_by_filter(&db, "t1", &open, cutoff, 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lead_id, "l1");

        assert_eq!(
            list_by_filter(&db, "t1", &AttendanceFilter::default(), cutoff, 1)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn queue_candidates_follow_membership() {
        let (db, _dir) = setup_db().await;
        let sales = departments::create_department(&db, "t1", "Sales", None)
            .await
            .unwrap();
        let support = departments::create_department(&db, "t1", "Support", None)
            .await
            .unwrap();
        departments::upsert_member(&db, "t1", &sales.id, "u1", attend_core::Role::Agent)
            .await
            .unwrap();

        create_open(&db, "t1", "l1", None, Priority::Normal)
            .await
            .unwrap();
        create_open(&db, "t1", "l2", Some(&sales.id), Priority::Normal)
            .await
            .unwrap();
        create_open(&db, "t1", "l3", Some(&support.id), Priority::Normal)
            .await
            .unwrap();
        claimed(&db, "l4", "u9").await;

        let mut lead_ids: Vec<String> = list_queue_candidates(&db, "t1", "u1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.lead_id)
            .collect();
        lead_ids.sort();
        assert_eq!(lead_ids, vec!["l1", "l2"]);
    }

    #[tokio::test]
    async fn department_with_active_work_cannot_be_deleted() {
        let (db, _dir) = setup_db().await;
        let dept = departments::create_department(&db, "t1", "Sales", None)
            .await
            .unwrap();
        create_open(&db, "t1", "l1", Some(&dept.id), Priority::Normal)
            .await
            .unwrap();
        let err = departments::delete_department(&db, "t1", &dept.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a%b_c"), "%a\\%b\\_c%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
