// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only attendance history.
//!
//! There is no update or delete path here; the schema triggers reject both.

use attend_core::AttendError;
use rusqlite::{Connection, Row, params};

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::models::{Attendance, HistoryAction, HistoryEntry};
use crate::queries::{parse_column, parse_optional_column};

const HISTORY_COLUMNS: &str = "id, attendance_id, tenant_id, action, from_status, to_status, \
     actor_user_id, from_user_id, to_user_id, from_department_id, to_department_id, \
     from_priority, to_priority, notes, created_at";

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        attendance_id: row.get(1)?,
        tenant_id: row.get(2)?,
        action: parse_column(row, 3)?,
        from_status: parse_optional_column(row, 4)?,
        to_status: parse_column(row, 5)?,
        actor_user_id: row.get(6)?,
        from_user_id: row.get(7)?,
        to_user_id: row.get(8)?,
        from_department_id: row.get(9)?,
        to_department_id: row.get(10)?,
        from_priority: parse_optional_column(row, 11)?,
        to_priority: parse_optional_column(row, 12)?,
        notes: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// Append one entry describing the move from `before` to `after`.
///
/// Must run inside the transaction that performed the move.
pub(crate) fn append_transition(
    conn: &Connection,
    before: &Attendance,
    after: &Attendance,
    action: HistoryAction,
    actor_user_id: &str,
    notes: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO attendance_history (
             attendance_id, tenant_id, action, from_status, to_status, actor_user_id,
             from_user_id, to_user_id, from_department_id, to_department_id,
             from_priority, to_priority, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            after.id,
            after.tenant_id,
            action.to_string(),
            before.status.to_string(),
            after.status.to_string(),
            actor_user_id,
            before.assigned_user_id,
            after.assigned_user_id,
            before.department_id,
            after.department_id,
            before.priority.to_string(),
            after.priority.to_string(),
            notes,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

/// Full history of an attendance in insertion order.
pub async fn list_history(
    db: &Database,
    tenant_id: &str,
    attendance_id: &str,
) -> Result<Vec<HistoryEntry>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let attendance_id = attendance_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {HISTORY_COLUMNS} FROM attendance_history
                 WHERE tenant_id = ?1 AND attendance_id = ?2 ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tenant_id, attendance_id], history_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
