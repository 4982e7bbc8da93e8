// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate attendance counts for dashboards.

use std::collections::BTreeMap;

use attend_core::AttendError;
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::models::{AttendanceStats, DepartmentCount};

fn grouped_counts(
    conn: &Connection,
    sql: &str,
    tenant_id: &str,
) -> rusqlite::Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![tenant_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

/// Counts by status, priority and department, plus urgent open work.
pub async fn stats(
    db: &Database,
    tenant_id: &str,
    urgent_cutoff: &str,
) -> Result<AttendanceStats, AttendError> {
    let tenant_id = tenant_id.to_string();
    let urgent_cutoff = urgent_cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let by_status = grouped_counts(
                conn,
                "SELECT status, COUNT(*) FROM attendances WHERE tenant_id = ?1 GROUP BY status",
                &tenant_id,
            )?;
            let by_priority = grouped_counts(
                conn,
                "SELECT priority, COUNT(*) FROM attendances WHERE tenant_id = ?1 GROUP BY priority",
                &tenant_id,
            )?;

            let mut stmt = conn.prepare(
                "SELECT department_id, COUNT(*) FROM attendances
                 WHERE tenant_id = ?1 AND status != 'CLOSED'
                 GROUP BY department_id ORDER BY department_id",
            )?;
            let by_department = stmt
                .query_map(params![tenant_id], |row| {
                    Ok(DepartmentCount {
                        department_id: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let urgent: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attendances
                 WHERE tenant_id = ?1 AND status != 'CLOSED' AND created_at < ?2",
                params![tenant_id, urgent_cutoff],
                |row| row.get(0),
            )?;

            Ok(AttendanceStats {
                total: by_status.values().sum(),
                by_status,
                by_priority,
                by_department,
                urgent,
            })
        })
        .await
        .map_err(map_tr_err)
}
