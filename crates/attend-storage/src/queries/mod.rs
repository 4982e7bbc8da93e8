// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes `&Database` and runs on the
//! connection's background thread.

pub mod attendances;
pub mod departments;
pub mod history;
pub mod idempotency;
pub mod leads;
pub mod stats;

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

use crate::models::Attendance;

/// Column list matching [`attendance_from_row`].
pub(crate) const ATTENDANCE_COLUMNS: &str = "id, tenant_id, lead_id, status, priority, \
     assigned_user_id, department_id, claimed_at, last_transferred_at, closed_at, \
     created_at, updated_at, version";

/// Same columns, qualified with the `a.` alias for joined queries.
pub(crate) const ATTENDANCE_COLUMNS_A: &str = "a.id, a.tenant_id, a.lead_id, a.status, \
     a.priority, a.assigned_user_id, a.department_id, a.claimed_at, a.last_transferred_at, \
     a.closed_at, a.created_at, a.updated_at, a.version";

/// Parse a TEXT column into a strum enum.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a nullable TEXT column into an optional strum enum.
pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Map a row selected with [`ATTENDANCE_COLUMNS`]. `urgent` is derived later.
pub(crate) fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<Attendance> {
    Ok(Attendance {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        lead_id: row.get(2)?,
        status: parse_column(row, 3)?,
        priority: parse_column(row, 4)?,
        assigned_user_id: row.get(5)?,
        department_id: row.get(6)?,
        urgent: false,
        claimed_at: row.get(7)?,
        last_transferred_at: row.get(8)?,
        closed_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        version: row.get(12)?,
    })
}
