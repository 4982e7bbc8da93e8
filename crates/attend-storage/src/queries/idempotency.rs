// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency records for retried mutations.
//!
//! A record is written in the same transaction as the mutation it describes,
//! so a key is either absent or points at a committed result.

use attend_core::AttendError;
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, TxError, map_tr_err, map_tx_err, now_timestamp};
use crate::models::{Attendance, IdempotencyToken};

/// Look up a previously stored result for `token`.
///
/// A key first used for a different operation, attendance, lead or user is
/// a conflict: the stored result belongs to another command.
pub(crate) fn lookup(
    conn: &Connection,
    tenant_id: &str,
    token: &IdempotencyToken,
) -> Result<Option<Attendance>, TxError> {
    let stored = conn
        .query_row(
            "SELECT operation, actor_user_id, response FROM idempotency_keys
             WHERE tenant_id = ?1 AND idempotency_key = ?2",
            params![tenant_id, token.key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((operation, actor, response)) = stored else {
        return Ok(None);
    };
    if operation != token.operation.to_string() {
        return Err(AttendError::Conflict(format!(
            "idempotency key {} was already used for {operation}",
            token.key
        ))
        .into());
    }
    let result: Attendance = serde_json::from_str(&response)?;
    if !token.target.matches(&result) {
        return Err(AttendError::Conflict(
            "idempotency key already used for another attendance".into(),
        )
        .into());
    }
    if actor.is_some_and(|actor| actor != token.actor_user_id) {
        return Err(
            AttendError::Conflict("idempotency key already used by another user".into()).into(),
        );
    }
    Ok(Some(result))
}

/// Store the result of a committed mutation under `token`.
pub(crate) fn record(
    conn: &Connection,
    tenant_id: &str,
    token: &IdempotencyToken,
    result: &Attendance,
) -> Result<(), TxError> {
    let response = serde_json::to_string(result)?;
    conn.execute(
        "INSERT INTO idempotency_keys
             (tenant_id, idempotency_key, operation, attendance_id, actor_user_id,
              response, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            tenant_id,
            token.key,
            token.operation.to_string(),
            result.id,
            token.actor_user_id,
            response,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

/// Stored result for `token`, checked before a caller validates a retried command.
pub async fn find(
    db: &Database,
    tenant_id: &str,
    token: &IdempotencyToken,
) -> Result<Option<Attendance>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let token = token.clone();
    db.connection()
        .call(move |conn| lookup(conn, &tenant_id, &token))
        .await
        .map_err(map_tx_err)
}

/// Delete records created before `cutoff`. Returns how many were removed.
pub async fn prune(db: &Database, cutoff: &str) -> Result<usize, AttendError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM idempotency_keys WHERE created_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}
