// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead mirror operations.
//!
//! Leads are written by the ingestion hook and read by the synchronizer and
//! the claim path. Nothing here touches attendances.

use attend_core::AttendError;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, TxError, map_tr_err, map_tx_err};
use crate::models::Lead;

const LEAD_COLUMNS: &str = "id, tenant_id, name, phone, status, tags, created_at, updated_at";

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    let tags: String = row.get(5)?;
    let tags: Vec<String> = serde_json::from_str(&tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Lead {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        status: row.get(4)?,
        tags,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a lead or update its mutable fields, keeping `created_at`.
pub async fn upsert_lead(db: &Database, lead: &Lead) -> Result<Lead, AttendError> {
    let lead = lead.clone();
    db.connection()
        .call(move |conn| -> Result<Lead, TxError> {
            let tags = serde_json::to_string(&lead.tags)?;
            let sql = format!(
                "INSERT INTO leads (id, tenant_id, name, phone, status, tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT (tenant_id, id) DO UPDATE SET
                     name = excluded.name,
                     phone = excluded.phone,
                     status = excluded.status,
                     tags = excluded.tags,
                     updated_at = excluded.updated_at
                 RETURNING {LEAD_COLUMNS}"
            );
            let stored = conn.query_row(
                &sql,
                params![
                    lead.id,
                    lead.tenant_id,
                    lead.name,
                    lead.phone,
                    lead.status,
                    tags,
                    crate::database::now_timestamp(),
                ],
                lead_from_row,
            )?;
            Ok(stored)
        })
        .await
        .map_err(map_tx_err)
}

/// Get a lead by id within a tenant.
pub async fn get_lead(
    db: &Database,
    tenant_id: &str,
    lead_id: &str,
) -> Result<Option<Lead>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE tenant_id = ?1 AND id = ?2");
            conn.query_row(&sql, params![tenant_id, lead_id], lead_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// One page of a tenant's leads ordered by id, strictly after `after`.
pub async fn list_leads(
    db: &Database,
    tenant_id: &str,
    after: Option<&str>,
    limit: usize,
) -> Result<Vec<Lead>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let after = after.map(str::to_string);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {LEAD_COLUMNS} FROM leads
                 WHERE tenant_id = ?1 AND (?2 IS NULL OR id > ?2)
                 ORDER BY id ASC LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tenant_id, after, limit], lead_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Every tenant with at least one lead.
pub async fn list_tenants(db: &Database) -> Result<Vec<String>, AttendError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT tenant_id FROM leads ORDER BY tenant_id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
