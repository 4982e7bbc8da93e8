// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Every multi-statement mutation runs inside one `IMMEDIATE` transaction on
//! that thread, so a check and the write that depends on it never interleave
//! with another writer.

use attend_config::model::StorageConfig;
use attend_core::AttendError;
use rusqlite::ErrorCode;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` with default settings and run migrations.
    pub async fn open(path: &str) -> Result<Self, AttendError> {
        Self::open_with(&StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        })
        .await
    }

    /// Open the database described by `config`, apply PRAGMAs, and run migrations.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, AttendError> {
        let conn = tokio_rusqlite::Connection::open(&config.database_path)
            .await
            .map_err(|e| AttendError::Storage {
                source: Box::new(e),
            })?;

        let journal = if config.wal_mode { "WAL" } else { "DELETE" };
        let pragmas = format!(
            "PRAGMA journal_mode = {journal};
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = {};",
            config.busy_timeout_ms
        );

        conn.call(move |conn| -> Result<(), TxError> {
            conn.execute_batch(&pragmas)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tx_err)?;

        debug!(path = %config.database_path, journal, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), AttendError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| AttendError::Storage {
            source: Box::new(e),
        })
    }
}

/// Error type for closures that mix SQL failures with domain rejections.
///
/// Returning a domain error from inside a transaction closure drops the
/// transaction, which rolls it back.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    #[error(transparent)]
    Domain(#[from] AttendError),
}

impl From<serde_json::Error> for TxError {
    fn from(e: serde_json::Error) -> Self {
        TxError::Domain(AttendError::Storage {
            source: Box::new(e),
        })
    }
}

/// Classify a rusqlite error. Lock contention is transient; everything else is a storage failure.
pub fn sql_err(e: rusqlite::Error) -> AttendError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => AttendError::Transient {
            source: Box::new(e),
        },
        _ => AttendError::Storage {
            source: Box::new(e),
        },
    }
}

/// Convert a tokio-rusqlite error from a plain SQL closure into an `AttendError`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> AttendError {
    match e {
        tokio_rusqlite::Error::Error(inner) => sql_err(inner),
        other => AttendError::Storage {
            source: Box::new(other),
        },
    }
}

/// Convert a tokio-rusqlite error from a transactional closure into an `AttendError`.
pub fn map_tx_err(e: tokio_rusqlite::Error<TxError>) -> AttendError {
    match e {
        tokio_rusqlite::Error::Error(TxError::Domain(inner)) => inner,
        tokio_rusqlite::Error::Error(TxError::Sql(inner)) => sql_err(inner),
        other => AttendError::Storage {
            source: Box::new(other),
        },
    }
}

/// Whether a rusqlite error is a constraint violation (unique, check, foreign key).
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

/// Current UTC time in the storage timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// UTC timestamp `minutes` before now, in the storage timestamp format.
pub fn timestamp_minutes_ago(minutes: u64) -> String {
    let minutes = i64::try_from(minutes).unwrap_or(i64::MAX / 60_000);
    (chrono::Utc::now() - chrono::Duration::minutes(minutes))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
