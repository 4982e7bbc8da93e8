// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use attend_config::model::StorageConfig;
use attend_core::{AdapterType, AttendError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{Database, map_tr_err};

/// SQLite-backed storage adapter.
///
/// The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`]; query modules then take the
/// [`Database`] handle returned by [`SqliteStorage::database`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The opened database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, AttendError> {
        self.db.get().ok_or_else(|| AttendError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), AttendError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AttendError> {
        let db = match self.database() {
            Ok(db) => db,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        let integrity = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA quick_check", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)?;
        if integrity == "ok" {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!("quick_check: {integrity}")))
        }
    }

    async fn shutdown(&self) -> Result<(), AttendError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), AttendError> {
        let db = Database::open_with(&self.config).await?;
        self.db.set(db).map_err(|_| AttendError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AttendError> {
        let db = self.database()?;
        Self::checkpoint(db).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
