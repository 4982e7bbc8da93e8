// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attendance routing: claiming, transfers, closing, the smart queue, and
//! lead/attendance reconciliation.
//!
//! [`RoutingEngine`] is the single entry point for every state-changing
//! command. It authorizes the caller, delegates the guarded write to
//! `attend-storage`, and publishes the resulting event.

pub mod departments;
pub mod engine;
pub mod ranker;
pub mod retry;
pub mod sync;

pub use departments::DepartmentRegistry;
pub use engine::{EngineSettings, RoutingEngine};
pub use ranker::{RankedQueue, SlaPolicy, queue_order};
pub use retry::RetryPolicy;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use attend_core::Lead;
    use attend_storage::database::now_timestamp;
    use attend_storage::queries::leads;
    use attend_storage::{Database, SqliteLeadDirectory};
    use attend_test_utils::RecordingPublisher;
    use tempfile::TempDir;

    use crate::engine::{EngineSettings, RoutingEngine};
    use crate::retry::RetryPolicy;

    /// Open a migrated database in a fresh temp directory.
    pub async fn setup_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub fn test_settings() -> EngineSettings {
        EngineSettings {
            sync_batch_size: 3,
            retry: RetryPolicy::none(),
            ..EngineSettings::default()
        }
    }

    pub async fn engine_with(
        settings: EngineSettings,
    ) -> (RoutingEngine, Arc<RecordingPublisher>, Database, TempDir) {
        let (db, dir) = setup_db().await;
        let recorder = Arc::new(RecordingPublisher::new());
        let engine = RoutingEngine::new(
            db.clone(),
            Arc::new(SqliteLeadDirectory::new(db.clone())),
            recorder.clone(),
            settings,
        );
        (engine, recorder, db, dir)
    }

    pub async fn engine_with_recorder() -> (RoutingEngine, Arc<RecordingPublisher>, Database, TempDir) {
        engine_with(test_settings()).await
    }

    pub async fn lead(db: &Database, tenant_id: &str, lead_id: &str, status: &str) -> Lead {
        let now = now_timestamp();
        leads::upsert_lead(
            db,
            &Lead {
                id: lead_id.to_string(),
                tenant_id: tenant_id.to_string(),
                name: format!("Lead {lead_id}"),
                phone: None,
                status: status.to_string(),
                tags: Vec::new(),
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .await
        .unwrap()
    }
}
