// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles a complete routing stack over a temp SQLite
//! database: storage adapter, lead directory, engine, and an event
//! recorder. Seeding helpers cover the collaborators the engine only reads.

use std::sync::Arc;

use attend_config::AttendConfig;
use attend_core::{
    AttendError, Department, Lead, Priority, Role, StorageAdapter, TenantContext, TransferMode,
};
use attend_routing::{EngineSettings, RoutingEngine};
use attend_storage::database::now_timestamp;
use attend_storage::queries::{attendances, leads};
use attend_storage::{Database, EnsureOutcome, SqliteLeadDirectory, SqliteStorage};

use crate::recording::RecordingPublisher;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: AttendConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = AttendConfig::default();
        // Tests rely on deterministic failures; the concurrency tests opt back in.
        config.engine.transient_retries = 0;
        Self { config }
    }

    /// Minutes an open attendance may wait before it is urgent.
    pub fn with_sla_minutes(mut self, minutes: u64) -> Self {
        self.config.queue.sla_minutes = minutes;
        self
    }

    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.config.routing.transfer_mode = mode;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.config.engine.transient_retries = retries;
        self
    }

    pub fn with_sync_batch_size(mut self, batch_size: usize) -> Self {
        self.config.sync.batch_size = batch_size;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.config.queue.max_page_size = max_page_size;
        self
    }

    /// Build the harness, creating a fresh database in a temp directory.
    pub async fn build(mut self) -> Result<TestHarness, AttendError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| AttendError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage.database_path = db_path.to_string_lossy().to_string();

        let storage = SqliteStorage::new(self.config.storage.clone());
        storage.initialize().await?;
        let db = storage.database()?.clone();

        let events = Arc::new(RecordingPublisher::new());
        let engine = RoutingEngine::new(
            db.clone(),
            Arc::new(SqliteLeadDirectory::new(db.clone())),
            events.clone(),
            EngineSettings::from_config(&self.config),
        );

        Ok(TestHarness {
            engine,
            events,
            storage: Arc::new(storage),
            db,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete routing stack over temp storage.
pub struct TestHarness {
    /// The engine under test.
    pub engine: RoutingEngine,
    /// Every event the engine published.
    pub events: Arc<RecordingPublisher>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Shared connection, for direct store access in assertions.
    pub db: Database,
    pub config: AttendConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, AttendError> {
        Self::builder().build().await
    }

    pub fn agent(tenant_id: &str, user_id: &str) -> TenantContext {
        TenantContext::new(tenant_id, user_id, Role::Agent)
    }

    pub fn admin(tenant_id: &str, user_id: &str) -> TenantContext {
        TenantContext::new(tenant_id, user_id, Role::Admin)
    }

    /// Insert or update a lead in the mirrored lead table.
    pub async fn seed_lead(
        &self,
        tenant_id: &str,
        lead_id: &str,
        status: &str,
    ) -> Result<Lead, AttendError> {
        let now = now_timestamp();
        leads::upsert_lead(
            &self.db,
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
    }

    /// Create a department and add `members` with the given roles.
    pub async fn seed_department(
        &self,
        tenant_id: &str,
        name: &str,
        members: &[(&str, Role)],
    ) -> Result<Department, AttendError> {
        let admin = Self::admin(tenant_id, "harness-admin");
        let registry = self.engine.departments();
        let department = registry.create(&admin, name, None).await?;
        for (user_id, role) in members {
            registry
                .add_member(&admin, &department.id, user_id, *role)
                .await?;
        }
        Ok(department)
    }

    /// Open an attendance for a lead, optionally routed to a department.
    pub async fn seed_open_attendance(
        &self,
        tenant_id: &str,
        lead_id: &str,
        department_id: Option<&str>,
        priority: Priority,
    ) -> Result<attend_core::Attendance, AttendError> {
        let outcome =
            attendances::create_open(&self.db, tenant_id, lead_id, department_id, priority)
                .await?;
        Ok(match outcome {
            EnsureOutcome::Created(a) | EnsureOutcome::Existing(a) => a,
        })
    }
}
