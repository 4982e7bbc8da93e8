// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`LeadDirectory`] backed by the mirrored `leads` table.

use async_trait::async_trait;

use attend_core::{AttendError, Lead, LeadDirectory};

use crate::database::Database;
use crate::queries::leads;

/// Reads leads written by the ingestion hook.
#[derive(Clone)]
pub struct SqliteLeadDirectory {
    db: Database,
}

impl SqliteLeadDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LeadDirectory for SqliteLeadDirectory {
    async fn get_lead(&self, tenant_id: &str, lead_id: &str) -> Result<Option<Lead>, AttendError> {
        leads::get_lead(&self.db, tenant_id, lead_id).await
    }

    async fn list_leads(
        &self,
        tenant_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Lead>, AttendError> {
        leads::list_leads(&self.db, tenant_id, after, limit).await
    }

    async fn list_tenants(&self) -> Result<Vec<String>, AttendError> {
        leads::list_tenants(&self.db).await
    }
}
