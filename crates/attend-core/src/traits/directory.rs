// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only lookups into collaborators the engine references but does not own.

use async_trait::async_trait;

use crate::error::AttendError;
use crate::types::{Department, Lead};

/// Lead lookup. The engine never writes leads.
#[async_trait]
pub trait LeadDirectory: Send + Sync {
    /// Returns the lead if it exists in the tenant.
    async fn get_lead(&self, tenant_id: &str, lead_id: &str) -> Result<Option<Lead>, AttendError>;

    /// Returns up to `limit` leads ordered by id, strictly after `after` when given.
    async fn list_leads(
        &self,
        tenant_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Lead>, AttendError>;

    /// Returns every tenant that has at least one lead.
    async fn list_tenants(&self) -> Result<Vec<String>, AttendError>;
}

/// Department membership lookups used for routing decisions.
#[async_trait]
pub trait DepartmentDirectory: Send + Sync {
    /// Whether `user_id` belongs to the department (any role).
    async fn is_member(
        &self,
        tenant_id: &str,
        department_id: &str,
        user_id: &str,
    ) -> Result<bool, AttendError>;

    /// All departments of a tenant, ordered by name.
    async fn list_departments(&self, tenant_id: &str) -> Result<Vec<Department>, AttendError>;

    /// Ids of the departments the user belongs to.
    async fn departments_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, AttendError>;
}
