// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Department registry: admin-managed groups that scope queue eligibility.

use async_trait::async_trait;
use tracing::info;

use attend_core::{
    AttendError, Department, DepartmentDirectory, Membership, Role, TenantContext,
};
use attend_storage::Database;
use attend_storage::queries::departments;

/// Department CRUD with tenant-admin authorization.
///
/// Membership changes use plain read-then-write semantics; the last writer
/// wins.
#[derive(Clone)]
pub struct DepartmentRegistry {
    db: Database,
}

impl DepartmentRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn require_admin(ctx: &TenantContext, action: &str) -> Result<(), AttendError> {
        if ctx.is_admin() {
            Ok(())
        } else {
            Err(AttendError::Forbidden(format!(
                "only tenant admins can {action}"
            )))
        }
    }

    fn clean_name(name: &str) -> Result<&str, AttendError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendError::InvalidArgument(
                "department name must not be empty".into(),
            ));
        }
        Ok(name)
    }

    async fn require_department(
        &self,
        tenant_id: &str,
        department_id: &str,
    ) -> Result<Department, AttendError> {
        self.get(tenant_id, department_id)
            .await?
            .ok_or_else(|| AttendError::not_found("department", department_id))
    }

    pub async fn create(
        &self,
        ctx: &TenantContext,
        name: &str,
        description: Option<&str>,
    ) -> Result<Department, AttendError> {
        Self::require_admin(ctx, "create departments")?;
        let name = Self::clean_name(name)?;
        let department =
            departments::create_department(&self.db, &ctx.tenant_id, name, description).await?;
        info!(tenant_id = %ctx.tenant_id, department_id = %department.id, name, "department created");
        Ok(department)
    }

    pub async fn update(
        &self,
        ctx: &TenantContext,
        department_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Department, AttendError> {
        Self::require_admin(ctx, "update departments")?;
        let name = name.map(Self::clean_name).transpose()?;
        departments::update_department(&self.db, &ctx.tenant_id, department_id, name, description)
            .await
    }

    /// Delete a department. Refused while it still has active attendances.
    pub async fn delete(&self, ctx: &TenantContext, department_id: &str) -> Result<(), AttendError> {
        Self::require_admin(ctx, "delete departments")?;
        departments::delete_department(&self.db, &ctx.tenant_id, department_id).await?;
        info!(tenant_id = %ctx.tenant_id, department_id, "department deleted");
        Ok(())
    }

    pub async fn get(
        &self,
        tenant_id: &str,
        department_id: &str,
    ) -> Result<Option<Department>, AttendError> {
        departments::get_department(&self.db, tenant_id, department_id).await
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<Department>, AttendError> {
        departments::list_departments(&self.db, tenant_id).await
    }

    /// Add a member, or change an existing member's role.
    pub async fn add_member(
        &self,
        ctx: &TenantContext,
        department_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<Membership, AttendError> {
        Self::require_admin(ctx, "manage department members")?;
        if user_id.trim().is_empty() {
            return Err(AttendError::InvalidArgument("user id must not be empty".into()));
        }
        departments::upsert_member(&self.db, &ctx.tenant_id, department_id, user_id, role).await
    }

    /// Remove a member. Removing a non-member succeeds.
    pub async fn remove_member(
        &self,
        ctx: &TenantContext,
        department_id: &str,
        user_id: &str,
    ) -> Result<(), AttendError> {
        Self::require_admin(ctx, "manage department members")?;
        self.require_department(&ctx.tenant_id, department_id).await?;
        departments::remove_member(&self.db, &ctx.tenant_id, department_id, user_id).await?;
        Ok(())
    }

    pub async fn list_members(
        &self,
        tenant_id: &str,
        department_id: &str,
    ) -> Result<Vec<Membership>, AttendError> {
        self.require_department(tenant_id, department_id).await?;
        departments::list_members(&self.db, tenant_id, department_id).await
    }

    /// The user's role in the department, if a member.
    pub async fn member_role(
        &self,
        tenant_id: &str,
        department_id: &str,
        user_id: &str,
    ) -> Result<Option<Role>, AttendError> {
        departments::member_role(&self.db, tenant_id, department_id, user_id).await
    }
}

#[async_trait]
impl DepartmentDirectory for DepartmentRegistry {
    async fn is_member(
        &self,
        tenant_id: &str,
        department_id: &str,
        user_id: &str,
    ) -> Result<bool, AttendError> {
        Ok(self
            .member_role(tenant_id, department_id, user_id)
            .await?
            .is_some())
    }

    async fn list_departments(&self, tenant_id: &str) -> Result<Vec<Department>, AttendError> {
        self.list(tenant_id).await
    }

    async fn departments_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, AttendError> {
        departments::departments_for_user(&self.db, tenant_id, user_id).await
    }
}
