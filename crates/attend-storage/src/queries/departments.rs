// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Department and membership CRUD.

use attend_core::AttendError;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

use crate::database::{
    Database, TxError, is_constraint_violation, map_tr_err, map_tx_err, now_timestamp,
};
use crate::models::{Department, Membership, Role};
use crate::queries::parse_column;

const DEPARTMENT_COLUMNS: &str = "id, tenant_id, name, description, created_at, updated_at";
const MEMBER_COLUMNS: &str = "tenant_id, department_id, user_id, role, created_at";

fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        tenant_id: row.get(0)?,
        department_id: row.get(1)?,
        user_id: row.get(2)?,
        role: parse_column(row, 3)?,
        created_at: row.get(4)?,
    })
}

fn duplicate_name(name: &str) -> AttendError {
    AttendError::Conflict(format!("department name already in use: {name}"))
}

/// Insert a department. A duplicate name within the tenant is a conflict.
pub async fn create_department(
    db: &Database,
    tenant_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Department, AttendError> {
    let id = uuid::Uuid::new_v4().to_string();
    let tenant_id = tenant_id.to_string();
    let name = name.to_string();
    let description = description.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Department, TxError> {
            let now = now_timestamp();
            let sql = format!(
                "INSERT INTO departments (id, tenant_id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 RETURNING {DEPARTMENT_COLUMNS}"
            );
            match conn.query_row(
                &sql,
                params![id, tenant_id, name, description, now],
                department_from_row,
            ) {
                Ok(department) => Ok(department),
                Err(e) if is_constraint_violation(&e) => Err(duplicate_name(&name).into()),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tx_err)
}

/// Rename and/or re-describe a department. `None` fields are left unchanged.
pub async fn update_department(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Department, AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    let name = name.map(str::to_string);
    let description = description.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Department, TxError> {
            let sql = format!(
                "UPDATE departments SET
                     name = COALESCE(?3, name),
                     description = COALESCE(?4, description),
                     updated_at = ?5
                 WHERE tenant_id = ?1 AND id = ?2
                 RETURNING {DEPARTMENT_COLUMNS}"
            );
            let result = conn
                .query_row(
                    &sql,
                    params![tenant_id, department_id, name, description, now_timestamp()],
                    department_from_row,
                )
                .optional();
            match result {
                Ok(Some(department)) => Ok(department),
                Ok(None) => Err(AttendError::not_found("department", department_id).into()),
                Err(e) if is_constraint_violation(&e) => {
                    Err(duplicate_name(name.as_deref().unwrap_or_default()).into())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tx_err)
}

/// Delete a department and its memberships.
///
/// Refused while any non-closed attendance is routed to it.
pub async fn delete_department(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
) -> Result<(), AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let active: i64 = tx.query_row(
                "SELECT COUNT(*) FROM attendances
                 WHERE tenant_id = ?1 AND department_id = ?2 AND status != 'CLOSED'",
                params![tenant_id, department_id],
                |row| row.get(0),
            )?;
            if active > 0 {
                return Err(AttendError::Conflict(format!(
                    "department {department_id} still has {active} active attendance(s)"
                ))
                .into());
            }
            let deleted = tx.execute(
                "DELETE FROM departments WHERE tenant_id = ?1 AND id = ?2",
                params![tenant_id, department_id],
            )?;
            if deleted == 0 {
                return Err(AttendError::not_found("department", department_id).into());
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tx_err)
}

/// Get a department by id within a tenant.
pub async fn get_department(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
) -> Result<Option<Department>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE tenant_id = ?1 AND id = ?2"
            );
            conn.query_row(&sql, params![tenant_id, department_id], department_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All departments of a tenant ordered by name.
pub async fn list_departments(
    db: &Database,
    tenant_id: &str,
) -> Result<Vec<Department>, AttendError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE tenant_id = ?1 ORDER BY name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tenant_id], department_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Add a member, or change the role of an existing one.
pub async fn upsert_member(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
    user_id: &str,
    role: Role,
) -> Result<Membership, AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Membership, TxError> {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM departments WHERE tenant_id = ?1 AND id = ?2)",
                params![tenant_id, department_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(AttendError::not_found("department", department_id).into());
            }
            let sql = format!(
                "INSERT INTO department_members (department_id, tenant_id, user_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (department_id, user_id) DO UPDATE SET role = excluded.role
                 RETURNING {MEMBER_COLUMNS}"
            );
            let membership = conn.query_row(
                &sql,
                params![
                    department_id,
                    tenant_id,
                    user_id,
                    role.to_string(),
                    now_timestamp()
                ],
                membership_from_row,
            )?;
            Ok(membership)
        })
        .await
        .map_err(map_tx_err)
}

/// Remove a member. Returns whether a membership existed.
pub async fn remove_member(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
    user_id: &str,
) -> Result<bool, AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM department_members
                 WHERE tenant_id = ?1 AND department_id = ?2 AND user_id = ?3",
                params![tenant_id, department_id, user_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Members of a department ordered by user id.
pub async fn list_members(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
) -> Result<Vec<Membership>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM department_members
                 WHERE tenant_id = ?1 AND department_id = ?2 ORDER BY user_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tenant_id, department_id], membership_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// The user's role in a department, if they are a member.
pub async fn member_role(
    db: &Database,
    tenant_id: &str,
    department_id: &str,
    user_id: &str,
) -> Result<Option<Role>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let department_id = department_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT role FROM department_members
                 WHERE tenant_id = ?1 AND department_id = ?2 AND user_id = ?3",
                params![tenant_id, department_id, user_id],
                |row| parse_column::<Role>(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of the departments a user belongs to.
pub async fn departments_for_user(
    db: &Database,
    tenant_id: &str,
    user_id: &str,
) -> Result<Vec<String>, AttendError> {
    let tenant_id = tenant_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT department_id FROM department_members
                 WHERE tenant_id = ?1 AND user_id = ?2 ORDER BY department_id",
            )?;
            let rows = stmt.query_map(params![tenant_id, user_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn duplicate_name_in_same_tenant_conflicts() {
        let (db, _dir) = setup_db().await;
        create_department(&db, "t1", "Sales", None).await.unwrap();
        let err = create_department(&db, "t1", "Sales", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::Conflict(_)), "got {err:?}");
        create_department(&db, "t2", "Sales", None).await.unwrap();
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let (db, _dir) = setup_db().await;
        let dept = create_department(&db, "t1", "Sales", Some("outbound"))
            .await
            .unwrap();
        let updated = update_department(&db, "t1", &dept.id, Some("Revenue"), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Revenue");
        assert_eq!(updated.description.as_deref(), Some("outbound"));

        let missing = update_department(&db, "t1", "nope", Some("x"), None).await;
        assert!(matches!(missing, Err(AttendError::NotFound { .. })));
    }

    #[tokio::test]
    async fn membership_upsert_changes_role_without_duplicating() {
        let (db, _dir) = setup_db().await;
        let dept = create_department(&db, "t1", "Support", None).await.unwrap();
        upsert_member(&db, "t1", &dept.id, "u1", Role::Agent)
            .await
            .unwrap();
        upsert_member(&db, "t1", &dept.id, "u1", Role::Admin)
            .await
            .unwrap();
        let members = list_members(&db, "t1", &dept.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Admin);
        assert_eq!(
            member_role(&db, "t1", &dept.id, "u1").await.unwrap(),
            Some(Role::Admin)
        );
        assert_eq!(
            departments_for_user(&db, "t1", "u1").await.unwrap(),
            vec![dept.id.clone()]
        );
    }

    #[tokio::test]
    async fn remove_member_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let dept = create_department(&db, "t1", "Support", None).await.unwrap();
        upsert_member(&db, "t1", &dept.id, "u1", Role::Agent)
            .await
            .unwrap();
        assert!(remove_member(&db, "t1", &dept.id, "u1").await.unwrap());
        assert!(!remove_member(&db, "t1", &dept.id, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn member_of_unknown_department_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = upsert_member(&db, "t1", "missing", "u1", Role::Agent)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_cascades_memberships() {
        let (db, _dir) = setup_db().await;
        let dept = create_department(&db, "t1", "Support", None).await.unwrap();
        upsert_member(&db, "t1", &dept.id, "u1", Role::Agent)
            .await
            .unwrap();
        delete_department(&db, "t1", &dept.id).await.unwrap();
        assert!(get_department(&db, "t1", &dept.id).await.unwrap().is_none());
        assert!(departments_for_user(&db, "t1", "u1").await.unwrap().is_empty());

        let again = delete_department(&db, "t1", &dept.id).await;
        assert!(matches!(again, Err(AttendError::NotFound { .. })));
    }
}
