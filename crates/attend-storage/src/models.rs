// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage commands and outcomes.
//!
//! Domain types are defined in `attend-core` and re-exported here for
//! convenience. The types below describe a single transactional write and
//! what happened when the store tried to apply it.

pub use attend_core::types::{
    Attendance, AttendanceFilter, AttendanceStats, AttendanceStatus, Department, DepartmentCount,
    HistoryAction, HistoryEntry, Lead, Membership, Priority, Role,
};
use strum::{Display, EnumString};

/// The mutation an idempotency key was first used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Claim,
    Transfer,
    Accept,
    Close,
    Priority,
}

/// What a keyed command acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayTarget {
    /// An existing attendance, by id.
    Attendance(String),
    /// The open attendance of a lead, by lead id (claims).
    Lead(String),
}

impl ReplayTarget {
    /// Whether a stored result was produced for this target.
    pub fn matches(&self, stored: &Attendance) -> bool {
        match self {
            ReplayTarget::Attendance(id) => stored.id == *id,
            ReplayTarget::Lead(lead_id) => stored.lead_id == *lead_id,
        }
    }
}

/// Caller-supplied key that makes a mutation safe to retry.
///
/// A stored result is only replayed for the same operation, target and actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyToken {
    pub key: String,
    pub operation: Operation,
    pub target: ReplayTarget,
    pub actor_user_id: String,
}

impl IdempotencyToken {
    pub fn new(
        key: impl Into<String>,
        operation: Operation,
        target: ReplayTarget,
        actor_user_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            operation,
            target,
            actor_user_id: actor_user_id.into(),
        }
    }
}

/// Timestamp column stamped with "now" by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Claimed,
    Transferred,
    Closed,
}

/// A compare-and-swap update of one attendance plus its history entry.
///
/// Applied only if the stored row still has `expected_version`.
#[derive(Debug, Clone)]
pub struct AttendanceUpdate {
    pub tenant_id: String,
    pub attendance_id: String,
    pub expected_version: i64,
    pub status: AttendanceStatus,
    pub assigned_user_id: Option<String>,
    pub department_id: Option<String>,
    pub priority: Priority,
    pub stamp: Option<Stamp>,
    pub action: HistoryAction,
    pub actor_user_id: String,
    pub notes: Option<String>,
    /// Department that must still exist when the update commits.
    pub require_department: Option<String>,
    pub idempotency: Option<IdempotencyToken>,
}

impl AttendanceUpdate {
    /// Start an update from the current row, keeping every field as is.
    pub fn from_current(
        current: &Attendance,
        action: HistoryAction,
        actor_user_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: current.tenant_id.clone(),
            attendance_id: current.id.clone(),
            expected_version: current.version,
            status: current.status,
            assigned_user_id: current.assigned_user_id.clone(),
            department_id: current.department_id.clone(),
            priority: current.priority,
            stamp: None,
            action,
            actor_user_id: actor_user_id.into(),
            notes: None,
            require_department: None,
            idempotency: None,
        }
    }
}

/// Result of [`apply_update`](crate::queries::attendances::apply_update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update committed; carries the new row.
    Applied(Attendance),
    /// Another writer got there first; carries the current row.
    Stale(Attendance),
    /// The idempotency key was already used; carries the stored result.
    Replayed(Attendance),
}

/// An atomic resolve-or-create-then-claim for one lead.
#[derive(Debug, Clone)]
pub struct ClaimCommand {
    pub tenant_id: String,
    pub lead_id: String,
    /// Must belong to the attendance's department, if it has one. Checked
    /// inside the claim transaction.
    pub user_id: String,
    pub default_priority: Priority,
    pub notes: Option<String>,
    pub idempotency: Option<IdempotencyToken>,
}

/// Result of [`claim_open`](crate::queries::attendances::claim_open).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now owns the attendance. `created` is set when the
    /// attendance did not exist before this claim.
    Claimed { attendance: Attendance, created: bool },
    /// The attendance is no longer open.
    AlreadyClaimed(Attendance),
    /// The attendance is routed to a department the caller is not in.
    NotEligible(Attendance),
    /// The idempotency key was already used; carries the stored result.
    Replayed(Attendance),
}

/// Result of creating an attendance for a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created(Attendance),
    Existing(Attendance),
}

impl EnsureOutcome {
    pub fn attendance(&self) -> &Attendance {
        match self {
            EnsureOutcome::Created(a) | EnsureOutcome::Existing(a) => a,
        }
    }
}
