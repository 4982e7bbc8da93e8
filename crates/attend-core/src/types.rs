// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the routing engine, and the gateway.
//!
//! Timestamps are ISO-8601 UTC strings with millisecond precision
//! (`2026-01-01T00:00:00.000Z`) so they compare lexicographically in SQL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Events,
    Gateway,
}

/// Role of a user, both at tenant level and inside a department.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Agent,
}

/// Already-authenticated caller identity. The engine never authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: String,
    pub user_id: String,
    pub role: Role,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Attendance lifecycle state.
///
/// `Open -> InProgress -> (Transferred ->) InProgress -> Closed`. A closed
/// attendance is never mutated again; reopening creates a fresh one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Open,
    InProgress,
    Transferred,
    Closed,
}

impl AttendanceStatus {
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }

    /// States in which an owner holds the attendance.
    pub fn is_owned(self) -> bool {
        matches!(self, Self::InProgress | Self::Transferred)
    }
}

/// Attendance priority. Variant order defines ranking order (`High` is greatest).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// How a transfer with a target user lands.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// The target user owns the attendance immediately (IN_PROGRESS).
    #[default]
    Push,
    /// The attendance waits in TRANSFERRED until the target user accepts it.
    Accept,
}

/// One open work episode for a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: String,
    pub tenant_id: String,
    pub lead_id: String,
    pub status: AttendanceStatus,
    pub priority: Priority,
    pub assigned_user_id: Option<String>,
    pub department_id: Option<String>,
    /// Derived at read time from the SLA threshold; never authoritative in storage.
    pub urgent: bool,
    pub claimed_at: Option<String>,
    pub last_transferred_at: Option<String>,
    pub closed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Bumped by every write; used for compare-and-swap updates.
    pub version: i64,
}

/// Kind of transition recorded in an attendance's history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Claim,
    Transfer,
    Accept,
    Close,
    Priority,
}

/// An append-only history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub attendance_id: String,
    pub tenant_id: String,
    pub action: HistoryAction,
    pub from_status: Option<AttendanceStatus>,
    pub to_status: AttendanceStatus,
    pub actor_user_id: String,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub from_department_id: Option<String>,
    pub to_department_id: Option<String>,
    pub from_priority: Option<Priority>,
    pub to_priority: Option<Priority>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// An attendance together with its full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceDetails {
    pub attendance: Attendance,
    pub history: Vec<HistoryEntry>,
}

/// Named group of agents that scopes queue eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A user's membership in a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub tenant_id: String,
    pub department_id: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: String,
}

/// A customer contact, owned by the ingestion side and only referenced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    /// Free-form tenant status (e.g. "new", "qualified", "won").
    pub status: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Filters for listing attendances. All fields are optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceFilter {
    pub status: Option<AttendanceStatus>,
    pub priority: Option<Priority>,
    pub department_id: Option<String>,
    pub assigned_user_id: Option<String>,
    pub urgent: Option<bool>,
    /// Case-insensitive substring over attendance id, lead id, lead name and phone.
    pub search: Option<String>,
}

/// Open-work count for one department (`None` = no department).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCount {
    pub department_id: Option<String>,
    pub count: i64,
}

/// Aggregate counts for dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    /// Non-closed attendances grouped by department.
    pub by_department: Vec<DepartmentCount>,
    /// Open attendances waiting longer than the SLA threshold.
    pub urgent: i64,
}

/// Outcome of a lead/attendance reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub total_leads: u64,
    pub existing_attendances: u64,
    pub created_attendances: u64,
    pub skipped_terminal: u64,
}

impl SyncReport {
    pub fn merge(&mut self, other: SyncReport) {
        self.total_leads += other.total_leads;
        self.existing_attendances += other.existing_attendances;
        self.created_attendances += other.created_attendances;
        self.skipped_terminal += other.skipped_terminal;
    }
}

/// Transfer command payload. At least one target must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRequest {
    pub target_user_id: Option<String>,
    pub target_department_id: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
}

/// Close command payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloseRequest {
    pub notes: Option<String>,
}

/// Lifecycle event kinds published to connected clients.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum EventType {
    #[strum(serialize = "attendance.new")]
    #[serde(rename = "attendance.new")]
    New,
    #[strum(serialize = "attendance.claimed")]
    #[serde(rename = "attendance.claimed")]
    Claimed,
    #[strum(serialize = "attendance.updated")]
    #[serde(rename = "attendance.updated")]
    Updated,
    #[strum(serialize = "attendance.transferred")]
    #[serde(rename = "attendance.transferred")]
    Transferred,
}

/// A tenant-scoped lifecycle event carrying the full resulting attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub tenant_id: String,
    pub actor_user_id: Option<String>,
    pub attendance: Attendance,
    pub occurred_at: String,
}
