// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Attend routing engine.
//!
//! This crate provides the error taxonomy, domain types, and the trait seams
//! used throughout the workspace: storage adapters and the collaborators the
//! engine only references (leads, departments, event transport).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AttendError;
pub use types::{
    AdapterType, Attendance, AttendanceDetails, AttendanceEvent, AttendanceFilter,
    AttendanceStats, AttendanceStatus, CloseRequest, Department, DepartmentCount, EventType,
    HealthStatus, HistoryAction, HistoryEntry, Lead, Membership, Priority, Role, SyncReport,
    TenantContext, TransferMode, TransferRequest,
};

pub use traits::events::NoopPublisher;
pub use traits::{
    DepartmentDirectory, EventPublisher, LeadDirectory, PluginAdapter, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn sample_attendance() -> Attendance {
        Attendance {
            id: "a-1".into(),
            tenant_id: "t-1".into(),
            lead_id: "l-1".into(),
            status: AttendanceStatus::InProgress,
            priority: Priority::High,
            assigned_user_id: Some("u-1".into()),
            department_id: None,
            urgent: false,
            claimed_at: Some("2026-01-01T00:00:01.000Z".into()),
            last_transferred_at: None,
            closed_at: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:01.000Z".into(),
            version: 1,
        }
    }

    #[test]
    fn status_uses_screaming_snake_case_on_the_wire() {
        assert_eq!(AttendanceStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(
            AttendanceStatus::from_str("TRANSFERRED").unwrap(),
            AttendanceStatus::Transferred
        );
        let json = serde_json::to_string(&AttendanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn priority_orders_high_above_low() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!(Priority::from_str("high").unwrap(), Priority::High);
    }

    #[test]
    fn only_closed_is_terminal() {
        assert!(AttendanceStatus::Closed.is_terminal());
        assert!(!AttendanceStatus::Open.is_terminal());
        assert!(AttendanceStatus::InProgress.is_owned());
        assert!(AttendanceStatus::Transferred.is_owned());
        assert!(!AttendanceStatus::Open.is_owned());
    }

    #[test]
    fn event_type_names_match_transport_contract() {
        assert_eq!(EventType::New.to_string(), "attendance.new");
        assert_eq!(EventType::Claimed.to_string(), "attendance.claimed");
        assert_eq!(EventType::Updated.to_string(), "attendance.updated");
        assert_eq!(EventType::Transferred.to_string(), "attendance.transferred");
    }

    #[test]
    fn event_serializes_type_tag_and_full_attendance() {
        let event = AttendanceEvent {
            event_type: EventType::Claimed,
            tenant_id: "t-1".into(),
            actor_user_id: Some("u-1".into()),
            attendance: sample_attendance(),
            occurred_at: "2026-01-01T00:00:01.000Z".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "attendance.claimed");
        assert_eq!(value["attendance"]["status"], "IN_PROGRESS");
        assert_eq!(value["attendance"]["assigned_user_id"], "u-1");
    }

    #[test]
    fn filter_deserializes_from_partial_json() {
        let filter: AttendanceFilter =
            serde_json::from_str(r#"{"status":"OPEN","urgent":true}"#).unwrap();
        assert_eq!(filter.status, Some(AttendanceStatus::Open));
        assert_eq!(filter.urgent, Some(true));
        assert!(filter.search.is_none());
    }

    #[test]
    fn tenant_context_admin_check() {
        assert!(TenantContext::new("t", "u", Role::Admin).is_admin());
        assert!(!TenantContext::new("t", "u", Role::Agent).is_admin());
    }

    #[test]
    fn sync_report_merge_adds_counts() {
        let mut total = SyncReport::default();
        total.merge(SyncReport {
            total_leads: 3,
            existing_attendances: 1,
            created_attendances: 2,
            skipped_terminal: 0,
        });
        total.merge(SyncReport {
            total_leads: 2,
            existing_attendances: 0,
            created_attendances: 1,
            skipped_terminal: 1,
        });
        assert_eq!(total.total_leads, 5);
        assert_eq!(total.created_attendances, 3);
        assert_eq!(total.skipped_terminal, 1);
    }

    #[test]
    fn all_trait_seams_are_exported() {
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_lead_directory<T: LeadDirectory>() {}
        fn _assert_department_directory<T: DepartmentDirectory>() {}
        fn _assert_publisher<T: EventPublisher>() {}
        _assert_publisher::<NoopPublisher>();
    }
}
