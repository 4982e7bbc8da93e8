// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event publisher that records instead of delivering.

use std::sync::Mutex;

use attend_core::{AttendanceEvent, EventPublisher, EventType};

/// Captures every published event in order.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<AttendanceEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far.
    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Event types in publish order.
    pub fn types(&self) -> Vec<EventType> {
        self.lock().iter().map(|e| e.event_type).collect()
    }

    pub fn last(&self) -> Option<AttendanceEvent> {
        self.lock().last().cloned()
    }

    /// Number of events of one kind.
    pub fn count_of(&self, event_type: EventType) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AttendanceEvent>> {
        // A panicking test thread must not hide the events from the others.
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: AttendanceEvent) {
        tracing::trace!(event_type = %event.event_type, attendance_id = %event.attendance.id, "event recorded");
        self.lock().push(event);
    }
}
