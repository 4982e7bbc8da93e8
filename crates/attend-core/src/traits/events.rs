// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event publication seam.

use crate::types::AttendanceEvent;

/// Fire-and-forget publisher of attendance lifecycle events.
///
/// Publishing never fails the command that produced the event: delivery is
/// at-most-once and clients reconcile with a full refresh when they miss one.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AttendanceEvent);
}

/// Publisher that drops every event. Used by CLI one-shot commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: AttendanceEvent) {}
}
