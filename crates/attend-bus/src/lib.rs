// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process event bus for attendance lifecycle events.
//!
//! Publishing is fire-and-forget: a publish with no subscribers, or with a
//! subscriber that has fallen behind, never fails the command that produced
//! the event. Slow subscribers lose the oldest events and are told how many.

use attend_core::{AttendanceEvent, EventPublisher};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Broadcast-backed [`EventPublisher`].
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AttendanceEvent>,
}

impl EventBus {
    /// Create a bus whose subscribers each buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to every event on the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to the events of one tenant.
    pub fn subscribe_tenant(&self, tenant_id: impl Into<String>) -> TenantSubscription {
        TenantSubscription {
            tenant_id: tenant_id.into(),
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: AttendanceEvent) {
        let event_type = event.event_type;
        let attendance_id = event.attendance.id.clone();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(%event_type, %attendance_id, receivers, "event published");
            }
            Err(_) => {
                debug!(%event_type, %attendance_id, "no subscribers for event");
            }
        }
    }
}

/// A receiver that only yields events of one tenant.
pub struct TenantSubscription {
    tenant_id: String,
    rx: broadcast::Receiver<AttendanceEvent>,
}

impl TenantSubscription {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Next event for this tenant, or `None` once the bus is gone.
    ///
    /// Lagging skips the dropped events and keeps receiving.
    pub async fn recv(&mut self) -> Option<AttendanceEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.tenant_id == self.tenant_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(tenant_id = %self.tenant_id, skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
