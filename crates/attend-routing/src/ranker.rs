// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Smart queue ordering and SLA urgency.
//!
//! Queue order is `(priority desc, urgent desc, created_at asc, id asc)`.
//! Urgency is derived from the wait time at read time and never read back
//! from storage. The ordering is a hint: ownership is only established by a
//! successful claim.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use attend_core::Attendance;
use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Wait-time threshold after which a non-closed attendance is urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaPolicy {
    threshold: chrono::Duration,
}

impl SlaPolicy {
    pub fn from_minutes(minutes: u64) -> Self {
        let minutes = i64::try_from(minutes).unwrap_or(i64::MAX / 60_000);
        Self {
            threshold: chrono::Duration::minutes(minutes),
        }
    }

    /// Creation timestamp before which an attendance is urgent at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> String {
        (now - self.threshold).format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn is_urgent(&self, attendance: &Attendance, now: DateTime<Utc>) -> bool {
        !attendance.status.is_terminal() && attendance.created_at < self.cutoff(now)
    }

    /// Set the derived `urgent` flag as of `now`.
    pub fn apply(&self, mut attendance: Attendance, now: DateTime<Utc>) -> Attendance {
        attendance.urgent = self.is_urgent(&attendance, now);
        attendance
    }
}

/// Total queue order. `Less` means `a` is served before `b`.
pub fn queue_order(a: &Attendance, b: &Attendance) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.urgent.cmp(&a.urgent))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Heap entry: the attendance served first compares greatest.
struct Ranked<'a>(&'a Attendance);

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        queue_order(self.0, other.0).reverse()
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

/// A snapshot of claimable attendances with urgency evaluated.
///
/// Each call to [`iter`](Self::iter) starts a fresh, lazily ordered pass:
/// the heap is built in linear time and only the items actually consumed
/// are popped.
#[derive(Debug, Clone, Default)]
pub struct RankedQueue {
    items: Vec<Attendance>,
}

impl RankedQueue {
    pub fn new(candidates: Vec<Attendance>, sla: &SlaPolicy, now: DateTime<Utc>) -> Self {
        let items = candidates
            .into_iter()
            .map(|a| sla.apply(a, now))
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> RankedIter<'_> {
        RankedIter {
            heap: self.items.iter().map(Ranked).collect(),
        }
    }

    /// The first `n` attendances in queue order.
    pub fn top(&self, n: usize) -> Vec<Attendance> {
        self.iter().take(n).cloned().collect()
    }
}

impl<'a> IntoIterator for &'a RankedQueue {
    type Item = &'a Attendance;
    type IntoIter = RankedIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a [`RankedQueue`] in queue order.
pub struct RankedIter<'a> {
    heap: BinaryHeap<Ranked<'a>>,
}

impl<'a> Iterator for RankedIter<'a> {
    type Item = &'a Attendance;

    fn next(&mut self) -> Option<Self::Item> {
        self.heap.pop().map(|ranked| ranked.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}

impl ExactSizeIterator for RankedIter<'_> {}
