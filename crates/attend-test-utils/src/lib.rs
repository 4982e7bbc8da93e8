// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Attend integration tests.
//!
//! Provides a temp-database harness and an event recorder so engine and
//! gateway tests run without any external service.
//!
//! # Components
//!
//! - [`TestHarness`] - Engine over a fresh SQLite file, with seeding helpers
//! - [`RecordingPublisher`] - Captures published events for assertions

pub mod harness;
pub mod recording;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use recording::RecordingPublisher;
