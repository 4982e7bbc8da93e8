// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::AttendError;
use crate::traits::adapter::PluginAdapter;

/// Lifecycle of a persistence backend (open, migrate, checkpoint, close).
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), AttendError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), AttendError>;
}
