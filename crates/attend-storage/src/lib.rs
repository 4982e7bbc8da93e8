// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Attend routing engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and transactional operations for
//! attendances, their history, departments, mirrored leads, and idempotency
//! keys.

pub mod adapter;
pub mod database;
pub mod directory;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use directory::SqliteLeadDirectory;
pub use models::*;
