// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter and collaborator trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait. Collaborator traits are
//! the seams between the routing engine and the systems it only references
//! (leads, departments, event transport). Async traits use `#[async_trait]`
//! for dynamic dispatch compatibility.

pub mod adapter;
pub mod directory;
pub mod events;
pub mod storage;

pub use adapter::PluginAdapter;
pub use directory::{DepartmentDirectory, LeadDirectory};
pub use events::EventPublisher;
pub use storage::StorageAdapter;
