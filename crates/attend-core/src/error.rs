// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Attend routing engine.

use thiserror::Error;

/// The primary error type used across the engine, storage, and gateway.
///
/// Business-rule violations (`NotFound`, `Forbidden`, `Conflict`,
/// `InvalidArgument`) are surfaced to callers as-is. `Transient` marks an
/// infrastructure failure that may succeed on retry.
#[derive(Debug, Error)]
pub enum AttendError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The storage backend was busy or locked; the operation can be retried.
    #[error("storage temporarily unavailable: {source}")]
    Transient {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A lead, attendance, or department does not exist in the tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The actor is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A state-machine precondition failed, including lost races.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request itself is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AttendError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true when the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Storage { .. } => "storage",
            Self::Transient { .. } => "unavailable",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Internal(_) => "internal",
        }
    }
}
