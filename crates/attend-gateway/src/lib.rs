// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the routing engine.
//!
//! The REST surface under `/v1` turns requests into engine commands and
//! queries; `/ws` fans attendance events out to connected clients of one
//! tenant. Callers are trusted once they present the shared bearer token:
//! the tenant context comes from request headers.

pub mod auth;
pub mod context;
pub mod departments;
pub mod error;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
