// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Attend service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use attend_core::{Priority, TransferMode};
use serde::{Deserialize, Serialize};

/// Top-level Attend configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttendConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Smart queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Transfer semantics.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Engine retry and idempotency settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Lead/attendance reconciliation settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, shown in logs and health responses.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "attend".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long SQLite waits on a locked database before reporting busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "attend.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Smart queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Wait time after which an open attendance is flagged urgent.
    #[serde(default = "default_sla_minutes")]
    pub sla_minutes: u64,

    /// Priority given to attendances created by sync or claim-on-demand.
    #[serde(default)]
    pub default_priority: Priority,

    /// Upper bound on items returned by one queue or list request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            sla_minutes: default_sla_minutes(),
            default_priority: Priority::default(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_sla_minutes() -> u64 {
    30
}

fn default_max_page_size() -> usize {
    500
}

/// Transfer semantics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// `push` reassigns immediately; `accept` waits for the target user.
    #[serde(default)]
    pub transfer_mode: TransferMode,
}

/// Engine retry and idempotency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Extra attempts after a transient storage failure.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,

    /// Delay before each retry, doubled per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// How long idempotency keys are remembered.
    #[serde(default = "default_idempotency_ttl_hours")]
    pub idempotency_ttl_hours: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transient_retries: default_transient_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            idempotency_ttl_hours: default_idempotency_ttl_hours(),
        }
    }
}

fn default_transient_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    25
}

fn default_idempotency_ttl_hours() -> u64 {
    24
}

/// Lead/attendance reconciliation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Leads processed per transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between background sync runs in `attend serve` (0 disables).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Lead statuses that never get an attendance (case-insensitive).
    #[serde(default = "default_terminal_lead_statuses")]
    pub terminal_lead_statuses: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            interval_secs: default_interval_secs(),
            terminal_lead_statuses: default_terminal_lead_statuses(),
        }
    }
}

fn default_batch_size() -> usize {
    200
}

fn default_interval_secs() -> u64 {
    300
}

fn default_terminal_lead_statuses() -> Vec<String> {
    vec!["won".to_string(), "lost".to_string(), "archived".to_string()]
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the HTTP/WebSocket API from `attend serve`.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared bearer token. `None` rejects every API request (fail-closed).
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Capacity of the event broadcast buffer per subscriber.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3080
}

fn default_event_buffer() -> usize {
    1024
}
