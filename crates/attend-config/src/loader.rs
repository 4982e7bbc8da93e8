// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./attend.toml` > `~/.config/attend/attend.toml` > `/etc/attend/attend.toml`
//! with environment variable overrides via `ATTEND_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AttendConfig;

/// Top-level sections, used to turn `ATTEND_QUEUE_SLA_MINUTES` into `queue.sla_minutes`.
const SECTIONS: &[&str] = &[
    "service", "storage", "queue", "routing", "engine", "sync", "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/attend/attend.toml` (system-wide)
/// 3. `~/.config/attend/attend.toml` (user XDG config)
/// 4. `./attend.toml` (local directory)
/// 5. `ATTEND_*` environment variables
pub fn load_config() -> Result<AttendConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AttendConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AttendConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AttendConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AttendConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AttendConfig::default()))
        .merge(Toml::file("/etc/attend/attend.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("attend/attend.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("attend.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Only the section prefix is turned into a dot, so underscores inside key
/// names survive: `ATTEND_ENGINE_RETRY_BACKOFF_MS` maps to
/// `engine.retry_backoff_ms`, not `engine.retry.backoff.ms`.
fn env_provider() -> Env {
    Env::prefixed("ATTEND_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
