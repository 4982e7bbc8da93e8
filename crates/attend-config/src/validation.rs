// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-zero thresholds, bind addresses, and log levels.

use crate::diagnostic::ConfigError;
use crate::model::AttendConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AttendConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.queue.sla_minutes == 0 {
        fail("queue.sla_minutes must be at least 1".to_string());
    }

    if config.queue.max_page_size == 0 {
        fail("queue.max_page_size must be at least 1".to_string());
    }

    if config.sync.batch_size == 0 {
        fail("sync.batch_size must be at least 1".to_string());
    }

    for (i, status) in config.sync.terminal_lead_statuses.iter().enumerate() {
        if status.trim().is_empty() {
            fail(format!("sync.terminal_lead_statuses[{i}] must not be empty"));
        }
    }

    if config.engine.transient_retries > 5 {
        fail(format!(
            "engine.transient_retries must be at most 5, got {}",
            config.engine.transient_retries
        ));
    }

    if config.gateway.event_buffer == 0 {
        fail("gateway.event_buffer must be at least 1".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be blank when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = AttendConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_sla_fails_validation() {
        let mut config = AttendConfig::default();
        config.queue.sla_minutes = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "sla_minutes"));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AttendConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn collects_every_error_without_failing_fast() {
        let mut config = AttendConfig::default();
        config.sync.batch_size = 0;
        config.gateway.event_buffer = 0;
        config.service.log_level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "batch_size"));
        assert!(has_error(&errors, "event_buffer"));
        assert!(has_error(&errors, "log_level"));
    }

    #[test]
    fn bad_host_fails_validation() {
        let mut config = AttendConfig::default();
        config.gateway.host = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "gateway.host"));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = AttendConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        config.gateway.bearer_token = Some("secret".to_string());
        config.queue.sla_minutes = 5;
        config.storage.database_path = "/tmp/attend.db".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
