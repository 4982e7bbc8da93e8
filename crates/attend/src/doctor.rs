// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `attend doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the SQLite database,
//! and the gateway and sync settings, without modifying anything.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use attend_config::{AttendConfig, ConfigError};
use attend_storage::database::map_tr_err;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `attend doctor` command.
///
/// Returns `false` when any check failed.
pub async fn run_doctor(loaded: Result<AttendConfig, Vec<ConfigError>>, plain: bool) -> bool {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = Vec::new();

    let start = Instant::now();
    match &loaded {
        Ok(config) => {
            results.push(CheckResult::new("Configuration", CheckStatus::Pass, "valid", start));
            results.push(check_database(&config.storage.database_path).await);
            results.push(check_gateway(config));
            results.push(check_sync(config));
        }
        Err(errors) => {
            results.push(CheckResult::new(
                "Configuration",
                CheckStatus::Fail,
                format!("{} error(s), remaining checks skipped", errors.len()),
                start,
            ));
        }
    }

    println!();
    println!("  attend doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if let Err(errors) = &loaded {
        attend_config::render_errors(errors);
    }

    results.iter().all(|r| r.status != CheckStatus::Fail)
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check the database opens, passes `quick_check`, and has been migrated.
async fn check_database(db_path: &str) -> CheckResult {
    const NAME: &str = "Database";
    let start = Instant::now();

    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            NAME,
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(NAME, CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };

    let probe = conn
        .call(|conn| -> Result<(String, Option<i64>), rusqlite::Error> {
            let integrity: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
            let has_history: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master
                 WHERE type = 'table' AND name = 'refinery_schema_history')",
                [],
                |row| row.get(0),
            )?;
            let version = if has_history {
                conn.query_row(
                    "SELECT MAX(version) FROM refinery_schema_history",
                    [],
                    |row| row.get(0),
                )?
            } else {
                None
            };
            Ok((integrity, version))
        })
        .await
        .map_err(map_tr_err);

    match probe {
        Ok((integrity, _)) if integrity != "ok" => CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("quick_check: {integrity}"),
            start,
        ),
        Ok((_, Some(version))) => CheckResult::new(
            NAME,
            CheckStatus::Pass,
            format!("ok, schema version {version}"),
            start,
        ),
        Ok((_, None)) => CheckResult::new(
            NAME,
            CheckStatus::Warn,
            "no schema yet (migrations run on first start)",
            start,
        ),
        Err(e) => CheckResult::new(NAME, CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}

fn check_gateway(config: &AttendConfig) -> CheckResult {
    const NAME: &str = "Gateway";
    let start = Instant::now();
    let gateway = &config.gateway;

    if !gateway.enabled {
        return CheckResult::new(NAME, CheckStatus::Pass, "disabled", start);
    }
    if gateway.bearer_token.is_none() {
        return CheckResult::new(
            NAME,
            CheckStatus::Warn,
            "no bearer_token set; every API request will be rejected",
            start,
        );
    }
    CheckResult::new(
        NAME,
        CheckStatus::Pass,
        format!("listening on {}:{}", gateway.host, gateway.port),
        start,
    )
}

fn check_sync(config: &AttendConfig) -> CheckResult {
    const NAME: &str = "Background sync";
    let start = Instant::now();
    if config.sync.interval_secs == 0 {
        CheckResult::new(
            NAME,
            CheckStatus::Warn,
            "disabled; run `attend sync --all` to create attendances",
            start,
        )
    } else {
        CheckResult::new(
            NAME,
            CheckStatus::Pass,
            format!(
                "every {}s, batch {}",
                config.sync.interval_secs, config.sync.batch_size
            ),
            start,
        )
    }
}
