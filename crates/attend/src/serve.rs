// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `attend serve` and `attend sync` command implementations.
//!
//! `serve` opens storage, wires the engine to the event bus, starts the
//! gateway, and runs the periodic sync and idempotency-pruning loops until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use attend_bus::EventBus;
use attend_config::AttendConfig;
use attend_core::{AttendError, EventPublisher, NoopPublisher, StorageAdapter};
use attend_gateway::{AuthConfig, GatewayState, ServerConfig, start_server};
use attend_routing::{EngineSettings, RoutingEngine};
use attend_storage::{SqliteLeadDirectory, SqliteStorage};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::shutdown;

/// Crates whose logs follow `service.log_level`; everything else stays at warn.
const LOG_TARGETS: &[&str] = &[
    "attend",
    "attend_core",
    "attend_config",
    "attend_storage",
    "attend_bus",
    "attend_routing",
    "attend_gateway",
];

const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

/// Open storage and build an engine that publishes to `events`.
pub async fn open_engine(
    config: &AttendConfig,
    events: Arc<dyn EventPublisher>,
) -> Result<(Arc<SqliteStorage>, RoutingEngine), AttendError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let db = storage.database()?.clone();

    let engine = RoutingEngine::new(
        db.clone(),
        Arc::new(SqliteLeadDirectory::new(db)),
        events,
        EngineSettings::from_config(config),
    );
    Ok((storage, engine))
}

/// Run the `attend serve` command.
pub async fn run_serve(config: AttendConfig) -> Result<(), AttendError> {
    init_tracing(&config.service.log_level);
    info!(
        name = %config.service.name,
        database = %config.storage.database_path,
        "attend starting"
    );

    let bus = EventBus::new(config.gateway.event_buffer);
    let (storage, engine) = open_engine(&config, Arc::new(bus.clone())).await?;
    let cancel = shutdown::install_signal_handler();

    let mut tasks = Vec::new();

    if config.sync.interval_secs > 0 {
        let every = Duration::from_secs(config.sync.interval_secs);
        tasks.push(tokio::spawn(sync_loop(engine.clone(), every, cancel.clone())));
        info!(interval_secs = config.sync.interval_secs, "background sync enabled");
    } else {
        info!("background sync disabled");
    }
    tasks.push(tokio::spawn(prune_loop(engine.clone(), cancel.clone())));

    let served = if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token is not set; every API request will be rejected");
        }
        let state = GatewayState::new(
            engine,
            bus,
            AuthConfig::new(config.gateway.bearer_token.clone()),
            storage.clone(),
            cancel.clone(),
        );
        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        start_server(&server_config, state).await
    } else {
        info!("gateway disabled, running background loops only");
        cancel.cancelled().await;
        Ok(())
    };

    if let Err(e) = &served {
        error!(error = %e, "gateway failed");
    }

    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    storage.close().await?;
    info!("attend stopped");
    served
}

/// Run the `attend sync` command for one tenant, or all when `tenant` is `None`.
///
/// Prints the sync report as JSON on stdout.
pub async fn run_sync(config: AttendConfig, tenant: Option<String>) -> Result<(), AttendError> {
    init_tracing(&config.service.log_level);

    let (storage, engine) = open_engine(&config, Arc::new(NoopPublisher)).await?;
    let report = match tenant.as_deref() {
        Some(tenant_id) => engine.sync(tenant_id).await,
        None => engine.sync_all().await,
    };
    storage.close().await?;
    let report = report?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| AttendError::Internal(format!("failed to render sync report: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Reconcile every tenant now and then every `every` until cancelled.
async fn sync_loop(engine: RoutingEngine, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.sync_all().await {
                    Ok(report) if report.created_attendances > 0 => {
                        info!(
                            total_leads = report.total_leads,
                            created = report.created_attendances,
                            skipped_terminal = report.skipped_terminal,
                            "background sync created attendances"
                        );
                    }
                    Ok(report) => {
                        debug!(total_leads = report.total_leads, "background sync found nothing to do");
                    }
                    Err(e) => warn!(error = %e, "background sync failed"),
                }
            }
            _ = cancel.cancelled() => {
                debug!("sync loop shutting down");
                break;
            }
        }
    }
}

/// Drop expired idempotency keys once an hour.
async fn prune_loop(engine: RoutingEngine, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    // Skip the immediate first tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.prune_idempotency().await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "pruned expired idempotency keys"),
                    Err(e) => warn!(error = %e, "idempotency prune failed"),
                }
            }
            _ = cancel.cancelled() => {
                debug!("prune loop shutting down");
                break;
            }
        }
    }
}

fn log_filter(log_level: &str) -> String {
    let level = log_level.to_ascii_lowercase();
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(log_level)));

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
