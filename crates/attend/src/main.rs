// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attend - attendance routing and queue service.
//!
//! This is the binary entry point: it loads configuration, then runs the
//! long-lived service, a one-shot lead sync, or the environment doctor.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod serve;
mod shutdown;

use std::path::PathBuf;

use attend_config::{AttendConfig, ConfigError};
use clap::{Parser, Subcommand};

/// Attend - attendance routing and queue service.
#[derive(Parser, Debug)]
#[command(name = "attend", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the routing service with its HTTP/WebSocket gateway.
    Serve,
    /// Create missing attendances for active leads, then exit.
    Sync {
        /// Tenant to reconcile.
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        tenant: Option<String>,
        /// Reconcile every tenant that has leads.
        #[arg(long)]
        all: bool,
    },
    /// Check configuration, database, and gateway settings.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AttendConfig, Vec<ConfigError>> {
    match path {
        Some(path) => attend_config::load_and_validate_path(path),
        None => attend_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_ref());

    // The doctor reports config problems itself instead of bailing out.
    if let Some(Commands::Doctor { plain }) = cli.command {
        let healthy = doctor::run_doctor(loaded, plain).await;
        if !healthy {
            std::process::exit(1);
        }
        return;
    }

    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            attend_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Sync { tenant, all }) => {
            let tenant = if all { None } else { tenant };
            serve::run_sync(config, tenant).await
        }
        Some(Commands::Doctor { .. }) => Ok(()),
        None => {
            println!("attend: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("attend: {e}");
        std::process::exit(1);
    }
}
