//! # CLI
//!
//! Argument parsing and dispatch for the `pgvitals` binary. Commands are
//! parsed by clap, settings come from `pgvitals.toml` plus the
//! environment, and each command hands off to a routine that does the
//! actual work.

#[macro_use]
pub(crate) mod display;

pub mod commands;
pub mod logger;
pub mod routines;
pub mod settings;

use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::cli::commands::Commands;
use crate::cli::routines::check::run_checks;
use crate::cli::routines::ls::list_diagnostics;
use crate::cli::routines::params::show_params;
use crate::cli::routines::ping::ping_cluster;
use crate::cli::routines::{RoutineFailure, RoutineSuccess};
use crate::cli::settings::Settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help(true))]
pub struct Cli {
    /// Path to the settings file (defaults to ./pgvitals.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

pub async fn top_command_handler(
    settings: Settings,
    commands: &Commands,
) -> Result<RoutineSuccess, RoutineFailure> {
    match commands {
        Commands::Check(args) => {
            info!("Running check command");
            run_checks(&settings, args).await
        }
        Commands::Ls { json } => {
            info!("Running ls command");
            list_diagnostics(*json)
        }
        Commands::Params {
            with_defaults,
            json,
            connection,
        } => {
            info!("Running params command");
            show_params(
                &settings,
                *with_defaults,
                *json,
                connection.url.as_deref(),
                &connection.replica_urls,
            )
            .await
        }
        Commands::Ping { connection } => {
            info!("Running ping command");
            ping_cluster(
                &settings,
                connection.url.as_deref(),
                &connection.replica_urls,
            )
            .await
        }
    }
}
