//! # pgvitals
//!
//! A read-only health inspector for PostgreSQL clusters. Diagnostics run
//! against the catalog and statistics views of every node, the per-node
//! findings are merged into one deduplicated verdict, and nothing is ever
//! written to the servers under inspection.
//!
//! The binary wires three layers together: `cli` parses arguments and
//! renders output, `health` owns the diagnostics and the merge semantics,
//! `infrastructure` talks to the PostgreSQL nodes.

#[macro_use]
mod cli;
mod health;
mod infrastructure;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::display::{Message, MessageType};

fn main() -> ExitCode {
    let cli_result = match cli::Cli::try_parse() {
        Ok(cli_result) => cli_result,
        Err(e) => e.exit(),
    };

    let settings = match cli::settings::read_settings(cli_result.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            show_message!(
                MessageType::Error,
                Message::new(
                    "Settings".to_string(),
                    format!("Failed to load settings: {e}")
                )
            );
            return ExitCode::from(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let logger_settings = settings.logger.clone();
    let result = runtime.block_on(async {
        cli::logger::setup_logging(&logger_settings);
        cli::top_command_handler(settings, &cli_result.command).await
    });

    match result {
        Ok(success) => {
            // Routines that print their own JSON return an empty message
            if !success.message.action.is_empty() || !success.message.details.is_empty() {
                show_message!(success.message_type, success.message);
            }
            ExitCode::from(0)
        }
        Err(failure) => {
            show_message!(failure.message_type, failure.message);
            if let Some(error) = failure.error {
                eprintln!("{error:?}");
            }
            ExitCode::from(1)
        }
    }
}
