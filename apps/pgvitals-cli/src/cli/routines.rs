//! # Routines
//!
//! Routines are the operations the CLI commands dispatch to. Each one
//! runs to completion and returns a [`RoutineSuccess`] carrying the final
//! message to print, or a [`RoutineFailure`] that sets the exit code.
//! Progress along the way is reported through the logger, not the
//! terminal, so `--json` output stays machine-readable.

pub mod check;
pub mod ls;
pub mod params;
pub mod ping;

use crate::cli::display::{Message, MessageType};
use crate::cli::settings::{Settings, SETTINGS_FILE};
use crate::infrastructure::postgres::config::default_connect_timeout_seconds;
use crate::infrastructure::postgres::{
    ClusterConfig, ClusterConnection, PgNodeClient, PostgresError,
};

/// Successful result of a routine, with the message to show the user.
#[derive(Debug, Clone)]
pub struct RoutineSuccess {
    pub message: Message,
    pub message_type: MessageType,
}

impl RoutineSuccess {
    pub fn success(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Success,
        }
    }

    pub fn highlight(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Highlight,
        }
    }
}

/// Failed result of a routine, with the message to show the user and the
/// underlying error when there is one.
#[derive(Debug)]
pub struct RoutineFailure {
    pub message: Message,
    pub message_type: MessageType,
    pub error: Option<anyhow::Error>,
}

impl RoutineFailure {
    pub fn new<F: Into<anyhow::Error>>(message: Message, error: F) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: Some(error.into()),
        }
    }

    /// A failure that is fully described by its message.
    pub fn error(message: Message) -> Self {
        Self {
            message,
            message_type: MessageType::Error,
            error: None,
        }
    }
}

/// Works out which cluster this invocation targets. Connection flags win
/// over the settings file; with neither, there is nothing to connect to.
pub(crate) fn resolve_cluster_config(
    settings: &Settings,
    url: Option<&str>,
    replica_urls: &[String],
) -> Result<ClusterConfig, RoutineFailure> {
    if let Some(url) = url {
        let connect_timeout_seconds = settings
            .cluster
            .as_ref()
            .map(|cluster| cluster.connect_timeout_seconds)
            .unwrap_or_else(default_connect_timeout_seconds);
        return Ok(ClusterConfig {
            primary: url.to_string(),
            replicas: replica_urls.to_vec(),
            connect_timeout_seconds,
        });
    }

    if !replica_urls.is_empty() {
        return Err(RoutineFailure::error(Message::new(
            "Configuration".to_string(),
            "--replica-url requires --url for the primary".to_string(),
        )));
    }

    settings.cluster.clone().ok_or_else(|| {
        RoutineFailure::error(Message::new(
            "Configuration".to_string(),
            format!("No cluster configured. Pass --url or add a [cluster] section to {SETTINGS_FILE}"),
        ))
    })
}

/// Opens connections to every node in the cluster.
pub(crate) async fn connect_cluster(
    config: &ClusterConfig,
) -> Result<ClusterConnection<PgNodeClient>, RoutineFailure> {
    ClusterConnection::connect(config)
        .await
        .map_err(|e: PostgresError| {
            let details = format!("Failed to reach the cluster: {e}");
            RoutineFailure::new(Message::new("Connect".to_string(), details), e)
        })
}
