//! # Params Routine
//!
//! Reports server parameters from the primary node, either the full
//! current set or just the important ones never tuned away from their
//! stock defaults.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use log::info;

use crate::cli::display::Message;
use crate::cli::routines::{
    connect_cluster, resolve_cluster_config, RoutineFailure, RoutineSuccess,
};
use crate::cli::settings::Settings;
use crate::health::params::{current_values, params_with_default_values, ImportantParam};

pub async fn show_params(
    settings: &Settings,
    with_defaults: bool,
    json: bool,
    url: Option<&str>,
    replica_urls: &[String],
) -> Result<RoutineSuccess, RoutineFailure> {
    let cluster_config = resolve_cluster_config(settings, url, replica_urls)?;
    let cluster = connect_cluster(&cluster_config).await?;
    let primary = cluster.primary();
    info!("Reading server parameters from the primary");

    let params = if with_defaults {
        params_with_default_values(primary.as_ref()).await
    } else {
        current_values(primary.as_ref()).await
    }
    .map_err(|e| {
        let details = format!("Failed to read server parameters: {e}");
        RoutineFailure::new(Message::new("Params".to_string(), details), e)
    })?;

    if json {
        let json_str = serde_json::to_string_pretty(&params).map_err(|e| {
            RoutineFailure::new(
                Message::new(
                    "Params".to_string(),
                    "Failed to format parameters as JSON".to_string(),
                ),
                e,
            )
        })?;
        println!("{json_str}");

        return Ok(RoutineSuccess::success(Message::new(
            String::new(),
            String::new(),
        )));
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if with_defaults {
        table.set_header(vec![
            Cell::new("Parameter").fg(Color::Cyan),
            Cell::new("Running value").fg(Color::Cyan),
            Cell::new("Documented default").fg(Color::Cyan),
        ]);
        for param in &params {
            table.add_row(vec![
                param.name().to_string(),
                param.value().to_string(),
                documented_default(param.name()).to_string(),
            ]);
        }
    } else {
        table.set_header(vec![
            Cell::new("Parameter").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
        for param in &params {
            table.add_row(vec![param.name().to_string(), param.value().to_string()]);
        }
    }
    if !params.is_empty() {
        println!("{table}");
    }

    let details = if with_defaults {
        if params.is_empty() {
            "All important parameters have been tuned".to_string()
        } else {
            format!(
                "{} important parameters still at their stock defaults",
                params.len()
            )
        }
    } else {
        format!("{} parameters reported", params.len())
    };
    Ok(RoutineSuccess::highlight(Message::new(
        "Params".to_string(),
        details,
    )))
}

/// The default the documentation prints, which is not always the literal
/// string `pg_settings` reports for an untuned server.
fn documented_default(name: &str) -> &'static str {
    ImportantParam::all()
        .iter()
        .find(|param| param.name() == name)
        .map(|param| param.default_value())
        .unwrap_or("-")
}
