//! # Ls Routine
//!
//! Lists the supported diagnostics. Runs entirely offline.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde_json::json;

use crate::cli::display::Message;
use crate::cli::routines::{RoutineFailure, RoutineSuccess};
use crate::health::Diagnostic;

pub fn list_diagnostics(json: bool) -> Result<RoutineSuccess, RoutineFailure> {
    if json {
        let entries: Vec<serde_json::Value> = Diagnostic::all()
            .iter()
            .map(|diagnostic| {
                json!({
                    "name": diagnostic.name(),
                    "description": diagnostic.description(),
                    "runs_on": diagnostic.topology().name(),
                    "supports_size_filter": diagnostic.supports_size_filter(),
                })
            })
            .collect();
        let json_str = serde_json::to_string_pretty(&entries).map_err(|e| {
            RoutineFailure::new(
                Message::new(
                    "Ls".to_string(),
                    "Failed to format diagnostics as JSON".to_string(),
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
    table.set_header(vec![
        Cell::new("Diagnostic").fg(Color::Cyan),
        Cell::new("Runs on").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
    ]);
    for diagnostic in Diagnostic::all() {
        table.add_row(vec![
            diagnostic.name().to_string(),
            diagnostic.topology().name().to_string(),
            diagnostic.description().to_string(),
        ]);
    }
    println!("{table}");

    Ok(RoutineSuccess::success(Message::new(
        "Ls".to_string(),
        format!("{} diagnostics available", Diagnostic::all().len()),
    )))
}
