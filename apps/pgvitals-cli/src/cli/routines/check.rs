//! # Check Routine
//!
//! Runs one or more diagnostics across the cluster and renders the merged
//! verdicts, as tables for people or as JSON for machines.

use std::time::Duration;

use comfy_table::{Cell, Color, ContentArrangement, Table};
use itertools::Itertools;
use log::{debug, info};

use crate::cli::commands::CheckArgs;
use crate::cli::display::Message;
use crate::cli::routines::{
    connect_cluster, resolve_cluster_config, RoutineFailure, RoutineSuccess,
};
use crate::cli::settings::Settings;
use crate::health::checks::{CheckOptions, FailurePolicy};
use crate::health::model::PgContext;
use crate::health::{run_check, validate_filter, CheckError, CheckReport, Diagnostic, FindingFilter};

pub async fn run_checks(
    settings: &Settings,
    args: &CheckArgs,
) -> Result<RoutineSuccess, RoutineFailure> {
    let diagnostics = resolve_diagnostics(&args.diagnostics, args.all)?;
    let filter = build_filter(args)?;
    for diagnostic in &diagnostics {
        validate_filter(*diagnostic, &filter).map_err(invalid_request)?;
    }

    let ctx = build_context(settings, args.schema.as_deref())?;
    let options = build_options(settings, args)?;

    let cluster_config = resolve_cluster_config(
        settings,
        args.connection.url.as_deref(),
        &args.connection.replica_urls,
    )?;
    info!(
        "Running {} diagnostics against schema '{}'",
        diagnostics.len(),
        ctx.schema()
    );
    let cluster = connect_cluster(&cluster_config).await?;

    let mut reports = Vec::with_capacity(diagnostics.len());
    for diagnostic in diagnostics {
        debug!("Running diagnostic '{diagnostic}'");
        let report = run_check(diagnostic, &cluster, &ctx, options, &filter)
            .await
            .map_err(|e| {
                let details = format!("'{diagnostic}' failed: {e}");
                RoutineFailure::new(Message::new("Check".to_string(), details), e)
            })?;
        reports.push(report);
    }

    if args.json {
        format_json_output(&reports)
    } else {
        format_human_readable_output(&reports)
    }
}

fn invalid_request(err: CheckError) -> RoutineFailure {
    RoutineFailure::error(Message::new("Check".to_string(), err.to_string()))
}

fn resolve_diagnostics(
    requested: &[String],
    all: bool,
) -> Result<Vec<Diagnostic>, RoutineFailure> {
    if all {
        return Ok(Diagnostic::all().to_vec());
    }
    let parsed = requested
        .iter()
        .map(|name| name.parse::<Diagnostic>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid_request)?;
    Ok(parsed.into_iter().unique().collect())
}

fn build_filter(args: &CheckArgs) -> Result<FindingFilter, RoutineFailure> {
    match (&args.object, args.min_size) {
        (None, None) => Ok(FindingFilter::All),
        (Some(name), None) => Ok(FindingFilter::ByName(name.clone())),
        (None, Some(min_size)) => Ok(FindingFilter::BySize(min_size)),
        // clap already rejects this combination, keep the guard anyway
        (Some(_), Some(_)) => Err(RoutineFailure::error(Message::new(
            "Check".to_string(),
            "--object and --min-size cannot be combined".to_string(),
        ))),
    }
}

fn build_context(
    settings: &Settings,
    schema_flag: Option<&str>,
) -> Result<PgContext, RoutineFailure> {
    let schema = schema_flag.unwrap_or(&settings.checks.schema);
    PgContext::new(schema).map_err(invalid_request)
}

fn build_options(settings: &Settings, args: &CheckArgs) -> Result<CheckOptions, RoutineFailure> {
    let timeout = args
        .timeout
        .unwrap_or(Duration::from_secs(settings.checks.query_timeout_seconds));
    let failure_policy = match &args.policy {
        Some(raw) => raw.parse::<FailurePolicy>().map_err(invalid_request)?,
        None => settings.checks.failure_policy,
    };
    Ok(CheckOptions {
        timeout,
        failure_policy,
    })
}

fn format_json_output(reports: &[CheckReport]) -> Result<RoutineSuccess, RoutineFailure> {
    let json_str = serde_json::to_string_pretty(reports).map_err(|e| {
        RoutineFailure::new(
            Message::new(
                "Check".to_string(),
                "Failed to format reports as JSON".to_string(),
            ),
            e,
        )
    })?;
    println!("{json_str}");

    // The JSON is the output; an empty message skips the final banner.
    Ok(RoutineSuccess::success(Message::new(
        String::new(),
        String::new(),
    )))
}

fn format_human_readable_output(
    reports: &[CheckReport],
) -> Result<RoutineSuccess, RoutineFailure> {
    let mut healthy = 0usize;
    let mut total_findings = 0usize;

    for report in reports {
        if report.is_healthy() {
            healthy += 1;
            continue;
        }
        total_findings += report.findings.len();

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Object").fg(Color::Cyan),
            Cell::new("Details").fg(Color::Cyan),
        ]);
        for finding in &report.findings {
            table.add_row(vec![finding.object_name().to_string(), finding.details()]);
        }
        println!(
            "\n{} ({} findings in schema '{}')",
            report.diagnostic,
            report.findings.len(),
            report.schema
        );
        println!("{table}");
    }

    let details = if total_findings == 0 {
        format!("{healthy} diagnostics passed, no issues found")
    } else {
        format!(
            "{} findings across {} diagnostics ({} passed)",
            total_findings,
            reports.len() - healthy,
            healthy
        )
    };
    Ok(RoutineSuccess::highlight(Message::new(
        "Check".to_string(),
        details,
    )))
}
