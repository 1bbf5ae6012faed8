//! Cluster-aware database health checks.
//!
//! A diagnostic names one condition worth flagging (an invalid index, a
//! table without a primary key). Running one yields a [`CheckReport`]: the
//! per-node results of a read-only catalog query, merged into a single
//! deduplicated verdict for the whole cluster.

pub mod checks;
pub mod model;
pub mod params;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use itertools::Itertools;
use serde::Serialize;

use crate::health::checks::{
    AcceptAll, CheckOptions, CheckPredicate, ClusterCheck, FilterBySize, FilterIndexesByName,
    FilterTablesByName, HostCheck,
};
use crate::health::model::{
    CheckFinding, DuplicatedIndexes, ForeignKey, Index, IndexNameAware, IndexWithNulls, PgContext,
    Table, TableNameAware, TableWithMissingIndex, UnusedIndex,
};
use crate::infrastructure::postgres::{ClusterConnection, PostgresError, QueryExecutor, RowError};

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The caller asked for something impossible; raised before any query
    /// is sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with something the row mappers cannot read.
    #[error("malformed server response: {0}")]
    Malformed(String),

    #[error("check failed on '{node}': {source}")]
    QueryFailed {
        node: String,
        #[source]
        source: PostgresError,
    },

    /// A node blew through its per-node time budget.
    #[error("check timed out after {}", humantime::format_duration(*.0))]
    Cancelled(Duration),
}

impl From<RowError> for CheckError {
    fn from(err: RowError) -> Self {
        CheckError::Malformed(err.to_string())
    }
}

/// Which nodes a diagnostic has to visit.
///
/// Catalog contents replicate, so catalog-backed diagnostics ask the
/// primary alone. Statistics counters do not replicate; a replica serving
/// reads keeps its own, so statistics-backed diagnostics visit everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    OnPrimary,
    AcrossCluster,
}

impl Topology {
    pub fn name(&self) -> &'static str {
        match self {
            Topology::OnPrimary => "primary",
            Topology::AcrossCluster => "cluster",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The catalog of supported diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    InvalidIndexes,
    DuplicatedIndexes,
    IntersectedIndexes,
    UnusedIndexes,
    ForeignKeysWithoutIndex,
    TablesWithMissingIndexes,
    TablesWithoutPrimaryKey,
    IndexesWithNullValues,
}

impl Diagnostic {
    pub fn all() -> [Diagnostic; 8] {
        [
            Diagnostic::InvalidIndexes,
            Diagnostic::DuplicatedIndexes,
            Diagnostic::IntersectedIndexes,
            Diagnostic::UnusedIndexes,
            Diagnostic::ForeignKeysWithoutIndex,
            Diagnostic::TablesWithMissingIndexes,
            Diagnostic::TablesWithoutPrimaryKey,
            Diagnostic::IndexesWithNullValues,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Diagnostic::InvalidIndexes => "invalid_indexes",
            Diagnostic::DuplicatedIndexes => "duplicated_indexes",
            Diagnostic::IntersectedIndexes => "intersected_indexes",
            Diagnostic::UnusedIndexes => "unused_indexes",
            Diagnostic::ForeignKeysWithoutIndex => "foreign_keys_without_index",
            Diagnostic::TablesWithMissingIndexes => "tables_with_missing_indexes",
            Diagnostic::TablesWithoutPrimaryKey => "tables_without_primary_key",
            Diagnostic::IndexesWithNullValues => "indexes_with_null_values",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Diagnostic::InvalidIndexes => "Indexes left invalid by failed or cancelled builds",
            Diagnostic::DuplicatedIndexes => "Groups of indexes that share a definition",
            Diagnostic::IntersectedIndexes => {
                "Indexes whose leading columns are covered by another index on the same table"
            }
            Diagnostic::UnusedIndexes => "Indexes the planner hardly ever picks",
            Diagnostic::ForeignKeysWithoutIndex => {
                "Foreign key constraints with no index covering their columns"
            }
            Diagnostic::TablesWithMissingIndexes => {
                "Tables read by sequential scans far more often than by index"
            }
            Diagnostic::TablesWithoutPrimaryKey => "Tables without a primary key constraint",
            Diagnostic::IndexesWithNullValues => "Indexes whose leading column stores nulls",
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Diagnostic::UnusedIndexes | Diagnostic::TablesWithMissingIndexes => {
                Topology::AcrossCluster
            }
            _ => Topology::OnPrimary,
        }
    }

    /// Whether the findings carry a size the minimum-size filter can read.
    pub fn supports_size_filter(&self) -> bool {
        !matches!(
            self,
            Diagnostic::InvalidIndexes | Diagnostic::ForeignKeysWithoutIndex
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Diagnostic {
    type Err = CheckError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Diagnostic::all()
            .into_iter()
            .find(|diagnostic| diagnostic.name() == raw)
            .ok_or_else(|| {
                CheckError::InvalidArgument(format!(
                    "unknown diagnostic '{raw}', expected one of: {}",
                    Diagnostic::all().iter().map(Diagnostic::name).join(", ")
                ))
            })
    }
}

/// The filter a caller asks for, before it is bound to a finding type.
///
/// A name names the index for index diagnostics and the table for table
/// and constraint diagnostics; matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingFilter {
    All,
    ByName(String),
    BySize(i64),
}

/// Rejects filter and diagnostic combinations that cannot work, without
/// touching the database.
pub fn validate_filter(diagnostic: Diagnostic, filter: &FindingFilter) -> Result<(), CheckError> {
    match filter {
        FindingFilter::BySize(_) if !diagnostic.supports_size_filter() => {
            Err(size_filter_unsupported(diagnostic))
        }
        _ => Ok(()),
    }
}

fn size_filter_unsupported(diagnostic: Diagnostic) -> CheckError {
    CheckError::InvalidArgument(format!(
        "'{diagnostic}' findings carry no size, the minimum-size filter does not apply"
    ))
}

/// One merged finding, whatever its diagnostic.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Finding {
    Index(Index),
    IndexGroup(DuplicatedIndexes),
    UnusedIndex(UnusedIndex),
    ForeignKey(ForeignKey),
    TableWithMissingIndex(TableWithMissingIndex),
    Table(Table),
    IndexWithNulls(IndexWithNulls),
}

impl Finding {
    /// The label identifying the flagged object.
    pub fn object_name(&self) -> &str {
        match self {
            Finding::Index(index) => index.index_name(),
            Finding::IndexGroup(group) => group.table_name(),
            Finding::UnusedIndex(index) => index.index_name(),
            Finding::ForeignKey(fk) => fk.constraint_name(),
            Finding::TableWithMissingIndex(table) => table.table_name(),
            Finding::Table(table) => table.table_name(),
            Finding::IndexWithNulls(index) => index.index_name(),
        }
    }

    /// The full human rendering of the finding.
    pub fn details(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Index(index) => index.fmt(f),
            Finding::IndexGroup(group) => group.fmt(f),
            Finding::UnusedIndex(index) => index.fmt(f),
            Finding::ForeignKey(fk) => fk.fmt(f),
            Finding::TableWithMissingIndex(table) => table.fmt(f),
            Finding::Table(table) => table.fmt(f),
            Finding::IndexWithNulls(index) => index.fmt(f),
        }
    }
}

/// The merged verdict of one diagnostic over one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub diagnostic: Diagnostic,
    pub schema: String,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn is_healthy(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Runs one diagnostic across the cluster and merges the results.
///
/// The filter is bound to the diagnostic's finding type here; impossible
/// combinations fail with [`CheckError::InvalidArgument`] before any
/// query is sent.
pub async fn run_check<E>(
    diagnostic: Diagnostic,
    cluster: &ClusterConnection<E>,
    ctx: &PgContext,
    options: CheckOptions,
    filter: &FindingFilter,
) -> Result<CheckReport, CheckError>
where
    E: QueryExecutor + 'static,
{
    validate_filter(diagnostic, filter)?;

    let findings = match diagnostic {
        Diagnostic::InvalidIndexes => {
            let predicate: Box<dyn CheckPredicate<Index>> = match filter {
                FindingFilter::All => Box::new(AcceptAll),
                FindingFilter::ByName(name) => Box::new(FilterIndexesByName::new(name.as_str())?),
                FindingFilter::BySize(_) => return Err(size_filter_unsupported(diagnostic)),
            };
            run_filtered(
                HostCheck::invalid_indexes(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::Index,
            )
            .await?
        }
        Diagnostic::DuplicatedIndexes => {
            let predicate = index_group_predicate(filter)?;
            run_filtered(
                HostCheck::duplicated_indexes(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::IndexGroup,
            )
            .await?
        }
        Diagnostic::IntersectedIndexes => {
            let predicate = index_group_predicate(filter)?;
            run_filtered(
                HostCheck::intersected_indexes(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::IndexGroup,
            )
            .await?
        }
        Diagnostic::UnusedIndexes => {
            let predicate: Box<dyn CheckPredicate<UnusedIndex>> = match filter {
                FindingFilter::All => Box::new(AcceptAll),
                FindingFilter::ByName(name) => Box::new(FilterIndexesByName::new(name.as_str())?),
                FindingFilter::BySize(min) => Box::new(FilterBySize::new(*min)?),
            };
            run_filtered(
                HostCheck::unused_indexes(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::UnusedIndex,
            )
            .await?
        }
        Diagnostic::ForeignKeysWithoutIndex => {
            let predicate: Box<dyn CheckPredicate<ForeignKey>> = match filter {
                FindingFilter::All => Box::new(AcceptAll),
                FindingFilter::ByName(name) => Box::new(FilterTablesByName::new(name.as_str())?),
                FindingFilter::BySize(_) => return Err(size_filter_unsupported(diagnostic)),
            };
            run_filtered(
                HostCheck::foreign_keys_without_index(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::ForeignKey,
            )
            .await?
        }
        Diagnostic::TablesWithMissingIndexes => {
            let predicate: Box<dyn CheckPredicate<TableWithMissingIndex>> = match filter {
                FindingFilter::All => Box::new(AcceptAll),
                FindingFilter::ByName(name) => Box::new(FilterTablesByName::new(name.as_str())?),
                FindingFilter::BySize(min) => Box::new(FilterBySize::new(*min)?),
            };
            run_filtered(
                HostCheck::tables_with_missing_indexes(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::TableWithMissingIndex,
            )
            .await?
        }
        Diagnostic::TablesWithoutPrimaryKey => {
            let predicate: Box<dyn CheckPredicate<Table>> = match filter {
                FindingFilter::All => Box::new(AcceptAll),
                FindingFilter::ByName(name) => Box::new(FilterTablesByName::new(name.as_str())?),
                FindingFilter::BySize(min) => Box::new(FilterBySize::new(*min)?),
            };
            run_filtered(
                HostCheck::tables_without_primary_key(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::Table,
            )
            .await?
        }
        Diagnostic::IndexesWithNullValues => {
            let predicate: Box<dyn CheckPredicate<IndexWithNulls>> = match filter {
                FindingFilter::All => Box::new(AcceptAll),
                FindingFilter::ByName(name) => Box::new(FilterIndexesByName::new(name.as_str())?),
                FindingFilter::BySize(min) => Box::new(FilterBySize::new(*min)?),
            };
            run_filtered(
                HostCheck::indexes_with_null_values(),
                cluster,
                ctx,
                options,
                predicate.as_ref(),
                Finding::IndexWithNulls,
            )
            .await?
        }
    };

    Ok(CheckReport {
        diagnostic,
        schema: ctx.schema().to_string(),
        findings,
    })
}

fn index_group_predicate(
    filter: &FindingFilter,
) -> Result<Box<dyn CheckPredicate<DuplicatedIndexes>>, CheckError> {
    Ok(match filter {
        FindingFilter::All => Box::new(AcceptAll),
        FindingFilter::ByName(name) => Box::new(FilterIndexesByName::new(name.as_str())?),
        FindingFilter::BySize(min) => Box::new(FilterBySize::new(*min)?),
    })
}

async fn run_filtered<T, E>(
    check: HostCheck<T>,
    cluster: &ClusterConnection<E>,
    ctx: &PgContext,
    options: CheckOptions,
    predicate: &dyn CheckPredicate<T>,
    wrap: fn(T) -> Finding,
) -> Result<Vec<Finding>, CheckError>
where
    T: CheckFinding,
    E: QueryExecutor + 'static,
{
    let findings = ClusterCheck::with_options(check, options)
        .check_filtered(cluster, ctx, predicate)
        .await?;
    Ok(findings.into_iter().map(wrap).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::health::checks::test_executors::{long, text, StaticExecutor};
    use crate::infrastructure::postgres::CatalogRow;

    fn invalid_index_row(table: &str, index: &str) -> CatalogRow {
        CatalogRow::new(vec![
            text("table_name", table),
            text("index_name", index),
        ])
    }

    fn table_row(table: &str, size: i64) -> CatalogRow {
        CatalogRow::new(vec![
            text("table_name", table),
            long("table_size", size),
        ])
    }

    #[test]
    fn diagnostic_names_round_trip() {
        for diagnostic in Diagnostic::all() {
            assert_eq!(
                diagnostic.name().parse::<Diagnostic>().unwrap(),
                diagnostic
            );
        }
    }

    #[test]
    fn unknown_diagnostic_lists_the_valid_names() {
        let err = "bloated_indexes".parse::<Diagnostic>().unwrap_err();

        let message = err.to_string();
        assert!(message.contains("bloated_indexes"), "got: {message}");
        assert!(message.contains("unused_indexes"), "got: {message}");
        assert!(
            message.contains("tables_without_primary_key"),
            "got: {message}"
        );
    }

    #[test]
    fn only_statistics_diagnostics_span_the_cluster() {
        for diagnostic in Diagnostic::all() {
            let expected = matches!(
                diagnostic,
                Diagnostic::UnusedIndexes | Diagnostic::TablesWithMissingIndexes
            );
            assert_eq!(
                diagnostic.topology() == Topology::AcrossCluster,
                expected,
                "{diagnostic}"
            );
        }
    }

    #[test]
    fn size_filter_support_matches_the_finding_shape() {
        assert!(!Diagnostic::InvalidIndexes.supports_size_filter());
        assert!(!Diagnostic::ForeignKeysWithoutIndex.supports_size_filter());
        assert!(Diagnostic::DuplicatedIndexes.supports_size_filter());
        assert!(Diagnostic::TablesWithoutPrimaryKey.supports_size_filter());
    }

    #[test]
    fn filter_validation_rejects_sizeless_combinations() {
        let err =
            validate_filter(Diagnostic::InvalidIndexes, &FindingFilter::BySize(100)).unwrap_err();
        assert!(matches!(err, CheckError::InvalidArgument(_)));

        validate_filter(Diagnostic::InvalidIndexes, &FindingFilter::All).unwrap();
        validate_filter(
            Diagnostic::InvalidIndexes,
            &FindingFilter::ByName("i_a".to_string()),
        )
        .unwrap();
        validate_filter(Diagnostic::UnusedIndexes, &FindingFilter::BySize(100)).unwrap();
    }

    #[test]
    fn row_errors_surface_as_malformed_responses() {
        let row = CatalogRow::new(Vec::new());
        let err: CheckError = row.text("table_name").unwrap_err().into();

        assert!(matches!(err, CheckError::Malformed(_)));
        assert!(err.to_string().contains("table_name"));
    }

    #[tokio::test]
    async fn run_check_dispatches_and_reports() {
        let cluster = ClusterConnection::single(StaticExecutor::with_rows(
            "primary",
            vec![invalid_index_row("clients", "i_a")],
        ));

        let report = run_check(
            Diagnostic::InvalidIndexes,
            &cluster,
            &PgContext::default(),
            CheckOptions::default(),
            &FindingFilter::All,
        )
        .await
        .unwrap();

        assert_eq!(report.diagnostic, Diagnostic::InvalidIndexes);
        assert_eq!(report.schema, "public");
        assert!(!report.is_healthy());
        assert_eq!(report.findings[0].object_name(), "i_a");
    }

    #[tokio::test]
    async fn name_filters_bind_to_the_index_for_index_diagnostics() {
        let cluster = ClusterConnection::single(StaticExecutor::with_rows(
            "primary",
            vec![
                invalid_index_row("clients", "i_a"),
                invalid_index_row("clients", "i_b"),
            ],
        ));

        let report = run_check(
            Diagnostic::InvalidIndexes,
            &cluster,
            &PgContext::default(),
            CheckOptions::default(),
            &FindingFilter::ByName("i_b".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].object_name(), "i_b");
    }

    #[tokio::test]
    async fn name_filters_bind_to_the_table_for_table_diagnostics() {
        let cluster = ClusterConnection::single(StaticExecutor::with_rows(
            "primary",
            vec![table_row("accounts", 512), table_row("clients", 1024)],
        ));

        let report = run_check(
            Diagnostic::TablesWithoutPrimaryKey,
            &cluster,
            &PgContext::default(),
            CheckOptions::default(),
            &FindingFilter::ByName("accounts".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].object_name(), "accounts");
    }

    #[tokio::test]
    async fn impossible_size_filters_fail_before_any_query() {
        let primary = Arc::new(StaticExecutor::with_rows("primary", Vec::new()));
        let cluster = ClusterConnection::new(Arc::clone(&primary), Vec::new());

        let err = run_check(
            Diagnostic::ForeignKeysWithoutIndex,
            &cluster,
            &PgContext::default(),
            CheckOptions::default(),
            &FindingFilter::BySize(1024),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CheckError::InvalidArgument(_)));
        assert_eq!(primary.hits(), 0);
    }

    #[tokio::test]
    async fn reports_serialize_flat_findings() {
        let cluster = ClusterConnection::single(StaticExecutor::with_rows(
            "primary",
            vec![table_row("accounts", 512)],
        ));

        let report = run_check(
            Diagnostic::TablesWithoutPrimaryKey,
            &cluster,
            &PgContext::default(),
            CheckOptions::default(),
            &FindingFilter::All,
        )
        .await
        .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostic"], "tables_without_primary_key");
        assert_eq!(json["schema"], "public");
        assert_eq!(json["findings"][0]["table_name"], "accounts");
        assert_eq!(json["findings"][0]["table_size_in_bytes"], 512);
    }

    #[tokio::test]
    async fn timed_out_checks_mention_their_budget() {
        let options = CheckOptions {
            timeout: Duration::from_millis(20),
            ..CheckOptions::default()
        };
        let cluster = ClusterConnection::single(StaticExecutor::delayed(
            "primary",
            Vec::new(),
            Duration::from_millis(500),
        ));

        let err = run_check(
            Diagnostic::TablesWithoutPrimaryKey,
            &cluster,
            &PgContext::default(),
            options,
            &FindingFilter::All,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("20ms"), "got: {err}");
    }
}
