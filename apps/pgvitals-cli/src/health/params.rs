//! Server parameter inspection.
//!
//! Parameters are read from `pg_settings` on the primary only; replicas
//! may legitimately run with different memory settings, so there is no
//! cluster-wide verdict to merge here.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::health::checks::queries;
use crate::health::model::validate_object_name;
use crate::health::CheckError;
use crate::infrastructure::postgres::{CatalogRow, QueryExecutor};

/// One server parameter with its current value.
#[derive(Debug, Clone, Serialize)]
pub struct PgParam {
    name: String,
    value: String,
}

impl PgParam {
    /// The value is trimmed and may be empty; `pg_settings` reports some
    /// parameters (like `search_path` overrides) as blank strings.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, CheckError> {
        Ok(Self {
            name: validate_object_name("parameter", &name.into())?,
            value: value.into().trim().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Identity is the parameter name; two readings of the same parameter are
/// the same parameter regardless of value.
impl PartialEq for PgParam {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PgParam {}

impl Hash for PgParam {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for PgParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Parameters worth tuning on any production server.
///
/// The listed defaults are the stock values shipped in `postgresql.conf`;
/// they are reported for context next to an untuned parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportantParam {
    SharedBuffers,
    WorkMem,
    MaintenanceWorkMem,
    RandomPageCost,
    EffectiveCacheSize,
    StatementTimeout,
    LockTimeout,
    IdleInTransactionSessionTimeout,
    LogMinDurationStatement,
}

impl ImportantParam {
    pub fn all() -> [ImportantParam; 9] {
        [
            ImportantParam::SharedBuffers,
            ImportantParam::WorkMem,
            ImportantParam::MaintenanceWorkMem,
            ImportantParam::RandomPageCost,
            ImportantParam::EffectiveCacheSize,
            ImportantParam::StatementTimeout,
            ImportantParam::LockTimeout,
            ImportantParam::IdleInTransactionSessionTimeout,
            ImportantParam::LogMinDurationStatement,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImportantParam::SharedBuffers => "shared_buffers",
            ImportantParam::WorkMem => "work_mem",
            ImportantParam::MaintenanceWorkMem => "maintenance_work_mem",
            ImportantParam::RandomPageCost => "random_page_cost",
            ImportantParam::EffectiveCacheSize => "effective_cache_size",
            ImportantParam::StatementTimeout => "statement_timeout",
            ImportantParam::LockTimeout => "lock_timeout",
            ImportantParam::IdleInTransactionSessionTimeout => {
                "idle_in_transaction_session_timeout"
            }
            ImportantParam::LogMinDurationStatement => "log_min_duration_statement",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            ImportantParam::SharedBuffers => "128MB",
            ImportantParam::WorkMem => "4MB",
            ImportantParam::MaintenanceWorkMem => "64MB",
            ImportantParam::RandomPageCost => "4",
            ImportantParam::EffectiveCacheSize => "4GB",
            ImportantParam::StatementTimeout => "0",
            ImportantParam::LockTimeout => "0",
            ImportantParam::IdleInTransactionSessionTimeout => "0",
            ImportantParam::LogMinDurationStatement => "-1",
        }
    }
}

impl fmt::Display for ImportantParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every parameter the server reports, with its current value.
pub async fn current_values<E>(executor: &E) -> Result<Vec<PgParam>, CheckError>
where
    E: QueryExecutor + ?Sized,
{
    let rows = run_params_query(executor, queries::PARAMS_CURRENT_VALUES).await?;
    rows.iter().map(map_param).collect()
}

/// The important parameters nobody has tuned yet.
///
/// Untuned means the server still runs the compiled-in value, which
/// `pg_settings` reports as `source = 'default'`. Comparing sources
/// instead of value strings sidesteps unit normalization; the server
/// reports `shared_buffers` in pages, not the `128MB` the docs print.
pub async fn params_with_default_values<E>(executor: &E) -> Result<Vec<PgParam>, CheckError>
where
    E: QueryExecutor + ?Sized,
{
    let important: HashSet<&str> = ImportantParam::all()
        .iter()
        .map(ImportantParam::name)
        .collect();
    let rows = run_params_query(executor, queries::PARAMS_AT_STOCK_DEFAULT).await?;
    let params = rows.iter().map(map_param).collect::<Result<Vec<_>, _>>()?;
    Ok(params
        .into_iter()
        .filter(|param| important.contains(param.name()))
        .collect())
}

async fn run_params_query<E>(executor: &E, sql: &str) -> Result<Vec<CatalogRow>, CheckError>
where
    E: QueryExecutor + ?Sized,
{
    executor
        .query(sql)
        .await
        .map_err(|source| CheckError::QueryFailed {
            node: executor.node_name().to_string(),
            source,
        })
}

fn map_param(row: &CatalogRow) -> Result<PgParam, CheckError> {
    PgParam::new(row.text("name")?, row.text("setting")?)
}
