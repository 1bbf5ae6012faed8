//! Execution of one diagnostic against a single node.

use crate::health::checks::queries;
use crate::health::model::{
    DuplicatedIndexes, ForeignKey, Index, IndexWithNulls, PgContext, Table, TableWithMissingIndex,
    UnusedIndex,
};
use crate::health::{CheckError, Diagnostic};
use crate::infrastructure::postgres::{CatalogRow, QueryExecutor};

/// Turns one catalog row into a typed finding.
pub type RowMapper<T> = fn(&PgContext, &CatalogRow) -> Result<T, CheckError>;

/// One diagnostic bound to its catalog query and row mapper.
///
/// A host check runs against exactly one node and reports what that node
/// sees; it does not retry and it does not merge. An empty result set is a
/// clean bill of health, never an error.
pub struct HostCheck<T> {
    diagnostic: Diagnostic,
    sql: &'static str,
    mapper: RowMapper<T>,
}

impl<T> Clone for HostCheck<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for HostCheck<T> {}

impl<T> HostCheck<T> {
    fn new(diagnostic: Diagnostic, sql: &'static str, mapper: RowMapper<T>) -> Self {
        Self {
            diagnostic,
            sql,
            mapper,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        self.diagnostic
    }

    /// Runs the query on one node and maps every row.
    ///
    /// Driver failures are tagged with the node they came from; a row the
    /// mapper cannot read is a malformed server response and fails the
    /// whole node, partial results are never returned.
    pub async fn check<E>(&self, executor: &E, ctx: &PgContext) -> Result<Vec<T>, CheckError>
    where
        E: QueryExecutor + ?Sized,
    {
        let rows = executor
            .query_with_schema(self.sql, ctx.schema())
            .await
            .map_err(|source| CheckError::QueryFailed {
                node: executor.node_name().to_string(),
                source,
            })?;
        rows.iter().map(|row| (self.mapper)(ctx, row)).collect()
    }
}

impl HostCheck<Index> {
    pub fn invalid_indexes() -> Self {
        Self::new(
            Diagnostic::InvalidIndexes,
            queries::INVALID_INDEXES,
            map_index,
        )
    }
}

impl HostCheck<DuplicatedIndexes> {
    pub fn duplicated_indexes() -> Self {
        Self::new(
            Diagnostic::DuplicatedIndexes,
            queries::DUPLICATED_INDEXES,
            map_index_group,
        )
    }

    pub fn intersected_indexes() -> Self {
        Self::new(
            Diagnostic::IntersectedIndexes,
            queries::INTERSECTED_INDEXES,
            map_index_group,
        )
    }
}

impl HostCheck<UnusedIndex> {
    pub fn unused_indexes() -> Self {
        Self::new(
            Diagnostic::UnusedIndexes,
            queries::UNUSED_INDEXES,
            map_unused_index,
        )
    }
}

impl HostCheck<ForeignKey> {
    pub fn foreign_keys_without_index() -> Self {
        Self::new(
            Diagnostic::ForeignKeysWithoutIndex,
            queries::FOREIGN_KEYS_WITHOUT_INDEX,
            map_foreign_key,
        )
    }
}

impl HostCheck<TableWithMissingIndex> {
    pub fn tables_with_missing_indexes() -> Self {
        Self::new(
            Diagnostic::TablesWithMissingIndexes,
            queries::TABLES_WITH_MISSING_INDEXES,
            map_table_with_missing_index,
        )
    }
}

impl HostCheck<Table> {
    pub fn tables_without_primary_key() -> Self {
        Self::new(
            Diagnostic::TablesWithoutPrimaryKey,
            queries::TABLES_WITHOUT_PRIMARY_KEY,
            map_table,
        )
    }
}

impl HostCheck<IndexWithNulls> {
    pub fn indexes_with_null_values() -> Self {
        Self::new(
            Diagnostic::IndexesWithNullValues,
            queries::INDEXES_WITH_NULL_VALUES,
            map_index_with_nulls,
        )
    }
}

fn map_index(ctx: &PgContext, row: &CatalogRow) -> Result<Index, CheckError> {
    Index::new(
        ctx.enrich_with_schema(row.text("table_name")?),
        ctx.enrich_with_schema(row.text("index_name")?),
    )
}

fn map_index_group(ctx: &PgContext, row: &CatalogRow) -> Result<DuplicatedIndexes, CheckError> {
    DuplicatedIndexes::from_descriptor(ctx, row.text("table_name")?, row.text("grouped_indexes")?)
}

fn map_unused_index(ctx: &PgContext, row: &CatalogRow) -> Result<UnusedIndex, CheckError> {
    UnusedIndex::new(
        ctx.enrich_with_schema(row.text("table_name")?),
        ctx.enrich_with_schema(row.text("index_name")?),
        row.long("index_size")?,
        row.long("index_scans")?,
    )
}

// Constraint names already live inside the table's schema, only the table
// gets qualified.
fn map_foreign_key(ctx: &PgContext, row: &CatalogRow) -> Result<ForeignKey, CheckError> {
    ForeignKey::new(
        ctx.enrich_with_schema(row.text("table_name")?),
        row.text("constraint_name")?,
        row.text_array("columns")?,
    )
}

fn map_table_with_missing_index(
    ctx: &PgContext,
    row: &CatalogRow,
) -> Result<TableWithMissingIndex, CheckError> {
    TableWithMissingIndex::new(
        ctx.enrich_with_schema(row.text("table_name")?),
        row.long("table_size")?,
        row.long("seq_scans")?,
        row.long("index_scans")?,
    )
}

fn map_table(ctx: &PgContext, row: &CatalogRow) -> Result<Table, CheckError> {
    Table::new(
        ctx.enrich_with_schema(row.text("table_name")?),
        row.long("table_size")?,
    )
}

fn map_index_with_nulls(ctx: &PgContext, row: &CatalogRow) -> Result<IndexWithNulls, CheckError> {
    IndexWithNulls::new(
        ctx.enrich_with_schema(row.text("table_name")?),
        ctx.enrich_with_schema(row.text("index_name")?),
        row.long("index_size")?,
        row.text("nullable_column")?,
    )
}
