//! Table-level findings.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::health::model::{
    validate_non_negative, validate_object_name, CheckFinding, SizeAware, TableNameAware,
};
use crate::health::CheckError;

/// A table with its observed on-disk size.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    table_name: String,
    table_size_in_bytes: i64,
}

impl Table {
    pub fn new(table_name: impl Into<String>, table_size_in_bytes: i64) -> Result<Self, CheckError> {
        Ok(Self {
            table_name: validate_object_name("table", &table_name.into())?,
            table_size_in_bytes: validate_non_negative("table size", table_size_in_bytes)?,
        })
    }
}

/// Identity is the qualified table name; the observed size is a per-node
/// magnitude and stays out of equality and hashing.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.table_name == other.table_name
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table_name.hash(state);
    }
}

impl TableNameAware for Table {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl SizeAware for Table {
    fn size_in_bytes(&self) -> i64 {
        self.table_size_in_bytes
    }
}

impl CheckFinding for Table {}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.table_name, self.table_size_in_bytes)
    }
}

/// A table whose sequential scans dwarf its index usage.
#[derive(Debug, Clone, Serialize)]
pub struct TableWithMissingIndex {
    #[serde(flatten)]
    table: Table,
    seq_scans: i64,
    index_scans: i64,
}

impl TableWithMissingIndex {
    pub fn new(
        table_name: impl Into<String>,
        table_size_in_bytes: i64,
        seq_scans: i64,
        index_scans: i64,
    ) -> Result<Self, CheckError> {
        Ok(Self {
            table: Table::new(table_name, table_size_in_bytes)?,
            seq_scans: validate_non_negative("sequential scan count", seq_scans)?,
            index_scans: validate_non_negative("index scan count", index_scans)?,
        })
    }

    pub fn seq_scans(&self) -> i64 {
        self.seq_scans
    }

    pub fn index_scans(&self) -> i64 {
        self.index_scans
    }
}

/// Identity is the table name alone; scan counters differ per node and
/// must not split one table into several findings.
impl PartialEq for TableWithMissingIndex {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

impl Eq for TableWithMissingIndex {}

impl Hash for TableWithMissingIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
    }
}

impl TableNameAware for TableWithMissingIndex {
    fn table_name(&self) -> &str {
        self.table.table_name()
    }
}

impl SizeAware for TableWithMissingIndex {
    fn size_in_bytes(&self) -> i64 {
        self.table.size_in_bytes()
    }
}

impl CheckFinding for TableWithMissingIndex {}

impl fmt::Display for TableWithMissingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bytes, {} seq scans, {} index scans)",
            self.table.table_name(),
            self.table.size_in_bytes(),
            self.seq_scans,
            self.index_scans
        )
    }
}
