//! Index-level findings.

use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::Serialize;

use crate::health::model::parser::parse_duplicated_indexes;
use crate::health::model::{
    validate_non_negative, validate_object_name, CheckFinding, IndexNameAware, PgContext,
    SizeAware, TableNameAware,
};
use crate::health::CheckError;

/// An index, identified by its own name and the table it belongs to.
///
/// Both fields are identity attributes, so derived equality is exact here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Index {
    table_name: String,
    index_name: String,
}

impl Index {
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Result<Self, CheckError> {
        Ok(Self {
            table_name: validate_object_name("table", &table_name.into())?,
            index_name: validate_object_name("index", &index_name.into())?,
        })
    }
}

impl TableNameAware for Index {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl IndexNameAware for Index {
    fn index_name(&self) -> &str {
        &self.index_name
    }
}

impl CheckFinding for Index {}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.index_name, self.table_name)
    }
}

/// An index with its observed on-disk size.
#[derive(Debug, Clone, Serialize)]
pub struct IndexWithSize {
    #[serde(flatten)]
    index: Index,
    index_size_in_bytes: i64,
}

impl IndexWithSize {
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        index_size_in_bytes: i64,
    ) -> Result<Self, CheckError> {
        Ok(Self {
            index: Index::new(table_name, index_name)?,
            index_size_in_bytes: validate_non_negative("index size", index_size_in_bytes)?,
        })
    }
}

/// Identity is the index name pair; size is a per-node magnitude.
impl PartialEq for IndexWithSize {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for IndexWithSize {}

impl Hash for IndexWithSize {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl TableNameAware for IndexWithSize {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexNameAware for IndexWithSize {
    fn index_name(&self) -> &str {
        self.index.index_name()
    }
}

impl SizeAware for IndexWithSize {
    fn size_in_bytes(&self) -> i64 {
        self.index_size_in_bytes
    }
}

impl CheckFinding for IndexWithSize {}

impl fmt::Display for IndexWithSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.index, self.index_size_in_bytes)
    }
}

/// An index the planner never (or hardly ever) used.
#[derive(Debug, Clone, Serialize)]
pub struct UnusedIndex {
    #[serde(flatten)]
    index: IndexWithSize,
    index_scans: i64,
}

impl UnusedIndex {
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        index_size_in_bytes: i64,
        index_scans: i64,
    ) -> Result<Self, CheckError> {
        Ok(Self {
            index: IndexWithSize::new(table_name, index_name, index_size_in_bytes)?,
            index_scans: validate_non_negative("index scan count", index_scans)?,
        })
    }

    pub fn index_scans(&self) -> i64 {
        self.index_scans
    }
}

impl PartialEq for UnusedIndex {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for UnusedIndex {}

impl Hash for UnusedIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl TableNameAware for UnusedIndex {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexNameAware for UnusedIndex {
    fn index_name(&self) -> &str {
        self.index.index_name()
    }
}

impl SizeAware for UnusedIndex {
    fn size_in_bytes(&self) -> i64 {
        self.index.size_in_bytes()
    }
}

impl CheckFinding for UnusedIndex {}

impl fmt::Display for UnusedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} scans", self.index, self.index_scans)
    }
}

/// An index whose leading column accepts nulls.
#[derive(Debug, Clone, Serialize)]
pub struct IndexWithNulls {
    #[serde(flatten)]
    index: IndexWithSize,
    nullable_column: String,
}

impl IndexWithNulls {
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        index_size_in_bytes: i64,
        nullable_column: impl Into<String>,
    ) -> Result<Self, CheckError> {
        Ok(Self {
            index: IndexWithSize::new(table_name, index_name, index_size_in_bytes)?,
            nullable_column: validate_object_name("column", &nullable_column.into())?,
        })
    }

    pub fn nullable_column(&self) -> &str {
        &self.nullable_column
    }
}

impl PartialEq for IndexWithNulls {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for IndexWithNulls {}

impl Hash for IndexWithNulls {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl TableNameAware for IndexWithNulls {
    fn table_name(&self) -> &str {
        self.index.table_name()
    }
}

impl IndexNameAware for IndexWithNulls {
    fn index_name(&self) -> &str {
        self.index.index_name()
    }
}

impl SizeAware for IndexWithNulls {
    fn size_in_bytes(&self) -> i64 {
        self.index.size_in_bytes()
    }
}

impl CheckFinding for IndexWithNulls {}

impl fmt::Display for IndexWithNulls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, nullable column '{}'", self.index, self.nullable_column)
    }
}

/// A group of indexes on one table that share a definition (or intersect
/// on their leading columns).
///
/// Deliberately not [`IndexNameAware`]: the group has several index names,
/// and the by-name predicate matches when any member matches.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatedIndexes {
    indexes: Vec<IndexWithSize>,
    total_size: i64,
}

impl DuplicatedIndexes {
    /// Builds a group from its members. Members are stored sorted by index
    /// name, which makes group identity independent of input order.
    pub fn new(indexes: Vec<IndexWithSize>) -> Result<Self, CheckError> {
        if indexes.len() < 2 {
            return Err(CheckError::InvalidArgument(format!(
                "a duplicated-index group needs at least two indexes, got {}",
                indexes.len()
            )));
        }
        let mut indexes = indexes;
        indexes.sort_by(|a, b| a.index_name().cmp(b.index_name()));
        let total_size = indexes.iter().map(SizeAware::size_in_bytes).sum();
        Ok(Self {
            indexes,
            total_size,
        })
    }

    /// Builds a group from the textual descriptor the grouping queries
    /// emit, qualifying every name through the context.
    pub fn from_descriptor(
        ctx: &PgContext,
        table_name: &str,
        descriptor: &str,
    ) -> Result<Self, CheckError> {
        let table_name = ctx.enrich_with_schema(table_name);
        let members = parse_duplicated_indexes(descriptor)?
            .into_iter()
            .map(|(index_name, size)| {
                IndexWithSize::new(table_name.clone(), ctx.enrich_with_schema(&index_name), size)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(members)
    }

    pub fn indexes(&self) -> &[IndexWithSize] {
        &self.indexes
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(IndexNameAware::index_name).collect()
    }

    pub fn total_size(&self) -> i64 {
        self.total_size
    }
}

/// Two groups are the same finding when they cover the same indexes.
/// Member equality already ignores sizes, and members are name-sorted at
/// construction, so list comparison is set comparison here. The derived
/// total stays out for the same reason the member sizes do.
impl PartialEq for DuplicatedIndexes {
    fn eq(&self, other: &Self) -> bool {
        self.indexes == other.indexes
    }
}

impl Eq for DuplicatedIndexes {}

impl Hash for DuplicatedIndexes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for index in &self.indexes {
            index.hash(state);
        }
    }
}

impl TableNameAware for DuplicatedIndexes {
    fn table_name(&self) -> &str {
        self.indexes[0].table_name()
    }
}

impl SizeAware for DuplicatedIndexes {
    fn size_in_bytes(&self) -> i64 {
        self.total_size
    }
}

impl CheckFinding for DuplicatedIndexes {}

impl fmt::Display for DuplicatedIndexes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = self
            .indexes
            .iter()
            .map(|index| format!("{} ({} bytes)", index.index_name(), index.size_in_bytes()))
            .join(", ");
        write!(
            f,
            "{}: {}; {} bytes total",
            self.table_name(),
            members,
            self.total_size
        )
    }
}
