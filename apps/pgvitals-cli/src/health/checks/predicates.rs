//! Composable filters applied to merged findings.
//!
//! Filtering always happens after the per-node lists are merged, and the
//! engine applies a predicate unconditionally; [`AcceptAll`] is the
//! neutral element used when a caller wants everything.

use crate::health::model::{
    validate_non_negative, validate_object_name, DuplicatedIndexes, IndexNameAware, SizeAware,
    TableNameAware,
};
use crate::health::CheckError;

/// A filter over merged findings. Returning true keeps the finding.
pub trait CheckPredicate<T>: Send + Sync {
    fn test(&self, finding: &T) -> bool;
}

/// The neutral filter: keeps everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<T> CheckPredicate<T> for AcceptAll {
    fn test(&self, _finding: &T) -> bool {
        true
    }
}

/// Keeps findings whose table name equals the target, byte for byte.
#[derive(Debug, Clone)]
pub struct FilterTablesByName {
    table_name: String,
}

impl FilterTablesByName {
    pub fn new(table_name: impl Into<String>) -> Result<Self, CheckError> {
        Ok(Self {
            table_name: validate_object_name("table", &table_name.into())?,
        })
    }
}

impl<T: TableNameAware> CheckPredicate<T> for FilterTablesByName {
    fn test(&self, finding: &T) -> bool {
        finding.table_name() == self.table_name
    }
}

/// Keeps findings whose index name equals the target, byte for byte.
#[derive(Debug, Clone)]
pub struct FilterIndexesByName {
    index_name: String,
}

impl FilterIndexesByName {
    pub fn new(index_name: impl Into<String>) -> Result<Self, CheckError> {
        Ok(Self {
            index_name: validate_object_name("index", &index_name.into())?,
        })
    }
}

impl<T: IndexNameAware> CheckPredicate<T> for FilterIndexesByName {
    fn test(&self, finding: &T) -> bool {
        finding.index_name() == self.index_name
    }
}

/// An index group matches when any member carries the target name.
impl CheckPredicate<DuplicatedIndexes> for FilterIndexesByName {
    fn test(&self, finding: &DuplicatedIndexes) -> bool {
        finding
            .index_names()
            .iter()
            .any(|name| *name == self.index_name)
    }
}

/// Keeps findings whose observed size is at least the minimum, inclusive.
#[derive(Debug, Clone, Copy)]
pub struct FilterBySize {
    min_size_in_bytes: i64,
}

impl FilterBySize {
    pub fn new(min_size_in_bytes: i64) -> Result<Self, CheckError> {
        Ok(Self {
            min_size_in_bytes: validate_non_negative("minimum size", min_size_in_bytes)?,
        })
    }
}

impl<T: SizeAware> CheckPredicate<T> for FilterBySize {
    fn test(&self, finding: &T) -> bool {
        finding.size_in_bytes() >= self.min_size_in_bytes
    }
}
