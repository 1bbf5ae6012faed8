//! Finding types produced by the health checks.
//!
//! Every type here identifies a database object by qualified name and may
//! carry per-node observations (sizes, scan counts) next to that identity.
//! Equality and hashing are deliberately restricted to the identity
//! attributes so that the same object reported by several nodes collapses
//! to a single finding when the per-node lists are merged.

pub mod context;
pub mod foreign_key;
pub mod index;
pub mod parser;
pub mod table;

pub use context::PgContext;
pub use foreign_key::ForeignKey;
pub use index::{DuplicatedIndexes, Index, IndexWithNulls, IndexWithSize, UnusedIndex};
pub use table::{Table, TableWithMissingIndex};

use crate::health::CheckError;

/// Findings that name the table they concern.
pub trait TableNameAware {
    fn table_name(&self) -> &str;
}

/// Findings that name a single index.
pub trait IndexNameAware {
    fn index_name(&self) -> &str;
}

/// Findings that carry an observed on-disk size.
pub trait SizeAware {
    fn size_in_bytes(&self) -> i64;
}

/// Marker for findings that can be merged across cluster nodes.
///
/// Implementors must keep equality and hashing on identity attributes
/// (object names) only. Observed magnitudes stay out of both, so two nodes
/// reporting the same object with different numbers deduplicate to the
/// first occurrence.
pub trait CheckFinding: Clone + Eq + std::hash::Hash + Send + Sync + 'static {}

pub(crate) fn validate_object_name(kind: &str, name: &str) -> Result<String, CheckError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CheckError::InvalidArgument(format!(
            "{kind} name cannot be blank"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_non_negative(field: &str, value: i64) -> Result<i64, CheckError> {
    if value < 0 {
        return Err(CheckError::InvalidArgument(format!(
            "{field} cannot be negative, got {value}"
        )));
    }
    Ok(value)
}
