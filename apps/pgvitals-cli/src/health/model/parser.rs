//! Parser for the textual index-group descriptors the grouping queries
//! emit, e.g. `idx=i_one, size=100; idx=i_two, size=200`.

use crate::health::CheckError;

const ENTRY_SEPARATOR: &str = "; ";
const INDEX_PREFIX: &str = "idx=";
const SIZE_PREFIX: &str = "size=";

/// Splits a descriptor into `(index name, size in bytes)` pairs, in input
/// order.
///
/// Entries are separated by `"; "`, fields within an entry by `","`, and
/// fields are trimmed before the prefix test. A segment that does not
/// carry both the `idx=` and `size=` prefixes is dropped silently; a size
/// that is not an integer is an error; blank input is rejected outright.
/// No deduplication happens here.
pub fn parse_duplicated_indexes(raw: &str) -> Result<Vec<(String, i64)>, CheckError> {
    if raw.trim().is_empty() {
        return Err(CheckError::InvalidArgument(
            "index-group descriptor cannot be blank".to_string(),
        ));
    }

    let mut entries = Vec::new();
    for segment in raw.split(ENTRY_SEPARATOR) {
        let mut fields = segment.split(',');
        let (Some(name_field), Some(size_field)) = (fields.next(), fields.next()) else {
            continue;
        };
        let (Some(name), Some(size_text)) = (
            name_field.trim().strip_prefix(INDEX_PREFIX),
            size_field.trim().strip_prefix(SIZE_PREFIX),
        ) else {
            continue;
        };
        let size = size_text.parse::<i64>().map_err(|_| {
            CheckError::Malformed(format!(
                "index size '{size_text}' in descriptor segment '{segment}' is not an integer"
            ))
        })?;
        entries.push((name.to_string(), size));
    }
    Ok(entries)
}
