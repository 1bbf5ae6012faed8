//! Driver-independent representation of catalog query results.

/// A single value from a catalog or statistics row.
///
/// Integer column types are widened to `Long`; the catalog queries only
/// ever read text, integers, booleans and text arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogValue {
    Text(String),
    Long(i64),
    Bool(bool),
    TextArray(Vec<String>),
    Null,
}

impl CatalogValue {
    fn type_name(&self) -> &'static str {
        match self {
            CatalogValue::Text(_) => "text",
            CatalogValue::Long(_) => "integer",
            CatalogValue::Bool(_) => "boolean",
            CatalogValue::TextArray(_) => "text array",
            CatalogValue::Null => "null",
        }
    }
}

/// One result row with name-addressed columns.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    columns: Vec<(String, CatalogValue)>,
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("column '{0}' is missing from the result row")]
    MissingColumn(String),

    #[error("column '{column}' holds {found}, expected {expected}")]
    UnexpectedType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl CatalogRow {
    pub fn new(columns: Vec<(String, CatalogValue)>) -> Self {
        Self { columns }
    }

    fn find(&self, column: &str) -> Result<&CatalogValue, RowError> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| RowError::MissingColumn(column.to_string()))
    }

    pub fn text(&self, column: &str) -> Result<&str, RowError> {
        match self.find(column)? {
            CatalogValue::Text(value) => Ok(value),
            other => Err(RowError::UnexpectedType {
                column: column.to_string(),
                expected: "text",
                found: other.type_name(),
            }),
        }
    }

    pub fn long(&self, column: &str) -> Result<i64, RowError> {
        match self.find(column)? {
            CatalogValue::Long(value) => Ok(*value),
            other => Err(RowError::UnexpectedType {
                column: column.to_string(),
                expected: "integer",
                found: other.type_name(),
            }),
        }
    }

    pub fn text_array(&self, column: &str) -> Result<Vec<String>, RowError> {
        match self.find(column)? {
            CatalogValue::TextArray(values) => Ok(values.clone()),
            other => Err(RowError::UnexpectedType {
                column: column.to_string(),
                expected: "text array",
                found: other.type_name(),
            }),
        }
    }
}
