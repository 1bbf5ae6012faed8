//! Schema context for qualifying object names.

use std::fmt;

use serde::Serialize;

use crate::health::CheckError;

/// The schema a check inspects.
///
/// All row mappers qualify object names through the context, so the same
/// object observed on different nodes always yields byte-identical names.
/// Without that, `accounts` seen by one node and `custom.accounts` seen by
/// another would be treated as different findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PgContext {
    schema: String,
}

impl PgContext {
    pub const DEFAULT_SCHEMA: &'static str = "public";

    pub fn new(schema: impl Into<String>) -> Result<Self, CheckError> {
        let schema = schema.into();
        let trimmed = schema.trim();
        if trimmed.is_empty() {
            return Err(CheckError::InvalidArgument(
                "schema name cannot be blank".to_string(),
            ));
        }
        Ok(Self {
            schema: trimmed.to_string(),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Prefixes a bare object name with this context's schema.
    ///
    /// Names that already carry a schema, and names in the default
    /// `public` schema, pass through unchanged.
    pub fn enrich_with_schema(&self, name: &str) -> String {
        if name.contains('.') || self.schema == Self::DEFAULT_SCHEMA {
            return name.to_string();
        }
        format!("{}.{}", self.schema, name)
    }
}

impl Default for PgContext {
    fn default() -> Self {
        Self {
            schema: Self::DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl fmt::Display for PgContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_schema_leaves_names_bare() {
        let ctx = PgContext::default();

        assert_eq!(ctx.schema(), "public");
        assert_eq!(ctx.enrich_with_schema("clients"), "clients");
    }

    #[test]
    fn custom_schema_prefixes_names() {
        let ctx = PgContext::new("billing").unwrap();

        assert_eq!(ctx.enrich_with_schema("clients"), "billing.clients");
    }

    #[test]
    fn qualified_names_pass_through() {
        let ctx = PgContext::new("billing").unwrap();

        assert_eq!(ctx.enrich_with_schema("audit.clients"), "audit.clients");
        assert_eq!(ctx.enrich_with_schema("billing.clients"), "billing.clients");
    }

    #[test]
    fn blank_schema_is_rejected() {
        assert!(matches!(
            PgContext::new("   "),
            Err(CheckError::InvalidArgument(_))
        ));
    }

    #[test]
    fn schema_is_trimmed() {
        let ctx = PgContext::new("  billing ").unwrap();

        assert_eq!(ctx.schema(), "billing");
    }
}
