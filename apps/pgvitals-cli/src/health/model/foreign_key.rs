//! Foreign-key findings.

use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::Serialize;

use crate::health::model::{validate_object_name, CheckFinding, TableNameAware};
use crate::health::CheckError;

/// A foreign-key constraint and the columns it covers.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    table_name: String,
    constraint_name: String,
    columns_in_constraint: Vec<String>,
}

impl ForeignKey {
    pub fn new(
        table_name: impl Into<String>,
        constraint_name: impl Into<String>,
        columns_in_constraint: Vec<String>,
    ) -> Result<Self, CheckError> {
        if columns_in_constraint.is_empty() {
            return Err(CheckError::InvalidArgument(
                "a foreign key must cover at least one column".to_string(),
            ));
        }
        let columns_in_constraint = columns_in_constraint
            .iter()
            .map(|column| validate_object_name("column", column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            table_name: validate_object_name("table", &table_name.into())?,
            constraint_name: validate_object_name("constraint", &constraint_name.into())?,
            columns_in_constraint,
        })
    }

    pub fn constraint_name(&self) -> &str {
        &self.constraint_name
    }

    pub fn columns_in_constraint(&self) -> &[String] {
        &self.columns_in_constraint
    }
}

/// Identity is the table plus the constraint name; the column list rides
/// along for reporting only.
impl PartialEq for ForeignKey {
    fn eq(&self, other: &Self) -> bool {
        self.table_name == other.table_name && self.constraint_name == other.constraint_name
    }
}

impl Eq for ForeignKey {}

impl Hash for ForeignKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table_name.hash(state);
        self.constraint_name.hash(state);
    }
}

impl TableNameAware for ForeignKey {
    fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl CheckFinding for ForeignKey {}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} ({})",
            self.constraint_name,
            self.table_name,
            self.columns_in_constraint.iter().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_the_column_list() {
        let a = ForeignKey::new("orders", "c_orders_client", vec!["client_id".to_string()])
            .unwrap();
        let b = ForeignKey::new(
            "orders",
            "c_orders_client",
            vec!["client_id".to_string(), "region".to_string()],
        )
        .unwrap();
        let c = ForeignKey::new("orders", "c_orders_account", vec!["account_id".to_string()])
            .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn needs_at_least_one_column() {
        let err = ForeignKey::new("orders", "c_orders_client", Vec::new()).unwrap_err();

        assert!(matches!(err, CheckError::InvalidArgument(_)));
    }

    #[test]
    fn blank_column_names_are_rejected() {
        let err =
            ForeignKey::new("orders", "c_orders_client", vec!["  ".to_string()]).unwrap_err();

        assert!(matches!(err, CheckError::InvalidArgument(_)));
    }

    #[test]
    fn display_lists_columns() {
        let fk = ForeignKey::new(
            "orders",
            "c_orders_client",
            vec!["client_id".to_string(), "region".to_string()],
        )
        .unwrap();

        assert_eq!(
            fk.to_string(),
            "c_orders_client on orders (client_id, region)"
        );
    }
}
