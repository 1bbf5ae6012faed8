//! tokio-postgres client for a single node.

use std::time::Duration;

use tokio_postgres::{Client, NoTls, Row};

use crate::infrastructure::postgres::config::{node_identity, parse_node_url};
use crate::infrastructure::postgres::errors::PostgresError;
use crate::infrastructure::postgres::row::{CatalogRow, CatalogValue};
use crate::infrastructure::postgres::QueryExecutor;

/// A live connection to one PostgreSQL node.
pub struct PgNodeClient {
    name: String,
    client: Client,
}

impl PgNodeClient {
    /// Connects to the node behind `url` and spawns its connection driver.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, PostgresError> {
        let mut config = parse_node_url(url)?;
        config.connect_timeout(connect_timeout);
        let name = node_identity(&config);

        let (client, connection) =
            config
                .connect(NoTls)
                .await
                .map_err(|source| PostgresError::Connection {
                    node: name.clone(),
                    source,
                })?;

        let node = name.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("Connection to '{}' terminated: {}", node, e);
            }
        });

        Ok(Self { name, client })
    }

    /// Cheap readiness probe.
    pub async fn ping(&self) -> Result<(), PostgresError> {
        self.client
            .simple_query("SELECT 1")
            .await
            .map_err(|source| PostgresError::Query { source })?;
        Ok(())
    }

    /// True when the node is serving as a streaming replica.
    pub async fn is_in_recovery(&self) -> Result<bool, PostgresError> {
        let row = self
            .client
            .query_one("SELECT pg_is_in_recovery()", &[])
            .await
            .map_err(|source| PostgresError::Query { source })?;
        row.try_get(0)
            .map_err(|source| PostgresError::Query { source })
    }
}

#[async_trait::async_trait]
impl QueryExecutor for PgNodeClient {
    fn node_name(&self) -> &str {
        &self.name
    }

    async fn query(&self, sql: &str) -> Result<Vec<CatalogRow>, PostgresError> {
        let rows = self
            .client
            .query(sql, &[])
            .await
            .map_err(|source| PostgresError::Query { source })?;
        rows.iter().map(convert_row).collect()
    }

    async fn query_with_schema(
        &self,
        sql: &str,
        schema: &str,
    ) -> Result<Vec<CatalogRow>, PostgresError> {
        let rows = self
            .client
            .query(sql, &[&schema])
            .await
            .map_err(|source| PostgresError::Query { source })?;
        rows.iter().map(convert_row).collect()
    }
}

/// Converts a driver row into the neutral representation the checks
/// consume. Integer widths are widened to 64 bits.
fn convert_row(row: &Row) -> Result<CatalogRow, PostgresError> {
    let mut columns = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let decode = |source| PostgresError::Decode {
            column: column.name().to_string(),
            source,
        };
        let value = match column.type_().name() {
            "text" | "varchar" | "name" | "bpchar" => row
                .try_get::<_, Option<String>>(index)
                .map_err(decode)?
                .map(CatalogValue::Text)
                .unwrap_or(CatalogValue::Null),
            "int8" => row
                .try_get::<_, Option<i64>>(index)
                .map_err(decode)?
                .map(CatalogValue::Long)
                .unwrap_or(CatalogValue::Null),
            "int4" => row
                .try_get::<_, Option<i32>>(index)
                .map_err(decode)?
                .map(|v| CatalogValue::Long(i64::from(v)))
                .unwrap_or(CatalogValue::Null),
            "int2" => row
                .try_get::<_, Option<i16>>(index)
                .map_err(decode)?
                .map(|v| CatalogValue::Long(i64::from(v)))
                .unwrap_or(CatalogValue::Null),
            "bool" => row
                .try_get::<_, Option<bool>>(index)
                .map_err(decode)?
                .map(CatalogValue::Bool)
                .unwrap_or(CatalogValue::Null),
            "_text" | "_varchar" | "_name" => row
                .try_get::<_, Option<Vec<String>>>(index)
                .map_err(decode)?
                .map(CatalogValue::TextArray)
                .unwrap_or(CatalogValue::Null),
            other => {
                return Err(PostgresError::UnsupportedColumnType {
                    column: column.name().to_string(),
                    pg_type: other.to_string(),
                })
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(CatalogRow::new(columns))
}
