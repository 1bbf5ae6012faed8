//! Connectivity to the PostgreSQL nodes under inspection.
//!
//! Everything the health checks know about a server goes through the
//! [`QueryExecutor`] trait, so the whole check stack can run against test
//! doubles that never open a socket.

pub mod client;
pub mod cluster;
pub mod config;
pub mod errors;
pub mod row;

pub use client::PgNodeClient;
pub use cluster::ClusterConnection;
pub use config::ClusterConfig;
pub use errors::PostgresError;
pub use row::{CatalogRow, CatalogValue, RowError};

/// Read-only query access to one PostgreSQL node.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Identity of the node (`host:port/database`, never credentials),
    /// used in logs and error reporting.
    fn node_name(&self) -> &str;

    /// Runs a parameterless query and returns every row in server order.
    async fn query(&self, sql: &str) -> Result<Vec<CatalogRow>, PostgresError>;

    /// Runs a query with the target schema bound as `$1`.
    async fn query_with_schema(
        &self,
        sql: &str,
        schema: &str,
    ) -> Result<Vec<CatalogRow>, PostgresError>;
}
