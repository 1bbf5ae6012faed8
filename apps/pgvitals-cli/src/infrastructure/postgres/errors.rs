//! Error types for PostgreSQL connectivity.

#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Connection string or cluster layout problems, caught before any
    /// socket is opened.
    #[error("invalid cluster configuration: {0}")]
    Config(String),

    #[error("failed to connect to '{node}': {source}")]
    Connection {
        node: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("query execution failed: {source}")]
    Query {
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("failed to decode column '{column}': {source}")]
    Decode {
        column: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("unsupported column type '{pg_type}' in column '{column}'")]
    UnsupportedColumnType { column: String, pg_type: String },
}
