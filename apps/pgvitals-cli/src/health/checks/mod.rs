//! Diagnostic execution: per-node checks, the cluster engine, and the
//! filters applied to merged verdicts.

pub mod cluster;
pub mod host;
pub mod predicates;
pub mod queries;

pub use cluster::{CheckOptions, ClusterCheck, FailurePolicy, DEFAULT_QUERY_TIMEOUT};
pub use host::HostCheck;
pub use predicates::{
    AcceptAll, CheckPredicate, FilterBySize, FilterIndexesByName, FilterTablesByName,
};

#[cfg(test)]
pub(crate) mod test_executors {
    //! Canned executors that drive the check stack without a server.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::infrastructure::postgres::{
        CatalogRow, CatalogValue, PostgresError, QueryExecutor,
    };

    pub fn text(column: &str, value: &str) -> (String, CatalogValue) {
        (column.to_string(), CatalogValue::Text(value.to_string()))
    }

    pub fn long(column: &str, value: i64) -> (String, CatalogValue) {
        (column.to_string(), CatalogValue::Long(value))
    }

    pub fn text_array(column: &str, values: &[&str]) -> (String, CatalogValue) {
        (
            column.to_string(),
            CatalogValue::TextArray(values.iter().map(|value| value.to_string()).collect()),
        )
    }

    /// Answers every query with the same canned outcome, counting calls.
    pub struct StaticExecutor {
        name: String,
        rows: Vec<CatalogRow>,
        fail: bool,
        delay: Duration,
        hits: AtomicUsize,
    }

    impl StaticExecutor {
        pub fn with_rows(name: &str, rows: Vec<CatalogRow>) -> Self {
            Self {
                name: name.to_string(),
                rows,
                fail: false,
                delay: Duration::ZERO,
                hits: AtomicUsize::new(0),
            }
        }

        pub fn failing(name: &str) -> Self {
            Self {
                fail: true,
                ..Self::with_rows(name, Vec::new())
            }
        }

        pub fn delayed(name: &str, rows: Vec<CatalogRow>, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::with_rows(name, rows)
            }
        }

        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    /// A real driver error, produced without a server: connecting with an
    /// empty config fails before any socket is opened.
    async fn driver_error() -> PostgresError {
        match tokio_postgres::Config::new()
            .connect(tokio_postgres::NoTls)
            .await
        {
            Ok(_) => unreachable!("connecting with an empty config cannot succeed"),
            Err(source) => PostgresError::Query { source },
        }
    }

    #[async_trait]
    impl QueryExecutor for StaticExecutor {
        fn node_name(&self) -> &str {
            &self.name
        }

        async fn query(&self, _sql: &str) -> Result<Vec<CatalogRow>, PostgresError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(driver_error().await);
            }
            Ok(self.rows.clone())
        }

        async fn query_with_schema(
            &self,
            sql: &str,
            _schema: &str,
        ) -> Result<Vec<CatalogRow>, PostgresError> {
            self.query(sql).await
        }
    }
}
