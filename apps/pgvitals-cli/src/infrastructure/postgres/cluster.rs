//! Cluster handle: one primary plus its replicas.

use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::postgres::client::PgNodeClient;
use crate::infrastructure::postgres::config::ClusterConfig;
use crate::infrastructure::postgres::errors::PostgresError;
use crate::infrastructure::postgres::QueryExecutor;

/// The set of nodes a check runs against.
///
/// Generic over the executor so the check stack can be driven by test
/// doubles; production code uses [`PgNodeClient`].
pub struct ClusterConnection<E> {
    primary: Arc<E>,
    replicas: Vec<Arc<E>>,
}

impl<E: QueryExecutor> ClusterConnection<E> {
    pub fn new(primary: Arc<E>, replicas: Vec<Arc<E>>) -> Self {
        Self { primary, replicas }
    }

    /// A cluster whose only member is the primary.
    pub fn single(primary: E) -> Self {
        Self {
            primary: Arc::new(primary),
            replicas: Vec::new(),
        }
    }

    pub fn primary(&self) -> &Arc<E> {
        &self.primary
    }

    pub fn replicas(&self) -> &[Arc<E>] {
        &self.replicas
    }

    /// Every node, primary first, replicas in their configured order.
    pub fn nodes(&self) -> Vec<Arc<E>> {
        let mut nodes = Vec::with_capacity(1 + self.replicas.len());
        nodes.push(Arc::clone(&self.primary));
        nodes.extend(self.replicas.iter().map(Arc::clone));
        nodes
    }
}

impl ClusterConnection<PgNodeClient> {
    /// Connects every configured node, primary first.
    pub async fn connect(config: &ClusterConfig) -> Result<Self, PostgresError> {
        let timeout = Duration::from_secs(config.connect_timeout_seconds);
        let primary = PgNodeClient::connect(&config.primary, timeout).await?;

        let mut replicas = Vec::with_capacity(config.replicas.len());
        for url in &config.replicas {
            replicas.push(Arc::new(PgNodeClient::connect(url, timeout).await?));
        }

        Ok(Self {
            primary: Arc::new(primary),
            replicas,
        })
    }
}
