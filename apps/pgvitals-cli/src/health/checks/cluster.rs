//! Cluster-wide execution of a diagnostic.
//!
//! One [`HostCheck`] is fanned out over the nodes its topology names, the
//! per-node results are collected back in node order, a failure policy
//! decides which node errors are fatal, and the surviving lists are merged
//! into a single deduplicated verdict.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::health::checks::host::HostCheck;
use crate::health::checks::predicates::{AcceptAll, CheckPredicate};
use crate::health::model::{CheckFinding, PgContext};
use crate::health::{CheckError, Diagnostic, Topology};
use crate::infrastructure::postgres::{ClusterConnection, QueryExecutor};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// What a node-level failure does to the cluster verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep whatever nodes answered; fail only when every node failed.
    BestEffort,
    /// A primary failure is fatal, replica failures are logged and skipped.
    #[default]
    RequirePrimary,
    /// Any node failure is fatal.
    Strict,
}

impl FailurePolicy {
    pub fn all() -> [FailurePolicy; 3] {
        [
            FailurePolicy::BestEffort,
            FailurePolicy::RequirePrimary,
            FailurePolicy::Strict,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FailurePolicy::BestEffort => "best-effort",
            FailurePolicy::RequirePrimary => "require-primary",
            FailurePolicy::Strict => "strict",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FailurePolicy {
    type Err = CheckError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        FailurePolicy::all()
            .into_iter()
            .find(|policy| policy.name() == raw)
            .ok_or_else(|| {
                CheckError::InvalidArgument(format!(
                    "unknown failure policy '{raw}', expected one of: best-effort, require-primary, strict"
                ))
            })
    }
}

/// Per-run knobs for the cluster engine.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    /// Per-node budget; a node that exceeds it counts as failed.
    pub timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_QUERY_TIMEOUT,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// A diagnostic ready to run across a cluster.
pub struct ClusterCheck<T> {
    host_check: HostCheck<T>,
    options: CheckOptions,
}

struct NodeOutcome<T> {
    node_index: usize,
    node: String,
    result: Result<Vec<T>, CheckError>,
}

impl<T: CheckFinding> ClusterCheck<T> {
    pub fn new(host_check: HostCheck<T>) -> Self {
        Self::with_options(host_check, CheckOptions::default())
    }

    pub fn with_options(host_check: HostCheck<T>, options: CheckOptions) -> Self {
        Self {
            host_check,
            options,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        self.host_check.diagnostic()
    }

    /// Runs the diagnostic with no filtering.
    pub async fn check<E>(
        &self,
        cluster: &ClusterConnection<E>,
        ctx: &PgContext,
    ) -> Result<Vec<T>, CheckError>
    where
        E: QueryExecutor + 'static,
    {
        self.check_filtered(cluster, ctx, &AcceptAll).await
    }

    /// Runs the diagnostic and keeps only findings the predicate accepts.
    ///
    /// The predicate runs after the merge, so it sees each finding once,
    /// with the magnitudes of the first node that reported it.
    pub async fn check_filtered<E, P>(
        &self,
        cluster: &ClusterConnection<E>,
        ctx: &PgContext,
        predicate: &P,
    ) -> Result<Vec<T>, CheckError>
    where
        E: QueryExecutor + 'static,
        P: CheckPredicate<T> + ?Sized,
    {
        let nodes = match self.diagnostic().topology() {
            Topology::OnPrimary => vec![Arc::clone(cluster.primary())],
            Topology::AcrossCluster => cluster.nodes(),
        };
        let outcomes = self.run_on_nodes(&nodes, ctx).await;
        let per_node = apply_failure_policy(outcomes, self.options.failure_policy)?;
        Ok(merge(per_node)
            .into_iter()
            .filter(|finding| predicate.test(finding))
            .collect())
    }

    /// Queries every node concurrently, then restores node order.
    ///
    /// Tasks finish in whatever order the nodes answer; outcomes are
    /// slotted back by node index so the merge, and through it the verdict
    /// order, never depends on timing.
    async fn run_on_nodes<E>(&self, nodes: &[Arc<E>], ctx: &PgContext) -> Vec<NodeOutcome<T>>
    where
        E: QueryExecutor + 'static,
    {
        let mut tasks = JoinSet::new();
        for (node_index, node) in nodes.iter().enumerate() {
            let node = Arc::clone(node);
            let ctx = ctx.clone();
            let host_check = self.host_check;
            let timeout = self.options.timeout;
            tasks.spawn(async move {
                let result =
                    match tokio::time::timeout(timeout, host_check.check(node.as_ref(), &ctx))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(CheckError::Cancelled(timeout)),
                    };
                NodeOutcome {
                    node_index,
                    node: node.node_name().to_string(),
                    result,
                }
            });
        }

        let mut slots: Vec<Option<NodeOutcome<T>>> = (0..nodes.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    let slot = outcome.node_index;
                    slots[slot] = Some(outcome);
                }
                Err(join_error) => tracing::error!("diagnostic task aborted: {join_error}"),
            }
        }
        slots.into_iter().flatten().collect()
    }
}

/// Decides which node errors sink the whole run.
///
/// Outcomes arrive in node order, so the error picked when everything
/// failed is always the first node's, independent of completion timing.
fn apply_failure_policy<T>(
    outcomes: Vec<NodeOutcome<T>>,
    policy: FailurePolicy,
) -> Result<Vec<Vec<T>>, CheckError> {
    let mut per_node = Vec::with_capacity(outcomes.len());
    let mut first_error = None;

    for outcome in outcomes {
        match outcome.result {
            Ok(findings) => per_node.push(findings),
            Err(err) => {
                let fatal = match policy {
                    FailurePolicy::Strict => true,
                    FailurePolicy::RequirePrimary => outcome.node_index == 0,
                    FailurePolicy::BestEffort => false,
                };
                if fatal {
                    return Err(err);
                }
                tracing::warn!(node = %outcome.node, "skipping unreachable node: {err}");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    // Every node failing is fatal under any policy.
    if per_node.is_empty() {
        if let Some(err) = first_error {
            return Err(err);
        }
    }
    Ok(per_node)
}

/// Flattens per-node lists into one verdict.
///
/// Findings are compared on identity attributes only, so the same object
/// reported by several nodes collapses into one entry carrying the
/// magnitudes of the first node that saw it. Within the verdict, findings
/// keep the order they were first encountered in.
fn merge<T: CheckFinding>(per_node: Vec<Vec<T>>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for findings in per_node {
        for finding in findings {
            if seen.insert(finding.clone()) {
                merged.push(finding);
            }
        }
    }
    merged
}
