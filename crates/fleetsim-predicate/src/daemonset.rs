//! Daemonset pod-injection simulation.
//!
//! A node joining the cluster inevitably ends up carrying one pod per
//! eligible daemonset. The simulator predicts which ones by building a
//! private single-node snapshot and running the full predicate chain for
//! a synthetic workload per daemonset template, keeping those that fit.

use tracing::debug;

use fleetsim_snapshot::{ClusterSnapshot, NodeState, OwnerRef, SnapshotError, Workload, WorkloadId};

use crate::checker::{FactSource, PredicateChecker};

/// A daemonset template: one pod per eligible node.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonSet {
    /// Daemonset name.
    pub name: String,
    /// Namespace the daemonset (and its pods) live in.
    pub namespace: String,
    /// Pod template the daemonset stamps out per node.
    pub template: Workload,
}

impl DaemonSet {
    /// Creates a daemonset from a pod template.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        template: Workload,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            template,
        }
    }
}

/// Synthesizes the workload this daemonset would place on the given node.
///
/// The template is copied with a fresh unique identity (UID-derived name
/// suffix, so copies never collide within a process lifetime), pinned to
/// the node, and stamped with the daemonset's namespace and ownership.
#[must_use]
pub fn synthetic_workload(daemonset: &DaemonSet, node_name: &str) -> Workload {
    let mut workload = daemonset.template.clone();
    workload.uid = WorkloadId::generate();
    let fragment = &workload.uid.as_str()[..8];
    workload.name = format!("{}-{fragment}", daemonset.name);
    workload.namespace = daemonset.namespace.clone();
    workload.node_name = Some(node_name.to_string());
    workload.nominated_node = None;
    workload.owner = Some(OwnerRef {
        kind: "DaemonSet".to_string(),
        name: daemonset.name.clone(),
    });
    workload
}

/// Returns the synthetic daemonset workloads the node would actually run.
///
/// Builds a fresh single-node snapshot from the node and its existing
/// workloads, then keeps each daemonset's synthetic workload iff the full
/// predicate chain accepts it there. Daemonset processing order does not
/// affect which ones are kept: each check is independent of the others.
///
/// # Errors
///
/// Returns an error if the node state cannot be replayed into a fresh
/// snapshot (which would mean its existing workloads are inconsistent).
pub fn daemonset_workloads_for_node<F: FactSource>(
    checker: &PredicateChecker<F>,
    node_state: &NodeState,
    daemonsets: &[DaemonSet],
) -> Result<Vec<Workload>, SnapshotError> {
    let mut snapshot = ClusterSnapshot::new();
    snapshot.add_node_with_workloads(
        node_state.node().clone(),
        node_state.workloads().to_vec(),
    )?;
    let node_name = &node_state.node().name;

    let mut result = Vec::new();
    for daemonset in daemonsets {
        let workload = synthetic_workload(daemonset, node_name);
        let target = snapshot
            .node(node_name)
            .ok_or_else(|| SnapshotError::NodeNotFound {
                node: node_name.clone(),
            })?;
        let outcome = checker.check_predicates_in(&snapshot, &workload, target);
        debug!(
            daemonset = %daemonset.name,
            node = %node_name,
            outcome = %outcome,
            "simulated daemonset placement"
        );
        if outcome.is_fit() {
            result.push(workload);
        }
    }
    Ok(result)
}
