//! The forkable cluster snapshot.
//!
//! [`ClusterSnapshot`] maps node names to [`NodeState`] and supports the
//! mutations a simulation needs: add/remove node, add/remove workload, and
//! a [`fork`](ClusterSnapshot::fork) that yields an independent copy for
//! try-then-rollback evaluation. Built fresh each control-loop cycle from
//! current facts, or empty/single-node for narrow simulations.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{Result, SnapshotError};
use crate::node_state::NodeState;
use crate::types::{Node, Workload, WorkloadId};

/// A mapping from node name to aggregated node state at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterSnapshot {
    nodes: BTreeMap<String, NodeState>,
}

impl ClusterSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from already-materialized cluster facts.
    ///
    /// Workloads are grouped onto nodes by assignment (or nomination when
    /// unassigned). Workloads referencing a node that is not in `nodes`,
    /// and workloads with no target at all, are dropped: an aggregated
    /// state without a real node is invalid and must not appear in a
    /// snapshot.
    #[must_use]
    pub fn from_facts(nodes: Vec<Node>, workloads: Vec<Workload>) -> Self {
        let mut snapshot = Self::new();
        for node in nodes {
            let name = node.name.clone();
            if snapshot.nodes.insert(name.clone(), NodeState::new(node)).is_some() {
                warn!(node = %name, "duplicate node in facts, keeping the last");
            }
        }

        let mut dropped = 0usize;
        for workload in workloads {
            let Some(target) = workload.effective_node_name().map(str::to_string) else {
                dropped += 1;
                continue;
            };
            match snapshot.nodes.get_mut(&target) {
                Some(state) => {
                    if let Err(err) = state.add_workload(workload) {
                        warn!(node = %target, error = %err, "skipping workload from facts");
                        dropped += 1;
                    }
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(count = dropped, "dropped orphaned workloads while building snapshot");
        }
        debug!(nodes = snapshot.nodes.len(), "built cluster snapshot");
        snapshot
    }

    /// Adds a node with no workloads.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateNode`] if a node with the same
    /// name is already present.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(SnapshotError::DuplicateNode { node: node.name });
        }
        self.nodes.insert(node.name.clone(), NodeState::new(node));
        Ok(())
    }

    /// Removes a node, evicting its workloads with it.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NodeNotFound`] if no such node exists.
    pub fn remove_node(&mut self, name: &str) -> Result<NodeState> {
        self.nodes
            .remove(name)
            .ok_or_else(|| SnapshotError::NodeNotFound { node: name.into() })
    }

    /// Adds a node together with its workloads, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateNode`] if the node already exists,
    /// or the first `add_workload` error. On any error the snapshot is left
    /// without the node: no partial insert is ever visible.
    pub fn add_node_with_workloads(&mut self, node: Node, workloads: Vec<Workload>) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(SnapshotError::DuplicateNode { node: node.name });
        }
        let name = node.name.clone();
        let mut state = NodeState::new(node);
        for workload in workloads {
            state.add_workload(workload)?;
        }
        self.nodes.insert(name, state);
        Ok(())
    }

    /// Assigns a workload to the node named by its assignment (or
    /// nomination).
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NoTargetNode`] if the workload names no
    /// node, [`SnapshotError::NodeNotFound`] if the named node is not in
    /// this snapshot, or [`SnapshotError::PortConflict`] from the node
    /// state.
    pub fn add_workload(&mut self, workload: Workload) -> Result<()> {
        let Some(target) = workload.effective_node_name().map(str::to_string) else {
            return Err(SnapshotError::NoTargetNode {
                workload: workload.uid.to_string(),
            });
        };
        let state = self
            .nodes
            .get_mut(&target)
            .ok_or(SnapshotError::NodeNotFound { node: target })?;
        state.add_workload(workload)
    }

    /// Removes a workload by UID from whichever node holds it.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::WorkloadNotFound`] if no node holds it.
    pub fn remove_workload(&mut self, uid: &WorkloadId) -> Result<Workload> {
        for state in self.nodes.values_mut() {
            if let Some(workload) = state.remove_workload(uid) {
                return Ok(workload);
            }
        }
        Err(SnapshotError::WorkloadNotFound {
            workload: uid.to_string(),
        })
    }

    /// Returns an independent copy; mutating either side never affects the
    /// other. Used for speculative edits that are discarded on rejection.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Returns the aggregated state for a node, if present.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeState> {
        self.nodes.get(name)
    }

    /// Iterates node states in node-name order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeState> {
        self.nodes.values()
    }

    /// Iterates all workloads across all nodes, grouped by node in
    /// node-name order.
    pub fn workloads(&self) -> impl Iterator<Item = &Workload> {
        self.nodes.values().flat_map(|s| s.workloads().iter())
    }

    /// Number of nodes in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the snapshot holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resources;

    fn node(name: &str) -> Node {
        Node::new(name, Resources::new().with_cpu_millis(4000))
    }

    fn workload_on(name: &str, node_name: &str) -> Workload {
        Workload::new(name, "default")
            .with_requests(Resources::new().with_cpu_millis(100))
            .with_node_name(node_name)
    }

    #[test]
    fn add_then_remove_node_round_trips() {
        let mut snapshot = ClusterSnapshot::from_facts(
            vec![node("node-a")],
            vec![workload_on("web", "node-a")],
        );
        let before = snapshot.clone();

        snapshot.add_node(node("node-b")).expect("add");
        snapshot.remove_node("node-b").expect("remove");
        assert_eq!(snapshot, before);
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut snapshot = ClusterSnapshot::new();
        snapshot.add_node(node("node-a")).expect("add");
        assert_eq!(
            snapshot.add_node(node("node-a")),
            Err(SnapshotError::DuplicateNode {
                node: "node-a".into()
            })
        );
    }

    #[test]
    fn remove_node_evicts_its_workloads() {
        let mut snapshot = ClusterSnapshot::from_facts(
            vec![node("node-a"), node("node-b")],
            vec![workload_on("web", "node-a"), workload_on("db", "node-b")],
        );
        let evicted = snapshot.remove_node("node-a").expect("remove");

        assert_eq!(evicted.workloads().len(), 1);
        assert_eq!(snapshot.workloads().count(), 1);
        assert_eq!(
            snapshot.remove_node("node-a"),
            Err(SnapshotError::NodeNotFound {
                node: "node-a".into()
            })
        );
    }

    #[test]
    fn from_facts_drops_orphans() {
        let snapshot = ClusterSnapshot::from_facts(
            vec![node("node-a")],
            vec![
                workload_on("web", "node-a"),
                workload_on("ghost", "node-gone"),
                Workload::new("unassigned", "default"),
            ],
        );
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.workloads().count(), 1);
    }

    #[test]
    fn from_facts_honors_nomination() {
        let nominated = Workload::new("pending", "default").with_nominated_node("node-a");
        let snapshot = ClusterSnapshot::from_facts(vec![node("node-a")], vec![nominated]);
        assert_eq!(
            snapshot.node("node-a").expect("node").workloads().len(),
            1
        );
    }

    #[test]
    fn add_node_with_workloads_is_atomic() {
        let mut snapshot = ClusterSnapshot::new();
        let err = snapshot
            .add_node_with_workloads(
                node("node-a"),
                vec![
                    workload_on("web", "node-a").with_host_port(8080),
                    workload_on("web2", "node-a").with_host_port(8080),
                ],
            )
            .expect_err("conflict");
        assert!(matches!(err, SnapshotError::PortConflict { .. }));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn add_workload_requires_known_target() {
        let mut snapshot = ClusterSnapshot::new();
        snapshot.add_node(node("node-a")).expect("add");

        assert!(matches!(
            snapshot.add_workload(Workload::new("w", "default")),
            Err(SnapshotError::NoTargetNode { .. })
        ));
        assert!(matches!(
            snapshot.add_workload(workload_on("w", "node-b")),
            Err(SnapshotError::NodeNotFound { .. })
        ));
        snapshot
            .add_workload(workload_on("w", "node-a"))
            .expect("add workload");
    }

    #[test]
    fn remove_workload_finds_holding_node() {
        let mut snapshot = ClusterSnapshot::from_facts(
            vec![node("node-a"), node("node-b")],
            vec![workload_on("web", "node-b")],
        );
        let uid = snapshot.workloads().next().expect("workload").uid.clone();
        let removed = snapshot.remove_workload(&uid).expect("remove");
        assert_eq!(removed.name, "web");
        assert!(matches!(
            snapshot.remove_workload(&uid),
            Err(SnapshotError::WorkloadNotFound { .. })
        ));
    }

    #[test]
    fn fork_is_independent() {
        let snapshot = ClusterSnapshot::from_facts(
            vec![node("node-a")],
            vec![workload_on("web", "node-a")],
        );
        let mut fork = snapshot.fork();
        fork.add_node(node("node-b")).expect("add");
        fork.add_workload(workload_on("db", "node-b")).expect("add");
        fork.remove_node("node-a").expect("remove");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.workloads().count(), 1);
        assert!(snapshot.node("node-a").is_some());
    }

    #[test]
    fn nodes_iterate_in_name_order() {
        let snapshot = ClusterSnapshot::from_facts(
            vec![node("node-c"), node("node-a"), node("node-b")],
            vec![],
        );
        let names: Vec<_> = snapshot.nodes().map(|s| s.node().name.as_str()).collect();
        assert_eq!(names, vec!["node-a", "node-b", "node-c"]);
    }
}
