//! Aggregated per-node state.
//!
//! [`NodeState`] pairs a node with the workloads assigned to it and keeps
//! the aggregate requested-resource totals and used host-port set in sync
//! incrementally on every mutation, so they never have to be recomputed
//! from the workload list.

use uuid::Uuid;

use crate::error::{Result, SnapshotError};
use crate::types::{Node, PortSet, Resources, Workload, WorkloadId};

/// A node plus the workloads currently assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    node: Node,
    workloads: Vec<Workload>,
    requested: Resources,
    used_ports: PortSet,
}

impl NodeState {
    /// Creates an aggregated state for a node with no workloads.
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self {
            node,
            workloads: Vec::new(),
            requested: Resources::new(),
            used_ports: PortSet::new(),
        }
    }

    /// Returns the underlying node.
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Returns the workloads assigned to this node, in assignment order.
    #[must_use]
    pub fn workloads(&self) -> &[Workload] {
        &self.workloads
    }

    /// Returns the aggregate resource requests of all assigned workloads.
    #[must_use]
    pub fn requested(&self) -> &Resources {
        &self.requested
    }

    /// Returns the host ports currently bound on this node.
    #[must_use]
    pub fn used_ports(&self) -> &PortSet {
        &self.used_ports
    }

    /// Assigns a workload to this node, updating the aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::PortConflict`] if any of the workload's host
    /// ports is already bound on this node. The state is unchanged on error.
    pub fn add_workload(&mut self, workload: Workload) -> Result<()> {
        for &port in &workload.host_ports {
            if self.used_ports.contains(&port) {
                return Err(SnapshotError::PortConflict {
                    node: self.node.name.clone(),
                    port,
                });
            }
        }
        self.append(workload);
        Ok(())
    }

    /// Appends a workload and updates the aggregates, without the port
    /// check. Callers must have established that no port conflicts.
    fn append(&mut self, workload: Workload) {
        self.requested.add_assign(&workload.requests);
        self.used_ports.extend(workload.host_ports.iter().copied());
        self.workloads.push(workload);
    }

    /// Removes a workload by UID, reversing its contribution to the
    /// aggregates. Returns `None` (and changes nothing) if absent.
    pub fn remove_workload(&mut self, uid: &WorkloadId) -> Option<Workload> {
        let index = self.workloads.iter().position(|w| w.uid == *uid)?;
        let workload = self.workloads.remove(index);
        self.requested.saturating_sub_assign(&workload.requests);
        for port in &workload.host_ports {
            self.used_ports.remove(port);
        }
        Some(workload)
    }

    /// Returns true if a workload with the given UID is assigned here.
    #[must_use]
    pub fn contains(&self, uid: &WorkloadId) -> bool {
        self.workloads.iter().any(|w| w.uid == *uid)
    }

    /// Deep-copies this state as a template, regenerating every identity.
    ///
    /// The node is renamed `{name}-{suffix}` and its hostname label
    /// rewritten to match; each workload is renamed with the suffix and
    /// given a fresh UID, so multiple copies can coexist in one snapshot.
    #[must_use]
    pub fn templated_copy(&self, suffix: &str) -> Self {
        let mut node = self.node.clone();
        node.name = format!("{}-{}", node.name, suffix);
        node.labels
            .insert("kubernetes.io/hostname".to_string(), node.name.clone());

        let mut copy = Self::new(node);
        for workload in &self.workloads {
            let mut w = workload.clone();
            w.uid = WorkloadId::new(Uuid::new_v4().to_string());
            w.name = format!("{}-{}", w.name, suffix);
            w.node_name = Some(copy.node.name.clone());
            // The source state already holds these workloads without
            // conflict, so re-appending them cannot introduce one.
            copy.append(w);
        }
        copy
    }
}
