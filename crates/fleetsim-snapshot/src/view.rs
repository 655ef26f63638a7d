//! Atomically swappable reference to the current cluster snapshot.
//!
//! The evaluation engine is expensive to construct and lives across
//! control-loop cycles, while the state it evaluates is rebuilt every
//! cycle. [`ClusterView`] is the seam between the two: the control loop
//! installs a whole new snapshot once per cycle, and readers always see
//! either the whole old snapshot or the whole new one, never a mix.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::snapshot::ClusterSnapshot;
use crate::types::{Node, Workload};

/// A replaceable reference to a [`ClusterSnapshot`].
///
/// Installed snapshots are never mutated in place; all cycle-to-cycle
/// changes happen by installing a new snapshot wholesale.
#[derive(Debug)]
pub struct ClusterView {
    current: RwLock<Arc<ClusterSnapshot>>,
}

impl ClusterView {
    /// Creates a view over the given snapshot.
    #[must_use]
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Creates a view over an empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(ClusterSnapshot::new())
    }

    /// Atomically replaces the referenced snapshot.
    pub fn install(&self, snapshot: ClusterSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Returns the currently referenced snapshot as a whole.
    ///
    /// The returned handle stays consistent even if a new snapshot is
    /// installed while the caller is still reading it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ClusterSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Lists the nodes of the current snapshot.
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        self.snapshot().nodes().map(|s| s.node().clone()).collect()
    }

    /// Lists the workloads of the current snapshot.
    #[must_use]
    pub fn workloads(&self) -> Vec<Workload> {
        self.snapshot().workloads().cloned().collect()
    }
}

impl Default for ClusterView {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resources;

    fn single_node_snapshot(name: &str) -> ClusterSnapshot {
        ClusterSnapshot::from_facts(
            vec![Node::new(name, Resources::new().with_cpu_millis(1000))],
            vec![],
        )
    }

    #[test]
    fn install_swaps_wholesale() {
        let view = ClusterView::new(single_node_snapshot("node-a"));
        assert_eq!(view.nodes()[0].name, "node-a");

        view.install(single_node_snapshot("node-b"));
        assert_eq!(view.nodes().len(), 1);
        assert_eq!(view.nodes()[0].name, "node-b");
    }

    #[test]
    fn held_snapshot_survives_install() {
        let view = ClusterView::new(single_node_snapshot("node-a"));
        let held = view.snapshot();

        view.install(single_node_snapshot("node-b"));
        assert!(held.node("node-a").is_some());
        assert!(view.snapshot().node("node-b").is_some());
    }

    #[test]
    fn empty_view_has_no_nodes() {
        let view = ClusterView::empty();
        assert!(view.nodes().is_empty());
        assert!(view.workloads().is_empty());
    }
}
