//! Forkable in-memory cluster state model for fleet-scaling simulation.
//!
//! `fleetsim-snapshot` provides the mutable, forkable model of nodes and
//! workloads that placement-feasibility checks evaluate against:
//!
//! - [`Node`] / [`Workload`]: value types for machine facts and units of work
//! - [`NodeState`]: a node plus its assigned workloads, with incrementally
//!   maintained resource totals and used host ports
//! - [`ClusterSnapshot`]: the map of nodes to aggregated state, rebuilt each
//!   control-loop cycle and cheaply forkable for speculative edits
//! - [`ClusterView`]: the atomically swappable reference a long-lived
//!   evaluation engine reads while snapshots are replaced underneath it
//!
//! # Example
//!
//! ```rust
//! use fleetsim_snapshot::{ClusterSnapshot, ClusterView, Node, Resources, Workload};
//!
//! let nodes = vec![Node::new("node-a", Resources::new().with_cpu_millis(4000))];
//! let workloads = vec![Workload::new("web", "default")
//!     .with_requests(Resources::new().with_cpu_millis(500))
//!     .with_node_name("node-a")];
//!
//! let view = ClusterView::new(ClusterSnapshot::from_facts(nodes, workloads));
//! assert_eq!(view.snapshot().node("node-a").unwrap().requested().cpu_millis, 500);
//!
//! // Speculative edit on a fork; the view is untouched.
//! let mut fork = view.snapshot().fork();
//! fork.remove_node("node-a").unwrap();
//! assert!(view.snapshot().node("node-a").is_some());
//! ```

#![forbid(unsafe_code)]

mod error;
mod node_state;
mod snapshot;
mod types;
mod view;

pub use error::{Result, SnapshotError};
pub use node_state::NodeState;
pub use snapshot::ClusterSnapshot;
pub use types::{
    LabelOperator, LabelRequirement, Node, OwnerRef, PodAffinityTerm, PortSet, Resources,
    SpreadConstraint, Taint, TaintEffect, Toleration, TolerationOperator, Workload, WorkloadId,
};
pub use view::ClusterView;
