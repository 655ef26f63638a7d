//! Ordered filter-chain predicate evaluation for fleet-scaling simulation.
//!
//! `fleetsim-predicate` answers "can this workload run on this node (or any
//! node)?" using the same pluggable placement rules a real scheduler uses,
//! without mutating the cluster:
//!
//! - [`FilterPlugin`]: the two-stage constraint contract (once-per-workload
//!   pre-check, per-candidate-node check)
//! - [`ChainConfig`] / [`build_chain`]: the externally supplied plugin set
//!   and ordering
//! - [`PredicateChecker`]: the long-lived engine orchestrating the chain
//!   against an atomically refreshed cluster view
//! - [`PredicateOutcome`]: classified fit / node-rejection / failure results
//! - [`daemonset_workloads_for_node`]: predicts the daemonset pods a node
//!   would inevitably carry after joining the cluster
//!
//! # Example
//!
//! ```rust
//! use fleetsim_predicate::{InMemoryFactSource, PredicateChecker};
//! use fleetsim_snapshot::{Node, NodeState, Resources, Workload};
//!
//! let facts = InMemoryFactSource::new();
//! facts.set_nodes(vec![Node::new("node-a", Resources::new().with_cpu_millis(4000))]);
//!
//! let checker = PredicateChecker::new(facts);
//! checker.refresh()?;
//!
//! let workload = Workload::new("web", "default")
//!     .with_requests(Resources::new().with_cpu_millis(500));
//! let candidate = NodeState::new(Node::new("node-a", Resources::new().with_cpu_millis(4000)));
//! assert!(checker.check_predicates(&workload, &candidate).is_fit());
//! # Ok::<(), fleetsim_predicate::PredicateError>(())
//! ```

#![forbid(unsafe_code)]

mod checker;
mod config;
mod daemonset;
mod error;
mod plugin;
mod plugins;

pub use checker::{FactSource, InMemoryFactSource, PredicateChecker, PredicateOutcome};
pub use config::{build_chain, default_chain, ChainConfig};
pub use daemonset::{daemonset_workloads_for_node, synthetic_workload, DaemonSet};
pub use error::{FactError, PredicateError, Result};
pub use plugin::{
    CheckContext, CycleState, FilterPlugin, NodeCheck, PreCheck, RejectionKind,
};
pub use plugins::{
    InterPodAffinity, NodeAffinity, NodePorts, NodeResourcesFit, TaintToleration, TopologySpread,
};
