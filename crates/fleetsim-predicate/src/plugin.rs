//! The filter plugin contract.
//!
//! A filter plugin is polymorphic over two capabilities: a once-per-workload
//! [`pre_check`](FilterPlugin::pre_check) that can reject a workload before
//! any per-node work runs, and a per-node
//! [`check_node`](FilterPlugin::check_node) evaluated against each candidate.
//! Pre-checks may stash derived state in a [`CycleState`] for the per-node
//! stage to read.

use std::any::Any;
use std::collections::HashMap;

use fleetsim_snapshot::{ClusterSnapshot, NodeState, Workload};

/// The snapshot an evaluation runs against.
///
/// Either the delegating view's current snapshot or a private simulation
/// snapshot; plugins that need cluster-wide context (inter-workload
/// affinity, topology spread) read it from here.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    snapshot: &'a ClusterSnapshot,
}

impl<'a> CheckContext<'a> {
    /// Creates a context over the given snapshot.
    #[must_use]
    pub fn new(snapshot: &'a ClusterSnapshot) -> Self {
        Self { snapshot }
    }

    /// Returns the snapshot this evaluation runs against.
    #[must_use]
    pub fn snapshot(&self) -> &'a ClusterSnapshot {
        self.snapshot
    }
}

/// Evaluation-scoped state shared from pre-checks to per-node checks.
///
/// Entries are keyed by plugin name. One `CycleState` belongs to exactly
/// one evaluation request and is never shared across concurrent node
/// evaluations by the engine.
#[derive(Debug, Default)]
pub struct CycleState {
    entries: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl CycleState {
    /// Creates an empty cycle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a typed entry under the given plugin name.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) {
        self.entries.insert(key, Box::new(value));
    }

    /// Reads a typed entry stored under the given plugin name.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }
}

/// Verdict of a once-per-workload pre-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreCheck {
    /// The workload passes this plugin's pre-check.
    Pass,
    /// The workload itself is unschedulable under this plugin, regardless
    /// of node; per-node work is skipped entirely.
    Reject {
        /// Human-readable rejection message.
        message: String,
        /// Machine-readable reason codes.
        reasons: Vec<String>,
    },
}

/// Whether a per-node rejection is intrinsic to the node or a matter of
/// current occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The node can never host this workload (labels, taints).
    Permanent,
    /// The node is currently too busy (resources, ports, co-location).
    Transient,
}

/// Verdict of a per-node check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCheck {
    /// The node satisfies this plugin for the workload.
    Fit,
    /// The node rejects the workload.
    Reject {
        /// Human-readable rejection message.
        message: String,
        /// Machine-readable reason codes.
        reasons: Vec<String>,
        /// Whether the node is permanently unsuitable or transiently busy.
        kind: RejectionKind,
    },
    /// The plugin itself failed to produce a verdict.
    Error {
        /// Description of the plugin failure.
        message: String,
    },
}

impl NodeCheck {
    /// Builds a rejection with a single reason code.
    #[must_use]
    pub fn reject(message: impl Into<String>, reason: impl Into<String>, kind: RejectionKind) -> Self {
        Self::Reject {
            message: message.into(),
            reasons: vec![reason.into()],
            kind,
        }
    }
}

/// An ordered, pluggable constraint check.
///
/// Plugins are registered once at engine construction in a fixed order;
/// the first rejecting plugin short-circuits the rest of the chain for a
/// candidate node.
pub trait FilterPlugin: Send + Sync {
    /// Stable plugin name used for rejection attribution and cycle-state
    /// keys.
    fn name(&self) -> &'static str;

    /// Once-per-workload check run before any per-node work.
    fn pre_check(
        &self,
        _ctx: &CheckContext<'_>,
        _state: &mut CycleState,
        _workload: &Workload,
    ) -> PreCheck {
        PreCheck::Pass
    }

    /// Per-candidate-node check.
    fn check_node(
        &self,
        ctx: &CheckContext<'_>,
        state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck;

    /// Plugin-specific debug payload attached to rejections, where
    /// available.
    fn debug_context(&self, _node: &NodeState) -> Option<String> {
        None
    }
}
