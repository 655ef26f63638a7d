//! Resource-fit constraint: requested resources must fit the node's
//! allocatable capacity after accounting for what is already assigned.
//!
//! The pre-check caches the workload's requests once per evaluation; the
//! per-node check reads them from cycle state.

use fleetsim_snapshot::{NodeState, Resources, Workload};

use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, PreCheck, RejectionKind};

/// Checks that a node has enough free allocatable capacity.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeResourcesFit;

/// Plugin name for [`NodeResourcesFit`].
pub const NODE_RESOURCES_FIT: &str = "NodeResourcesFit";

impl NodeResourcesFit {
    fn insufficient(needed: &Resources, allocatable: &Resources) -> Vec<String> {
        let mut reasons = Vec::new();
        if needed.cpu_millis > allocatable.cpu_millis {
            reasons.push("InsufficientCpu".to_string());
        }
        if needed.memory_bytes > allocatable.memory_bytes {
            reasons.push("InsufficientMemory".to_string());
        }
        if needed.ephemeral_storage_bytes > allocatable.ephemeral_storage_bytes {
            reasons.push("InsufficientEphemeralStorage".to_string());
        }
        for (name, quantity) in &needed.scalar {
            if *quantity > allocatable.scalar.get(name).copied().unwrap_or(0) {
                reasons.push(format!("Insufficient{name}"));
            }
        }
        reasons
    }
}

impl FilterPlugin for NodeResourcesFit {
    fn name(&self) -> &'static str {
        NODE_RESOURCES_FIT
    }

    fn pre_check(
        &self,
        _ctx: &CheckContext<'_>,
        state: &mut CycleState,
        workload: &Workload,
    ) -> PreCheck {
        state.insert(NODE_RESOURCES_FIT, workload.requests.clone());
        PreCheck::Pass
    }

    fn check_node(
        &self,
        _ctx: &CheckContext<'_>,
        state: &CycleState,
        _workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck {
        let Some(requests) = state.get::<Resources>(NODE_RESOURCES_FIT) else {
            return NodeCheck::Error {
                message: "resource pre-check state missing".to_string(),
            };
        };
        let mut needed = node.requested().clone();
        needed.add_assign(requests);
        if needed.fits_within(&node.node().allocatable) {
            return NodeCheck::Fit;
        }
        let reasons = Self::insufficient(&needed, &node.node().allocatable);
        NodeCheck::Reject {
            message: format!(
                "node {} lacks capacity: {}",
                node.node().name,
                reasons.join(", ")
            ),
            reasons,
            kind: RejectionKind::Transient,
        }
    }
}
