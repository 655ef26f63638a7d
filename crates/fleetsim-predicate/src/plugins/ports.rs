//! Host-port conflict constraint.
//!
//! The pre-check caches the workload's requested port set once; the
//! per-node check intersects it with the ports already bound on each
//! candidate. The snapshot layer enforces the same invariant structurally
//! on committed mutations; this plugin classifies hypothetical placements.

use std::collections::BTreeSet;

use fleetsim_snapshot::{NodeState, Workload};

use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, PreCheck, RejectionKind};

/// Checks that none of the workload's host ports are already bound.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodePorts;

/// Plugin name for [`NodePorts`].
pub const NODE_PORTS: &str = "NodePorts";

impl FilterPlugin for NodePorts {
    fn name(&self) -> &'static str {
        NODE_PORTS
    }

    fn pre_check(
        &self,
        _ctx: &CheckContext<'_>,
        state: &mut CycleState,
        workload: &Workload,
    ) -> PreCheck {
        let requested: BTreeSet<u16> = workload.host_ports.iter().copied().collect();
        state.insert(NODE_PORTS, requested);
        PreCheck::Pass
    }

    fn check_node(
        &self,
        _ctx: &CheckContext<'_>,
        state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck {
        let Some(requested) = state.get::<BTreeSet<u16>>(NODE_PORTS) else {
            return NodeCheck::Error {
                message: "port pre-check state missing".to_string(),
            };
        };
        if requested.is_empty() {
            return NodeCheck::Fit;
        }
        match requested.intersection(node.used_ports()).next() {
            None => NodeCheck::Fit,
            Some(port) => NodeCheck::reject(
                format!(
                    "port {port} already in use on node {} for workload {}",
                    node.node().name,
                    workload.name
                ),
                "HostPortConflict",
                RejectionKind::Transient,
            ),
        }
    }
}
