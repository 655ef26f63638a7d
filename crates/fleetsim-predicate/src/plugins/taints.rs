//! Taint/toleration constraint.
//!
//! Every scheduling-relevant taint on the node must be covered by one of
//! the workload's tolerations. This plugin supplies the node's taint list
//! as rejection debug context, since taint mismatches are the diagnosis
//! operators most often need to see.

use fleetsim_snapshot::{NodeState, TaintEffect, Workload};

use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, RejectionKind};

/// Checks that the workload tolerates every blocking taint on the node.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaintToleration;

/// Plugin name for [`TaintToleration`].
pub const TAINT_TOLERATION: &str = "TaintToleration";

impl FilterPlugin for TaintToleration {
    fn name(&self) -> &'static str {
        TAINT_TOLERATION
    }

    fn check_node(
        &self,
        _ctx: &CheckContext<'_>,
        _state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck {
        let blocking = node.node().taints.iter().find(|taint| {
            // PreferNoSchedule never blocks placement outright.
            taint.effect != TaintEffect::PreferNoSchedule
                && !workload.tolerations.iter().any(|t| t.tolerates(taint))
        });
        match blocking {
            None => NodeCheck::Fit,
            Some(taint) => NodeCheck::reject(
                format!(
                    "node {} has untolerated taint {}={}",
                    node.node().name,
                    taint.key,
                    taint.value
                ),
                "UntoleratedTaint",
                RejectionKind::Permanent,
            ),
        }
    }

    fn debug_context(&self, node: &NodeState) -> Option<String> {
        Some(format!("taints on node: {:?}", node.node().taints))
    }
}
