//! Node selector and required node-affinity constraint.
//!
//! The pre-check rejects structurally malformed affinity terms so that no
//! per-node work runs for a workload that can never be evaluated sensibly.

use fleetsim_snapshot::{NodeState, Workload};

use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, PreCheck, RejectionKind};
use crate::plugins::selector_matches;

/// Checks node-selector labels and required node-affinity terms.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeAffinity;

/// Plugin name for [`NodeAffinity`].
pub const NODE_AFFINITY: &str = "NodeAffinity";

impl FilterPlugin for NodeAffinity {
    fn name(&self) -> &'static str {
        NODE_AFFINITY
    }

    fn pre_check(
        &self,
        _ctx: &CheckContext<'_>,
        _state: &mut CycleState,
        workload: &Workload,
    ) -> PreCheck {
        let malformed: Vec<String> = workload
            .node_affinity
            .iter()
            .filter(|req| !req.is_well_formed())
            .map(|req| format!("MalformedRequirement:{}", req.key))
            .collect();
        if malformed.is_empty() {
            PreCheck::Pass
        } else {
            PreCheck::Reject {
                message: format!(
                    "workload {} has malformed node affinity requirements",
                    workload.name
                ),
                reasons: malformed,
            }
        }
    }

    fn check_node(
        &self,
        _ctx: &CheckContext<'_>,
        _state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck {
        let labels = &node.node().labels;
        if !selector_matches(&workload.node_selector, labels) {
            return NodeCheck::reject(
                format!("node {} does not match node selector", node.node().name),
                "NodeSelectorMismatch",
                RejectionKind::Permanent,
            );
        }
        for req in &workload.node_affinity {
            if !req.matches(labels) {
                return NodeCheck::reject(
                    format!(
                        "node {} fails affinity requirement on {}",
                        node.node().name,
                        req.key
                    ),
                    "NodeAffinityMismatch",
                    RejectionKind::Permanent,
                );
            }
        }
        NodeCheck::Fit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsim_snapshot::{
        ClusterSnapshot, LabelOperator, LabelRequirement, Node, Resources,
    };

    fn labeled_node(zone: &str) -> NodeState {
        NodeState::new(
            Node::new("node-a", Resources::new().with_cpu_millis(1000)).with_label("zone", zone),
        )
    }

    #[test]
    fn selector_mismatch_is_permanent() {
        let workload = Workload::new("web", "default").with_node_selector("zone", "us-east-1a");
        let snapshot = ClusterSnapshot::new();
        let ctx = CheckContext::new(&snapshot);

        let fit =
            NodeAffinity.check_node(&ctx, &CycleState::new(), &workload, &labeled_node("us-east-1a"));
        assert_eq!(fit, NodeCheck::Fit);

        let miss =
            NodeAffinity.check_node(&ctx, &CycleState::new(), &workload, &labeled_node("eu-west-1"));
        assert!(matches!(
            miss,
            NodeCheck::Reject {
                kind: RejectionKind::Permanent,
                ..
            }
        ));
    }

    #[test]
    fn affinity_requirements_all_must_match() {
        let mut workload = Workload::new("web", "default");
        workload.node_affinity.push(LabelRequirement {
            key: "zone".into(),
            operator: LabelOperator::In,
            values: vec!["us-east-1a".into()],
        });
        workload.node_affinity.push(LabelRequirement {
            key: "gpu".into(),
            operator: LabelOperator::Exists,
            values: vec![],
        });

        let snapshot = ClusterSnapshot::new();
        let ctx = CheckContext::new(&snapshot);
        let verdict =
            NodeAffinity.check_node(&ctx, &CycleState::new(), &workload, &labeled_node("us-east-1a"));
        assert!(matches!(verdict, NodeCheck::Reject { ref reasons, .. }
            if reasons == &vec!["NodeAffinityMismatch".to_string()]));
    }

    #[test]
    fn malformed_requirement_rejected_in_pre_check() {
        let mut workload = Workload::new("web", "default");
        workload.node_affinity.push(LabelRequirement {
            key: "zone".into(),
            operator: LabelOperator::In,
            values: vec![],
        });

        let snapshot = ClusterSnapshot::new();
        let ctx = CheckContext::new(&snapshot);
        let verdict = NodeAffinity.pre_check(&ctx, &mut CycleState::new(), &workload);
        assert!(matches!(verdict, PreCheck::Reject { ref reasons, .. }
            if reasons == &vec!["MalformedRequirement:zone".to_string()]));
    }
}
