//! Topology-spread constraint.
//!
//! Placing the workload on the candidate node must not push the skew of
//! matching workloads across the constraint's topology domains beyond its
//! `max_skew`. Skew is measured for the placement itself: the candidate
//! domain's count after placement versus the least-loaded domain, so a
//! placement into an underloaded domain is never blamed for pre-existing
//! imbalance. Only domains that exist in the snapshot count toward the
//! skew; a node missing the topology label cannot host spread-constrained
//! workloads.

use std::collections::BTreeMap;

use fleetsim_snapshot::{ClusterSnapshot, NodeState, SpreadConstraint, Workload};

use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, RejectionKind};
use crate::plugins::selector_matches;

/// Checks topology-spread rules against the evaluation snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopologySpread;

/// Plugin name for [`TopologySpread`].
pub const TOPOLOGY_SPREAD: &str = "TopologySpread";

/// Counts matching workloads per topology domain value.
fn domain_counts(
    snapshot: &ClusterSnapshot,
    constraint: &SpreadConstraint,
    placing: &Workload,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for state in snapshot.nodes() {
        let Some(value) = state.node().labels.get(&constraint.topology_key) else {
            continue;
        };
        let count = counts.entry(value.clone()).or_insert(0);
        *count += state
            .workloads()
            .iter()
            .filter(|w| {
                w.uid != placing.uid && selector_matches(&constraint.label_selector, &w.labels)
            })
            .count() as u64;
    }
    counts
}

impl FilterPlugin for TopologySpread {
    fn name(&self) -> &'static str {
        TOPOLOGY_SPREAD
    }

    fn check_node(
        &self,
        ctx: &CheckContext<'_>,
        _state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck {
        for constraint in &workload.spread_constraints {
            let Some(candidate_domain) = node.node().labels.get(&constraint.topology_key) else {
                return NodeCheck::reject(
                    format!(
                        "node {} lacks topology label {}",
                        node.node().name,
                        constraint.topology_key
                    ),
                    "MissingTopologyLabel",
                    RejectionKind::Permanent,
                );
            };
            let counts = domain_counts(ctx.snapshot(), constraint, workload);
            let candidate_count = counts.get(candidate_domain).copied().unwrap_or(0);
            let min = counts.values().copied().min().unwrap_or(0);

            // Skew of the placement itself: the candidate domain after
            // this workload lands versus the least-loaded domain.
            let skew = (candidate_count + 1).saturating_sub(min);
            if skew > u64::from(constraint.max_skew) {
                return NodeCheck::reject(
                    format!(
                        "placing on node {} exceeds max skew {} across {}",
                        node.node().name,
                        constraint.max_skew,
                        constraint.topology_key
                    ),
                    "MaxSkewExceeded",
                    RejectionKind::Transient,
                );
            }
        }
        NodeCheck::Fit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsim_snapshot::{Node, Resources};

    fn zone_node(name: &str, zone: &str) -> Node {
        Node::new(name, Resources::new().with_cpu_millis(4000)).with_label("zone", zone)
    }

    fn web_workload(name: &str, node: &str) -> Workload {
        Workload::new(name, "default")
            .with_node_name(node)
            .with_label("app", "web")
    }

    fn spread_workload() -> Workload {
        let mut w = Workload::new("web-new", "default").with_label("app", "web");
        w.spread_constraints.push(SpreadConstraint {
            topology_key: "zone".to_string(),
            max_skew: 1,
            label_selector: BTreeMap::from([("app".to_string(), "web".to_string())]),
        });
        w
    }

    #[test]
    fn skew_within_limit_fits() {
        // No replicas anywhere yet: the first placement makes one domain 1
        // and the other 0, skew 1, within the limit.
        let snapshot = ClusterSnapshot::from_facts(
            vec![zone_node("node-a", "zone-a"), zone_node("node-b", "zone-b")],
            vec![],
        );
        let ctx = CheckContext::new(&snapshot);
        let workload = spread_workload();

        for node_name in ["node-a", "node-b"] {
            let node = snapshot.node(node_name).expect("node");
            assert_eq!(
                TopologySpread.check_node(&ctx, &CycleState::new(), &workload, node),
                NodeCheck::Fit,
                "placement on {node_name} should fit"
            );
        }
    }

    #[test]
    fn skew_beyond_limit_rejected() {
        // 2 replicas in zone a, 0 in zone b: another in zone a makes skew 3.
        let snapshot = ClusterSnapshot::from_facts(
            vec![zone_node("node-a", "zone-a"), zone_node("node-b", "zone-b")],
            vec![
                web_workload("web-1", "node-a"),
                web_workload("web-2", "node-a"),
            ],
        );
        let ctx = CheckContext::new(&snapshot);
        let workload = spread_workload();

        let crowded = snapshot.node("node-a").expect("node");
        assert!(matches!(
            TopologySpread.check_node(&ctx, &CycleState::new(), &workload, crowded),
            NodeCheck::Reject { ref reasons, .. }
                if reasons == &vec!["MaxSkewExceeded".to_string()]
        ));

        let empty = snapshot.node("node-b").expect("node");
        assert_eq!(
            TopologySpread.check_node(&ctx, &CycleState::new(), &workload, empty),
            NodeCheck::Fit
        );
    }

    #[test]
    fn placement_into_least_loaded_domain_always_fits() {
        // 3 replicas in zone a, 0 in zone b: the cluster is already skewed
        // beyond the limit, but placing into zone b reduces the imbalance
        // and must not be rejected for it.
        let snapshot = ClusterSnapshot::from_facts(
            vec![zone_node("node-a", "zone-a"), zone_node("node-b", "zone-b")],
            vec![
                web_workload("web-1", "node-a"),
                web_workload("web-2", "node-a"),
                web_workload("web-3", "node-a"),
            ],
        );
        let ctx = CheckContext::new(&snapshot);
        let workload = spread_workload();

        let underloaded = snapshot.node("node-b").expect("node");
        assert_eq!(
            TopologySpread.check_node(&ctx, &CycleState::new(), &workload, underloaded),
            NodeCheck::Fit
        );

        let crowded = snapshot.node("node-a").expect("node");
        assert!(matches!(
            TopologySpread.check_node(&ctx, &CycleState::new(), &workload, crowded),
            NodeCheck::Reject { ref reasons, .. }
                if reasons == &vec!["MaxSkewExceeded".to_string()]
        ));
    }

    #[test]
    fn missing_topology_label_is_permanent_rejection() {
        let snapshot = ClusterSnapshot::from_facts(
            vec![Node::new("bare", Resources::new().with_cpu_millis(4000))],
            vec![],
        );
        let ctx = CheckContext::new(&snapshot);
        let node = snapshot.node("bare").expect("node");
        assert!(matches!(
            TopologySpread.check_node(&ctx, &CycleState::new(), &spread_workload(), node),
            NodeCheck::Reject {
                kind: RejectionKind::Permanent,
                ..
            }
        ));
    }
}
