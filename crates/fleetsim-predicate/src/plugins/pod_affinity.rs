//! Required inter-workload affinity and anti-affinity.
//!
//! A topology domain is the set of nodes sharing the candidate node's
//! value for a term's topology key. Affinity requires some existing
//! workload matching the term's selector inside the domain; anti-affinity
//! requires none. Existing workloads are read from the evaluation's
//! snapshot context.

use fleetsim_snapshot::{ClusterSnapshot, NodeState, PodAffinityTerm, Workload};

use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, RejectionKind};
use crate::plugins::selector_matches;

/// Checks required inter-workload affinity and anti-affinity terms.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterPodAffinity;

/// Plugin name for [`InterPodAffinity`].
pub const INTER_POD_AFFINITY: &str = "InterPodAffinity";

/// Returns true if any workload in the candidate node's topology domain
/// matches the term, excluding the workload being placed itself.
fn domain_has_match(
    snapshot: &ClusterSnapshot,
    term: &PodAffinityTerm,
    candidate: &NodeState,
    placing: &Workload,
) -> Option<bool> {
    let domain_value = candidate.node().labels.get(&term.topology_key)?;
    let found = snapshot
        .nodes()
        .filter(|state| {
            state
                .node()
                .labels
                .get(&term.topology_key)
                .is_some_and(|v| v == domain_value)
        })
        .flat_map(|state| state.workloads().iter())
        .any(|w| {
            w.uid != placing.uid
                && w.namespace == term.namespace
                && selector_matches(&term.label_selector, &w.labels)
        });
    Some(found)
}

impl FilterPlugin for InterPodAffinity {
    fn name(&self) -> &'static str {
        INTER_POD_AFFINITY
    }

    fn check_node(
        &self,
        ctx: &CheckContext<'_>,
        _state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> NodeCheck {
        for term in &workload.pod_affinity {
            match domain_has_match(ctx.snapshot(), term, node, workload) {
                Some(true) => {}
                // A node outside every domain (missing the topology label)
                // can never satisfy a required affinity term.
                Some(false) | None => {
                    return NodeCheck::reject(
                        format!(
                            "no workload matching affinity term on {} in domain of node {}",
                            term.topology_key,
                            node.node().name
                        ),
                        "PodAffinityNotSatisfied",
                        RejectionKind::Transient,
                    );
                }
            }
        }
        for term in &workload.pod_anti_affinity {
            if domain_has_match(ctx.snapshot(), term, node, workload) == Some(true) {
                return NodeCheck::reject(
                    format!(
                        "workload matching anti-affinity term on {} already in domain of node {}",
                        term.topology_key,
                        node.node().name
                    ),
                    "PodAntiAffinityViolated",
                    RejectionKind::Transient,
                );
            }
        }
        NodeCheck::Fit
    }
}
