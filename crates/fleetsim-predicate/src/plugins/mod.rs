//! The default constraint plugin set.
//!
//! Registration order mirrors a conventional scheduler's default chain:
//! resource fit, node selector/affinity, taints/tolerations, host ports,
//! inter-workload affinity, topology spread.

mod affinity;
mod pod_affinity;
mod ports;
mod resources;
mod spread;
mod taints;

pub use affinity::NodeAffinity;
pub use pod_affinity::InterPodAffinity;
pub use ports::NodePorts;
pub use resources::NodeResourcesFit;
pub use spread::TopologySpread;
pub use taints::TaintToleration;

use std::collections::BTreeMap;

/// Returns true if every selector entry is present in `labels`.
pub(crate) fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
}
