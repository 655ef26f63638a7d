//! Filter chain configuration.
//!
//! The plugin set and its order are supplied externally as an ordered list
//! of plugin names; [`build_chain`] resolves it against an explicit
//! registration table. The plugin set is fixed per process lifetime.

use serde::{Deserialize, Serialize};

use crate::error::PredicateError;
use crate::plugin::FilterPlugin;
use crate::plugins::{
    InterPodAffinity, NodeAffinity, NodePorts, NodeResourcesFit, TaintToleration, TopologySpread,
};

/// Ordered list of filter plugins participating in evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Plugin names, evaluated in this order against each candidate node.
    pub plugins: Vec<String>,
}

impl Default for ChainConfig {
    /// The conventional default chain: resource fit, node
    /// selector/affinity, taints, host ports, inter-workload affinity,
    /// topology spread.
    fn default() -> Self {
        Self {
            plugins: vec![
                "NodeResourcesFit".to_string(),
                "NodeAffinity".to_string(),
                "TaintToleration".to_string(),
                "NodePorts".to_string(),
                "InterPodAffinity".to_string(),
                "TopologySpread".to_string(),
            ],
        }
    }
}

/// Returns the default plugin chain, in the order
/// [`ChainConfig::default`] names.
#[must_use]
pub fn default_chain() -> Vec<Box<dyn FilterPlugin>> {
    vec![
        Box::new(NodeResourcesFit),
        Box::new(NodeAffinity),
        Box::new(TaintToleration),
        Box::new(NodePorts),
        Box::new(InterPodAffinity),
        Box::new(TopologySpread),
    ]
}

/// Builds the ordered plugin chain described by `config`.
///
/// # Errors
///
/// Returns [`PredicateError::UnknownPlugin`] for a name with no
/// registered implementation.
pub fn build_chain(config: &ChainConfig) -> Result<Vec<Box<dyn FilterPlugin>>, PredicateError> {
    config
        .plugins
        .iter()
        .map(|name| -> Result<Box<dyn FilterPlugin>, PredicateError> {
            match name.as_str() {
                "NodeResourcesFit" => Ok(Box::new(NodeResourcesFit)),
                "NodeAffinity" => Ok(Box::new(NodeAffinity)),
                "TaintToleration" => Ok(Box::new(TaintToleration)),
                "NodePorts" => Ok(Box::new(NodePorts)),
                "InterPodAffinity" => Ok(Box::new(InterPodAffinity)),
                "TopologySpread" => Ok(Box::new(TopologySpread)),
                _ => Err(PredicateError::UnknownPlugin { name: name.clone() }),
            }
        })
        .collect()
}
