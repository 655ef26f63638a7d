//! The predicate checker engine.
//!
//! [`PredicateChecker`] orchestrates the pre-check and per-node stages of
//! the filter chain against the delegating cluster view. It is built once
//! and reused across control-loop cycles; [`refresh`](PredicateChecker::refresh)
//! rebuilds the snapshot it evaluates against from current facts each
//! cycle.

use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, warn};

use fleetsim_snapshot::{ClusterSnapshot, ClusterView, Node, NodeState, Workload};

use crate::config::{build_chain, default_chain, ChainConfig};
use crate::error::{FactError, PredicateError, Result};
use crate::plugin::{CheckContext, CycleState, FilterPlugin, NodeCheck, PreCheck, RejectionKind};

/// Supplies already-materialized cluster facts once per control-loop cycle.
///
/// The engine never fetches, caches, or watches facts itself.
pub trait FactSource: Send + Sync {
    /// Lists the current nodes.
    ///
    /// # Errors
    ///
    /// Returns error if the fact source is unavailable.
    fn nodes(&self) -> std::result::Result<Vec<Node>, FactError>;

    /// Lists the current workloads.
    ///
    /// # Errors
    ///
    /// Returns error if the fact source is unavailable.
    fn workloads(&self) -> std::result::Result<Vec<Workload>, FactError>;
}

/// Simple in-memory fact source for tests and simulations.
#[derive(Debug, Default)]
pub struct InMemoryFactSource {
    nodes: RwLock<Vec<Node>>,
    workloads: RwLock<Vec<Workload>>,
    unavailable: RwLock<bool>,
}

impl InMemoryFactSource {
    /// Creates an empty in-memory fact source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the node facts.
    pub fn set_nodes(&self, nodes: Vec<Node>) {
        *self.nodes.write() = nodes;
    }

    /// Replaces the workload facts.
    pub fn set_workloads(&self, workloads: Vec<Workload>) {
        *self.workloads.write() = workloads;
    }

    /// Makes subsequent listings fail, simulating an unavailable source.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }

    fn check_available(&self) -> std::result::Result<(), FactError> {
        if *self.unavailable.read() {
            return Err(FactError::new("fact source unavailable"));
        }
        Ok(())
    }
}

impl FactSource for InMemoryFactSource {
    fn nodes(&self) -> std::result::Result<Vec<Node>, FactError> {
        self.check_available()?;
        Ok(self.nodes.read().clone())
    }

    fn workloads(&self) -> std::result::Result<Vec<Workload>, FactError> {
        self.check_available()?;
        Ok(self.workloads.read().clone())
    }
}

/// Classified outcome of one placement check.
///
/// Never a bare boolean: downstream scale-up/scale-down logic depends on
/// the distinction between a node-specific rejection and an evaluation
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateOutcome {
    /// Every plugin in the chain passed; the workload fits this node.
    Fits,
    /// A plugin rejected this specific node.
    Rejected {
        /// Name of the rejecting plugin.
        plugin: &'static str,
        /// Human-readable rejection message.
        message: String,
        /// Machine-readable reason codes.
        reasons: Vec<String>,
        /// Whether the node is permanently unsuitable or transiently busy.
        kind: RejectionKind,
        /// Plugin-specific debug payload, where available.
        debug: Option<String>,
    },
    /// The evaluation machinery itself failed: a pre-check rejected the
    /// workload before any per-node work, or a plugin returned an error
    /// instead of a verdict.
    Failure {
        /// Name of the failing plugin, if attributable.
        plugin: Option<&'static str>,
        /// Description of the failure.
        message: String,
    },
}

impl PredicateOutcome {
    /// Returns true if the workload fits the node.
    #[must_use]
    pub fn is_fit(&self) -> bool {
        matches!(self, Self::Fits)
    }

    /// Returns true for a node-specific rejection.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl fmt::Display for PredicateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fits => write!(f, "fits"),
            Self::Rejected {
                plugin,
                message,
                debug,
                ..
            } => match debug {
                Some(debug) => write!(f, "rejected by {plugin}: {message} ({debug})"),
                None => write!(f, "rejected by {plugin}: {message}"),
            },
            Self::Failure { plugin, message } => match plugin {
                Some(plugin) => write!(f, "evaluation failed in {plugin}: {message}"),
                None => write!(f, "evaluation failed: {message}"),
            },
        }
    }
}

/// Orchestrates the filter chain against the delegating cluster view.
pub struct PredicateChecker<F: FactSource> {
    facts: F,
    plugins: Vec<Box<dyn FilterPlugin>>,
    view: ClusterView,
}

impl<F: FactSource> PredicateChecker<F> {
    /// Creates a checker with the default plugin chain over an empty view.
    #[must_use]
    pub fn new(facts: F) -> Self {
        Self {
            facts,
            plugins: default_chain(),
            view: ClusterView::empty(),
        }
    }

    /// Creates a checker with the chain described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::UnknownPlugin`] for an unregistered name.
    pub fn with_config(facts: F, config: &ChainConfig) -> Result<Self> {
        let plugins = build_chain(config)?;
        debug!(count = plugins.len(), "built filter plugin chain");
        Ok(Self {
            facts,
            plugins,
            view: ClusterView::empty(),
        })
    }

    /// Returns the delegating view the engine evaluates against.
    #[must_use]
    pub fn view(&self) -> &ClusterView {
        &self.view
    }

    /// Rebuilds the cluster snapshot from current facts and installs it
    /// into the view. Must be called once per control-loop cycle before
    /// dependent checks.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::FactListing`] if facts cannot be listed;
    /// the previously installed snapshot remains usable until replaced.
    pub fn refresh(&self) -> Result<()> {
        let nodes = self.facts.nodes()?;
        let workloads = self.facts.workloads()?;
        debug!(
            nodes = nodes.len(),
            workloads = workloads.len(),
            "refreshing cluster snapshot"
        );
        self.view
            .install(ClusterSnapshot::from_facts(nodes, workloads));
        Ok(())
    }

    /// Checks whether the workload fits any of the candidate nodes.
    ///
    /// Pre-checks run once; candidates are then evaluated in the
    /// caller-supplied order (the deterministic order this engine
    /// documents), skipping unschedulable nodes, and the first node that
    /// passes the whole chain is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PredicateError::PreFilterRejected`] if a pre-check
    /// rejects the workload, or [`PredicateError::NoNodeFits`] if no
    /// candidate passes.
    pub fn fits_any(&self, workload: &Workload, candidates: &[NodeState]) -> Result<String> {
        let snapshot = self.view.snapshot();
        let ctx = CheckContext::new(&snapshot);
        let state = match self.run_pre_checks(&ctx, workload) {
            Ok(state) => state,
            Err((_, message)) => {
                return Err(PredicateError::PreFilterRejected {
                    workload: workload.name.clone(),
                    message,
                });
            }
        };

        for candidate in candidates {
            if candidate.node().unschedulable {
                continue;
            }
            if self
                .run_node_chain(&ctx, &state, workload, candidate)
                .is_fit()
            {
                return Ok(candidate.node().name.clone());
            }
        }
        Err(PredicateError::NoNodeFits {
            workload: workload.name.clone(),
        })
    }

    /// Checks whether the workload fits one specific node, evaluated
    /// against the view's current snapshot.
    #[must_use]
    pub fn check_predicates(&self, workload: &Workload, node: &NodeState) -> PredicateOutcome {
        let snapshot = self.view.snapshot();
        self.check_predicates_in(&snapshot, workload, node)
    }

    /// Checks whether the workload fits one specific node, evaluated
    /// against a caller-supplied snapshot (used by simulations that build
    /// private single-node snapshots).
    #[must_use]
    pub fn check_predicates_in(
        &self,
        snapshot: &ClusterSnapshot,
        workload: &Workload,
        node: &NodeState,
    ) -> PredicateOutcome {
        let ctx = CheckContext::new(snapshot);
        let state = match self.run_pre_checks(&ctx, workload) {
            Ok(state) => state,
            Err((plugin, message)) => {
                return PredicateOutcome::Failure {
                    plugin: Some(plugin),
                    message,
                };
            }
        };
        self.run_node_chain(&ctx, &state, workload, node)
    }

    /// Runs every pre-check once, in registration order. The first
    /// rejection aborts the evaluation as a non-node-specific failure.
    fn run_pre_checks(
        &self,
        ctx: &CheckContext<'_>,
        workload: &Workload,
    ) -> std::result::Result<CycleState, (&'static str, String)> {
        let mut state = CycleState::new();
        for plugin in &self.plugins {
            if let PreCheck::Reject { message, .. } = plugin.pre_check(ctx, &mut state, workload) {
                return Err((plugin.name(), message));
            }
        }
        Ok(state)
    }

    /// Runs the per-node chain in registration order; the first rejecting
    /// plugin short-circuits the rest.
    fn run_node_chain(
        &self,
        ctx: &CheckContext<'_>,
        state: &CycleState,
        workload: &Workload,
        node: &NodeState,
    ) -> PredicateOutcome {
        for plugin in &self.plugins {
            match plugin.check_node(ctx, state, workload, node) {
                NodeCheck::Fit => {}
                NodeCheck::Reject {
                    message,
                    reasons,
                    kind,
                } => {
                    return PredicateOutcome::Rejected {
                        plugin: plugin.name(),
                        message,
                        reasons,
                        kind,
                        debug: plugin.debug_context(node),
                    };
                }
                NodeCheck::Error { message } => {
                    warn!(plugin = plugin.name(), error = %message, "filter plugin failed");
                    return PredicateOutcome::Failure {
                        plugin: Some(plugin.name()),
                        message,
                    };
                }
            }
        }
        PredicateOutcome::Fits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsim_snapshot::{Resources, Taint, TaintEffect};

    fn node(name: &str, cpu: u64) -> Node {
        Node::new(name, Resources::new().with_cpu_millis(cpu))
    }

    fn pending_workload(cpu: u64) -> Workload {
        Workload::new("web", "default").with_requests(Resources::new().with_cpu_millis(cpu))
    }

    fn checker_with_facts(nodes: Vec<Node>, workloads: Vec<Workload>) -> PredicateChecker<InMemoryFactSource> {
        let facts = InMemoryFactSource::new();
        facts.set_nodes(nodes);
        facts.set_workloads(workloads);
        let checker = PredicateChecker::new(facts);
        checker.refresh().expect("refresh");
        checker
    }

    #[test]
    fn refresh_installs_current_facts() {
        let checker = checker_with_facts(
            vec![node("node-a", 2000)],
            vec![pending_workload(500).with_node_name("node-a")],
        );
        let snapshot = checker.view().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.node("node-a").expect("node").requested().cpu_millis,
            500
        );
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let facts = InMemoryFactSource::new();
        facts.set_nodes(vec![node("node-a", 2000)]);
        let checker = PredicateChecker::new(facts);
        checker.refresh().expect("refresh");

        checker.facts.set_unavailable(true);
        let err = checker.refresh().expect_err("unavailable");
        assert!(matches!(err, PredicateError::FactListing { .. }));

        // The previous snapshot stays queryable with unchanged results.
        let target = NodeState::new(node("node-a", 2000));
        let first = checker.check_predicates(&pending_workload(500), &target);
        let second = checker.check_predicates(&pending_workload(500), &target);
        assert_eq!(first, PredicateOutcome::Fits);
        assert_eq!(first, second);
        assert!(checker.view().snapshot().node("node-a").is_some());
    }

    #[test]
    fn fits_any_returns_first_passing_candidate() {
        let checker = checker_with_facts(vec![], vec![]);
        let candidates = vec![
            NodeState::new(node("small", 100)),
            NodeState::new(node("first-fit", 2000)),
            NodeState::new(node("second-fit", 2000)),
        ];
        let placed = checker
            .fits_any(&pending_workload(500), &candidates)
            .expect("fits");
        assert_eq!(placed, "first-fit");
    }

    #[test]
    fn fits_any_skips_unschedulable_nodes() {
        let checker = checker_with_facts(vec![], vec![]);
        let candidates = vec![
            NodeState::new(node("cordoned", 2000).cordoned()),
            NodeState::new(node("open", 2000)),
        ];
        let placed = checker
            .fits_any(&pending_workload(500), &candidates)
            .expect("fits");
        assert_eq!(placed, "open");
    }

    #[test]
    fn fits_any_aggregate_error_when_nothing_fits() {
        let checker = checker_with_facts(vec![], vec![]);
        let candidates = vec![
            NodeState::new(node("small-1", 100)),
            NodeState::new(node("small-2", 200)),
        ];
        let err = checker
            .fits_any(&pending_workload(500), &candidates)
            .expect_err("no fit");
        assert_eq!(
            err,
            PredicateError::NoNodeFits {
                workload: "web".into()
            }
        );
    }

    #[test]
    fn fits_any_agrees_with_check_predicates() {
        let checker = checker_with_facts(vec![], vec![]);
        let candidates = vec![
            NodeState::new(node("small", 100)),
            NodeState::new(node("big", 4000)),
        ];
        let workload = pending_workload(500);

        let placed = checker.fits_any(&workload, &candidates).expect("fits");
        let independently_fitting: Vec<_> = candidates
            .iter()
            .filter(|c| checker.check_predicates(&workload, c).is_fit())
            .map(|c| c.node().name.clone())
            .collect();
        assert!(independently_fitting.contains(&placed));
    }

    #[test]
    fn pre_check_rejection_is_node_independent() {
        use fleetsim_snapshot::{LabelOperator, LabelRequirement};

        let checker = checker_with_facts(vec![], vec![]);
        let mut workload = pending_workload(1);
        workload.node_affinity.push(LabelRequirement {
            key: "zone".into(),
            operator: LabelOperator::In,
            values: vec![],
        });

        let outcome_a = checker.check_predicates(&workload, &NodeState::new(node("node-a", 4000)));
        let outcome_b = checker.check_predicates(&workload, &NodeState::new(node("node-b", 100)));
        assert!(matches!(
            outcome_a,
            PredicateOutcome::Failure {
                plugin: Some("NodeAffinity"),
                ..
            }
        ));
        assert_eq!(outcome_a, outcome_b);

        let err = checker
            .fits_any(&workload, &[NodeState::new(node("node-a", 4000))])
            .expect_err("pre-filter");
        assert!(matches!(err, PredicateError::PreFilterRejected { .. }));
    }

    #[test]
    fn port_conflict_attributed_to_node_ports_plugin() {
        let checker = checker_with_facts(vec![], vec![]);
        let mut occupied = NodeState::new(node("node-a", 4000));
        occupied
            .add_workload(
                Workload::new("existing", "default")
                    .with_node_name("node-a")
                    .with_host_port(8080),
            )
            .expect("add");

        let workload = pending_workload(100).with_host_port(8080);
        let outcome = checker.check_predicates(&workload, &occupied);
        assert!(matches!(
            outcome,
            PredicateOutcome::Rejected {
                plugin: "NodePorts",
                kind: RejectionKind::Transient,
                ..
            }
        ));
    }

    #[test]
    fn taint_rejection_carries_debug_payload() {
        let checker = checker_with_facts(vec![], vec![]);
        let tainted = NodeState::new(
            node("node-a", 4000)
                .with_taint(Taint::new("dedicated", "batch", TaintEffect::NoSchedule)),
        );

        let outcome = checker.check_predicates(&pending_workload(100), &tainted);
        let PredicateOutcome::Rejected { plugin, debug, .. } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(plugin, "TaintToleration");
        assert!(debug.expect("debug payload").contains("dedicated"));
    }

    #[test]
    fn check_predicates_in_uses_private_snapshot() {
        // The view is empty; the simulation snapshot supplies the context.
        let checker = checker_with_facts(vec![], vec![]);
        let mut snapshot = ClusterSnapshot::new();
        snapshot.add_node(node("sim-node", 2000)).expect("add");

        let target = snapshot.node("sim-node").expect("node").clone();
        let outcome = checker.check_predicates_in(&snapshot, &pending_workload(500), &target);
        assert_eq!(outcome, PredicateOutcome::Fits);
    }

    #[test]
    fn outcome_display_formats() {
        assert_eq!(PredicateOutcome::Fits.to_string(), "fits");
        let rejected = PredicateOutcome::Rejected {
            plugin: "TaintToleration",
            message: "untolerated taint".into(),
            reasons: vec!["UntoleratedTaint".into()],
            kind: RejectionKind::Permanent,
            debug: Some("taints on node: []".into()),
        };
        assert_eq!(
            rejected.to_string(),
            "rejected by TaintToleration: untolerated taint (taints on node: [])"
        );
    }
}
