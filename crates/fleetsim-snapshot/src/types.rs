//! Core types for the cluster state model.
//!
//! This module provides the fundamental value types used throughout
//! fleetsim-snapshot:
//! - [`Resources`]: per-kind resource quantities (requests or capacity)
//! - [`Workload`]: a unit of work with requests and placement constraints
//! - [`Node`]: an immutable snapshot of a machine's facts
//! - [`Taint`] / [`Toleration`]: node repulsion and workload exemptions

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadId(String);

impl WorkloadId {
    /// Creates a new workload ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random workload ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource quantities per resource kind.
///
/// Used both for a workload's requests and for a node's capacity and
/// allocatable totals. CPU is tracked in millicores, memory and ephemeral
/// storage in bytes; arbitrary extended resources live in [`Resources::scalar`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// CPU in millicores.
    pub cpu_millis: u64,
    /// Memory in bytes.
    pub memory_bytes: u64,
    /// Ephemeral storage in bytes.
    pub ephemeral_storage_bytes: u64,
    /// Extended scalar resources keyed by resource name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scalar: BTreeMap<String, u64>,
}

impl Resources {
    /// Creates an empty resource set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CPU request in millicores.
    #[must_use]
    pub const fn with_cpu_millis(mut self, cpu_millis: u64) -> Self {
        self.cpu_millis = cpu_millis;
        self
    }

    /// Sets the memory request in bytes.
    #[must_use]
    pub const fn with_memory_bytes(mut self, memory_bytes: u64) -> Self {
        self.memory_bytes = memory_bytes;
        self
    }

    /// Sets the ephemeral storage request in bytes.
    #[must_use]
    pub const fn with_ephemeral_storage_bytes(mut self, bytes: u64) -> Self {
        self.ephemeral_storage_bytes = bytes;
        self
    }

    /// Sets an extended scalar resource quantity.
    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, quantity: u64) -> Self {
        self.scalar.insert(name.into(), quantity);
        self
    }

    /// Returns true if every quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.cpu_millis == 0
            && self.memory_bytes == 0
            && self.ephemeral_storage_bytes == 0
            && self.scalar.values().all(|&q| q == 0)
    }

    /// Adds `other` to this resource set in place.
    pub fn add_assign(&mut self, other: &Self) {
        self.cpu_millis += other.cpu_millis;
        self.memory_bytes += other.memory_bytes;
        self.ephemeral_storage_bytes += other.ephemeral_storage_bytes;
        for (name, quantity) in &other.scalar {
            *self.scalar.entry(name.clone()).or_insert(0) += quantity;
        }
    }

    /// Subtracts `other` from this resource set in place, saturating at zero.
    pub fn saturating_sub_assign(&mut self, other: &Self) {
        self.cpu_millis = self.cpu_millis.saturating_sub(other.cpu_millis);
        self.memory_bytes = self.memory_bytes.saturating_sub(other.memory_bytes);
        self.ephemeral_storage_bytes = self
            .ephemeral_storage_bytes
            .saturating_sub(other.ephemeral_storage_bytes);
        for (name, quantity) in &other.scalar {
            if let Some(current) = self.scalar.get_mut(name) {
                *current = current.saturating_sub(*quantity);
            }
        }
    }

    /// Returns true if this set fits entirely within `available`.
    #[must_use]
    pub fn fits_within(&self, available: &Self) -> bool {
        self.cpu_millis <= available.cpu_millis
            && self.memory_bytes <= available.memory_bytes
            && self.ephemeral_storage_bytes <= available.ephemeral_storage_bytes
            && self
                .scalar
                .iter()
                .all(|(name, quantity)| *quantity <= available.scalar.get(name).copied().unwrap_or(0))
    }
}

/// Effect of a taint on workloads that do not tolerate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaintEffect {
    /// New workloads are not scheduled onto the node.
    NoSchedule,
    /// The scheduler tries to avoid the node but may still use it.
    PreferNoSchedule,
    /// Running workloads that do not tolerate the taint are evicted.
    NoExecute,
}

/// A taint applied to a node, repelling workloads that do not tolerate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taint {
    /// Taint key.
    pub key: String,
    /// Taint value; may be empty.
    pub value: String,
    /// What happens to workloads that do not tolerate this taint.
    pub effect: TaintEffect,
}

impl Taint {
    /// Creates a new taint.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            effect,
        }
    }
}

/// Operator for matching a toleration against a taint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TolerationOperator {
    /// The toleration matches any taint with the same key.
    Exists,
    /// The toleration matches taints with the same key and value.
    #[default]
    Equal,
}

/// A workload's exemption from one or more taints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toleration {
    /// Taint key to tolerate; `None` with [`TolerationOperator::Exists`]
    /// tolerates every taint.
    pub key: Option<String>,
    /// How the toleration matches taint values.
    pub operator: TolerationOperator,
    /// Taint value to match when the operator is [`TolerationOperator::Equal`].
    #[serde(default)]
    pub value: String,
    /// Taint effect to match; `None` matches all effects.
    pub effect: Option<TaintEffect>,
}

impl Toleration {
    /// Creates a toleration matching taints with the given key and value.
    #[must_use]
    pub fn equal(key: impl Into<String>, value: impl Into<String>, effect: TaintEffect) -> Self {
        Self {
            key: Some(key.into()),
            operator: TolerationOperator::Equal,
            value: value.into(),
            effect: Some(effect),
        }
    }

    /// Creates a toleration matching any taint with the given key.
    #[must_use]
    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            operator: TolerationOperator::Exists,
            value: String::new(),
            effect: None,
        }
    }

    /// Returns true if this toleration covers the given taint.
    #[must_use]
    pub fn tolerates(&self, taint: &Taint) -> bool {
        if let Some(effect) = self.effect {
            if effect != taint.effect {
                return false;
            }
        }
        match &self.key {
            // An empty key with Exists tolerates everything.
            None => self.operator == TolerationOperator::Exists,
            Some(key) => {
                if *key != taint.key {
                    return false;
                }
                match self.operator {
                    TolerationOperator::Exists => true,
                    TolerationOperator::Equal => self.value == taint.value,
                }
            }
        }
    }
}

/// Operator for a label requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelOperator {
    /// The label value must be one of the listed values.
    In,
    /// The label value must not be any of the listed values.
    NotIn,
    /// The label key must be present.
    Exists,
    /// The label key must be absent.
    DoesNotExist,
}

/// A single required node-affinity term matched against node labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRequirement {
    /// Label key the requirement applies to.
    pub key: String,
    /// Matching operator.
    pub operator: LabelOperator,
    /// Candidate values for `In`/`NotIn`; must be empty for
    /// `Exists`/`DoesNotExist` and non-empty otherwise.
    #[serde(default)]
    pub values: Vec<String>,
}

impl LabelRequirement {
    /// Returns true if the requirement is structurally valid.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self.operator {
            LabelOperator::In | LabelOperator::NotIn => !self.values.is_empty(),
            LabelOperator::Exists | LabelOperator::DoesNotExist => self.values.is_empty(),
        }
    }

    /// Evaluates the requirement against a label set.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self.operator {
            LabelOperator::In => labels
                .get(&self.key)
                .is_some_and(|v| self.values.iter().any(|c| c == v)),
            LabelOperator::NotIn => labels
                .get(&self.key)
                .is_none_or(|v| !self.values.iter().any(|c| c == v)),
            LabelOperator::Exists => labels.contains_key(&self.key),
            LabelOperator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

/// A required inter-workload affinity or anti-affinity term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodAffinityTerm {
    /// Labels that existing workloads must carry to match this term.
    pub label_selector: BTreeMap<String, String>,
    /// Node label key defining the topology domain the term applies to.
    pub topology_key: String,
    /// Namespace the matched workloads must live in.
    pub namespace: String,
}

/// A topology-spread rule limiting skew across topology domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadConstraint {
    /// Node label key defining the topology domains to spread across.
    pub topology_key: String,
    /// Maximum allowed difference between the most and least loaded domain.
    pub max_skew: u32,
    /// Labels selecting which workloads count toward the spread.
    pub label_selector: BTreeMap<String, String>,
}

/// Reference to the controller that owns a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Controller kind, e.g. `DaemonSet`.
    pub kind: String,
    /// Controller name.
    pub name: String,
}

/// A unit of work with resource requests and placement constraints.
///
/// Immutable once constructed for a given evaluation; callers clone before
/// mutating (see [`Workload::with_node_name`] and friends, which consume).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Unique identity of this workload.
    pub uid: WorkloadId,
    /// Workload name; unique within its namespace.
    pub name: String,
    /// Namespace the workload belongs to.
    pub namespace: String,
    /// Node the workload is assigned to, if any.
    pub node_name: Option<String>,
    /// Node the workload has been nominated for while a preemption
    /// decision is pending.
    pub nominated_node: Option<String>,
    /// Resource requests per resource kind.
    pub requests: Resources,
    /// Exact-match node selector labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    /// Required node-affinity terms; all must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_affinity: Vec<LabelRequirement>,
    /// Taints this workload tolerates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    /// Host ports this workload binds on its node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_ports: Vec<u16>,
    /// Required inter-workload affinity terms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_affinity: Vec<PodAffinityTerm>,
    /// Required inter-workload anti-affinity terms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_anti_affinity: Vec<PodAffinityTerm>,
    /// Topology-spread rules for this workload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spread_constraints: Vec<SpreadConstraint>,
    /// Controller that owns this workload, if any.
    pub owner: Option<OwnerRef>,
    /// Arbitrary labels on the workload itself.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Workload {
    /// Creates a new workload with a fresh UID and no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            uid: WorkloadId::generate(),
            name: name.into(),
            namespace: namespace.into(),
            node_name: None,
            nominated_node: None,
            requests: Resources::new(),
            node_selector: BTreeMap::new(),
            node_affinity: Vec::new(),
            tolerations: Vec::new(),
            host_ports: Vec::new(),
            pod_affinity: Vec::new(),
            pod_anti_affinity: Vec::new(),
            spread_constraints: Vec::new(),
            owner: None,
            labels: BTreeMap::new(),
        }
    }

    /// Sets the resource requests.
    #[must_use]
    pub fn with_requests(mut self, requests: Resources) -> Self {
        self.requests = requests;
        self
    }

    /// Assigns the workload to a node.
    #[must_use]
    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// Sets the nominated node used while preemption is pending.
    #[must_use]
    pub fn with_nominated_node(mut self, node_name: impl Into<String>) -> Self {
        self.nominated_node = Some(node_name.into());
        self
    }

    /// Adds a node-selector label.
    #[must_use]
    pub fn with_node_selector(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.node_selector.insert(key.into(), value.into());
        self
    }

    /// Adds a toleration.
    #[must_use]
    pub fn with_toleration(mut self, toleration: Toleration) -> Self {
        self.tolerations.push(toleration);
        self
    }

    /// Adds a host-port requirement.
    #[must_use]
    pub fn with_host_port(mut self, port: u16) -> Self {
        self.host_ports.push(port);
        self
    }

    /// Adds a workload label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the owning controller.
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Returns the node this workload counts against: its assignment, or
    /// its nomination when no node has been assigned yet.
    #[must_use]
    pub fn effective_node_name(&self) -> Option<&str> {
        self.node_name
            .as_deref()
            .or(self.nominated_node.as_deref())
    }
}

/// An immutable snapshot of a machine's facts at observation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node name.
    pub name: String,
    /// Total capacity per resource kind.
    pub capacity: Resources,
    /// Capacity available to workloads after system reservations.
    pub allocatable: Resources,
    /// Node labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Taints applied to the node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
    /// Whether the node is cordoned off from new workloads.
    #[serde(default)]
    pub unschedulable: bool,
}

impl Node {
    /// Creates a new schedulable node with equal capacity and allocatable.
    #[must_use]
    pub fn new(name: impl Into<String>, allocatable: Resources) -> Self {
        Self {
            name: name.into(),
            capacity: allocatable.clone(),
            allocatable,
            labels: BTreeMap::new(),
            taints: Vec::new(),
            unschedulable: false,
        }
    }

    /// Adds a node label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds a taint.
    #[must_use]
    pub fn with_taint(mut self, taint: Taint) -> Self {
        self.taints.push(taint);
        self
    }

    /// Marks the node unschedulable.
    #[must_use]
    pub const fn cordoned(mut self) -> Self {
        self.unschedulable = true;
        self
    }
}

/// Set of host ports currently bound on a node.
pub type PortSet = BTreeSet<u16>;
