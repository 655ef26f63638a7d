//! Error types for the cluster state model.

use thiserror::Error;

/// Result type for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Errors raised by invalid snapshot mutations.
///
/// These are structural errors: always caller-correctable, never retried
/// internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// A node with the same name is already present.
    #[error("duplicate node: {node}")]
    DuplicateNode {
        /// Name of the node that already exists.
        node: String,
    },

    /// No node with the given name exists in the snapshot.
    #[error("node not found: {node}")]
    NodeNotFound {
        /// Name of the node that was not found.
        node: String,
    },

    /// The workload is not present on any node in the snapshot.
    #[error("workload not found: {workload}")]
    WorkloadNotFound {
        /// UID of the workload that was not found.
        workload: String,
    },

    /// A requested host port is already bound on the target node.
    #[error("port {port} already in use on node {node}")]
    PortConflict {
        /// Name of the node with the conflicting port.
        node: String,
        /// The conflicting host port.
        port: u16,
    },

    /// The workload carries no node assignment or nomination.
    #[error("workload {workload} has no target node")]
    NoTargetNode {
        /// UID of the unassigned workload.
        workload: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_duplicate_node() {
        let err = SnapshotError::DuplicateNode {
            node: "node-a".into(),
        };
        assert_eq!(err.to_string(), "duplicate node: node-a");
    }

    #[test]
    fn error_display_port_conflict() {
        let err = SnapshotError::PortConflict {
            node: "node-a".into(),
            port: 8080,
        };
        assert_eq!(err.to_string(), "port 8080 already in use on node node-a");
    }
}
