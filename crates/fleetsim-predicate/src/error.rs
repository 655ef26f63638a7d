//! Error types for the predicate evaluation engine.

use thiserror::Error;

/// Result type for predicate engine operations.
pub type Result<T> = std::result::Result<T, PredicateError>;

/// Failure to list cluster facts from a [`FactSource`](crate::FactSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FactError {
    /// Description of why the facts could not be listed.
    pub message: String,
}

impl FactError {
    /// Creates a new fact-listing error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the predicate checker engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredicateError {
    /// Current cluster facts could not be listed during a refresh.
    ///
    /// The previously installed snapshot remains usable until replaced.
    #[error("could not list cluster facts: {message}")]
    FactListing {
        /// Description of the listing failure.
        message: String,
    },

    /// A pre-check rejected the workload before any per-node work ran.
    #[error("pre-filter rejected workload {workload}: {message}")]
    PreFilterRejected {
        /// Name of the rejected workload.
        workload: String,
        /// The pre-check's rejection message.
        message: String,
    },

    /// No candidate node passed the full filter chain.
    #[error("cannot place workload {workload} on any node")]
    NoNodeFits {
        /// Name of the workload that fits nowhere.
        workload: String,
    },

    /// A chain configuration named a plugin that is not registered.
    #[error("unknown filter plugin: {name}")]
    UnknownPlugin {
        /// The unrecognized plugin name.
        name: String,
    },
}

impl From<FactError> for PredicateError {
    fn from(err: FactError) -> Self {
        Self::FactListing {
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_no_node_fits() {
        let err = PredicateError::NoNodeFits {
            workload: "web".into(),
        };
        assert_eq!(err.to_string(), "cannot place workload web on any node");
    }

    #[test]
    fn fact_error_converts_to_fact_listing() {
        let err: PredicateError = FactError::new("source unavailable").into();
        assert_eq!(
            err.to_string(),
            "could not list cluster facts: source unavailable"
        );
    }
}
