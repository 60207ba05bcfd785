use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientError;

/// Instances affected by a provision or terminate call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalingData {
    /// Instance IDs that were added or removed
    #[serde(rename = "nodeIds")]
    pub node_ids: BTreeSet<String>,

    /// Requested IDs not managed by the group at call time
    #[serde(
        rename = "alreadyAbsent",
        default,
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub already_absent: BTreeSet<String>,
}

impl AutoScalingData {
    pub fn new<I, S>(node_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node_ids: node_ids.into_iter().map(Into::into).collect(),
            already_absent: BTreeSet::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_already_absent(mut self, absent: BTreeSet<String>) -> Self {
        self.already_absent = absent;
        self
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_ids.contains(id)
    }
}

/// What a failed call is known to have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownChanges<'a> {
    /// Nothing was requested of the provider, so nothing changed
    None,
    /// Exactly these instances changed before the failure surfaced
    Partial(&'a AutoScalingData),
    /// A mutation was issued but its effect could not be observed
    Unknown,
}

/// Failures of reconciler operations.
///
/// "Zero instances affected" is never an error; it is an empty
/// `AutoScalingData`.
#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("Compute API call failed: {0}")]
    Transport(#[source] ClientError),

    #[error("Compute API call failed after operation {operation} was issued: {source}")]
    TransportAfterMutation {
        operation: String,
        #[source]
        source: ClientError,
    },

    #[error("Operation {operation} did not finish within {waited:?}")]
    Timeout { operation: String, waited: Duration },

    #[error("Operation {operation} failed: {detail}")]
    OperationFailed { operation: String, detail: String },

    #[error("Operation {operation} partially failed ({} instances removed): {detail}", .removed.len())]
    PartialFailure {
        operation: String,
        detail: String,
        removed: AutoScalingData,
    },
}

impl ScalerError {
    pub fn known_changes(&self) -> KnownChanges<'_> {
        match self {
            ScalerError::Transport(_) => KnownChanges::None,
            ScalerError::PartialFailure { removed, .. } => KnownChanges::Partial(removed),
            ScalerError::TransportAfterMutation { .. }
            | ScalerError::Timeout { .. }
            | ScalerError::OperationFailed { .. } => KnownChanges::Unknown,
        }
    }
}

impl From<ClientError> for ScalerError {
    fn from(e: ClientError) -> Self {
        ScalerError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique_and_sorted() {
        let data = AutoScalingData::new(["b", "a", "b"]);
        assert_eq!(data.len(), 2);
        let ids: Vec<_> = data.node_ids.iter().cloned().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_serialization_skips_empty_absent() {
        let json = serde_json::to_string(&AutoScalingData::new(["a"])).unwrap();
        assert_eq!(json, r#"{"nodeIds":["a"]}"#);

        let data = AutoScalingData::empty().with_already_absent(["x".to_string()].into());
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("alreadyAbsent"));
    }

    #[test]
    fn test_known_changes_classification() {
        let transport = ScalerError::Transport(ClientError::Http("reset".to_string()));
        assert_eq!(transport.known_changes(), KnownChanges::None);

        let timeout = ScalerError::Timeout {
            operation: "op".to_string(),
            waited: Duration::from_secs(1),
        };
        assert_eq!(timeout.known_changes(), KnownChanges::Unknown);

        let partial = ScalerError::PartialFailure {
            operation: "op".to_string(),
            detail: "boom".to_string(),
            removed: AutoScalingData::new(["a"]),
        };
        match partial.known_changes() {
            KnownChanges::Partial(removed) => assert!(removed.contains("a")),
            other => panic!("Expected Partial, got {:?}", other),
        }
        assert!(partial.to_string().contains("1 instances removed"));
    }
}
