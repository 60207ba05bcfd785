//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use std::collections::BTreeSet;

use crate::config::AutoscalerConfig;
use crate::scaler::{KnownChanges, ScalerError};

// ============================================================================
// Resource formatting
// ============================================================================

/// Managed instances under an INSTANCE header, one per line
pub fn format_instances(ids: &BTreeSet<String>) -> String {
    if ids.is_empty() {
        return "No instances found.\n".to_string();
    }

    let mut output = String::from("INSTANCE\n");
    for id in ids {
        output.push_str(id);
        output.push('\n');
    }
    output
}

/// Validated config as pretty JSON
pub fn format_config(config: &AutoscalerConfig) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(config)
}

/// Explain a failure, including what is known to have changed
pub fn format_failure(err: &ScalerError) -> String {
    let changes = match err.known_changes() {
        KnownChanges::None => "No changes were made.".to_string(),
        KnownChanges::Partial(removed) if removed.is_empty() => {
            "No instances were removed.".to_string()
        }
        KnownChanges::Partial(removed) => format!(
            "Instances removed before the failure: {}",
            removed.node_ids.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
        KnownChanges::Unknown => {
            "Changes unknown: inspect the instance group before retrying.".to_string()
        }
    };
    format!("Error: {}\n{}", err, changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::scaler::AutoScalingData;

    #[test]
    fn test_format_instances_empty() {
        assert_eq!(format_instances(&BTreeSet::new()), "No instances found.\n");
    }

    #[test]
    fn test_format_instances() {
        let ids: BTreeSet<String> = ["druid-mm-2", "druid-mm-1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            format_instances(&ids),
            "INSTANCE\ndruid-mm-1\ndruid-mm-2\n"
        );
    }

    #[test]
    fn test_format_failure_variants() {
        let none = ScalerError::Transport(ClientError::Http("refused".to_string()));
        assert!(format_failure(&none).contains("No changes were made"));

        let partial = ScalerError::PartialFailure {
            operation: "op".to_string(),
            detail: "boom".to_string(),
            removed: AutoScalingData::new(["a", "b"]),
        };
        assert!(format_failure(&partial).contains("a, b"));

        let unknown = ScalerError::OperationFailed {
            operation: "op".to_string(),
            detail: "boom".to_string(),
        };
        assert!(format_failure(&unknown).contains("Changes unknown"));
    }
}
