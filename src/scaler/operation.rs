//! Bounded wait on asynchronous zonal operations
//!
//! Operations are polled until they report DONE or the bound expires.
//! Dropping the returned future stops polling, so callers can layer their
//! own cancellation on top.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use crate::client::{ClientError, ComputeClientTrait, OperationHandle, OperationState};

/// Terminal outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Succeeded,
    Failed(String),
}

/// Why waiting did not produce an outcome
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Operation poll failed: {0}")]
    Transport(#[source] ClientError),

    #[error("Operation did not finish within {0:?}")]
    Timeout(Duration),
}

/// Poll `handle` every `poll_interval` until terminal, for at most `bound`
pub async fn await_terminal(
    client: &dyn ComputeClientTrait,
    handle: &OperationHandle,
    poll_interval: Duration,
    bound: Duration,
) -> Result<OperationOutcome, WaitError> {
    debug!("Waiting up to {:?} for operation {}", bound, handle);

    match timeout(bound, poll_until_done(client, handle, poll_interval)).await {
        Ok(result) => result.map_err(WaitError::Transport),
        Err(_) => Err(WaitError::Timeout(bound)),
    }
}

async fn poll_until_done(
    client: &dyn ComputeClientTrait,
    handle: &OperationHandle,
    poll_interval: Duration,
) -> Result<OperationOutcome, ClientError> {
    let mut polls = 0u32;
    loop {
        polls += 1;
        match client.get_operation(handle).await? {
            OperationState::Done { error: None } => {
                debug!("Operation {} succeeded after {} polls", handle, polls);
                return Ok(OperationOutcome::Succeeded);
            }
            OperationState::Done { error: Some(detail) } => {
                debug!("Operation {} failed after {} polls: {}", handle, polls, detail);
                return Ok(OperationOutcome::Failed(detail));
            }
            OperationState::Pending => {
                trace!("Operation {} still pending (poll {})", handle, polls);
                sleep(poll_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockComputeClient;

    fn handle() -> OperationHandle {
        OperationHandle {
            project: "p".to_string(),
            zone: "z".to_string(),
            name: "operation-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_waits_through_pending_states() {
        let client = MockComputeClient::new().with_operation_states(vec![
            OperationState::Pending,
            OperationState::Pending,
            OperationState::Done { error: None },
        ]);

        let outcome = await_terminal(
            &client,
            &handle(),
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(outcome, OperationOutcome::Succeeded);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_reports_failure_detail() {
        let client = MockComputeClient::new().with_operation_states(vec![OperationState::Done {
            error: Some("ZONE_RESOURCE_POOL_EXHAUSTED".to_string()),
        }]);

        let outcome = await_terminal(
            &client,
            &handle(),
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            OperationOutcome::Failed("ZONE_RESOURCE_POOL_EXHAUSTED".to_string())
        );
    }

    #[tokio::test]
    async fn test_bounded_wait_times_out() {
        let client = MockComputeClient::new()
            .with_operation_states(vec![OperationState::Pending; 10_000]);

        let result = await_terminal(
            &client,
            &handle(),
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
        .await;

        match result {
            Err(WaitError::Timeout(waited)) => assert_eq!(waited, Duration::from_millis(50)),
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_failure_is_transport_error() {
        let client = MockComputeClient::new().failing_operation_poll();

        let err = await_terminal(
            &client,
            &handle(),
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WaitError::Transport(ClientError::Http(_))));
        assert!(err.to_string().starts_with("Operation poll failed"));
        assert_eq!(
            WaitError::Timeout(Duration::from_secs(1)).to_string(),
            "Operation did not finish within 1s"
        );
    }
}
