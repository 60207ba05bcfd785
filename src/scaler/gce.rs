//! Managed-instance-group backed autoscaler
//!
//! Every call is a fresh request/response cycle against the Compute API:
//! snapshot the group, issue the mutation, wait for its operation to finish,
//! snapshot again and diff. Nothing is cached between calls.
//!
//! Concurrent calls against the same group are not coordinated. A resize or
//! delete issued by another caller between the two snapshots shows up in
//! the diff and is attributed to this call.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::data::{AutoScalingData, ScalerError};
use super::filter::{build_filter, chunk_values, ID_FILTER_FIELD, IP_FILTER_FIELD};
use super::operation::{await_terminal, OperationOutcome, WaitError};
use super::AutoScaler;
use crate::client::{ClientError, ComputeClientTrait, GroupRef, InstanceRef, OperationHandle};
use crate::config::{AutoscalerConfig, PoolConfig};

pub struct GceAutoScaler {
    env_config: PoolConfig,
    group: GroupRef,
    client: Arc<dyn ComputeClientTrait>,
    operation_timeout: Duration,
    poll_interval: Duration,
    max_filter_predicates: usize,
}

impl GceAutoScaler {
    pub fn new(config: &AutoscalerConfig, client: Arc<dyn ComputeClientTrait>) -> Self {
        Self {
            group: GroupRef::from_pool(&config.env_config),
            env_config: config.env_config.clone(),
            client,
            operation_timeout: config.settings.operation_timeout(),
            poll_interval: config.settings.poll_interval(),
            max_filter_predicates: config.settings.max_filter_predicates,
        }
    }

    /// Override the operation wait bound
    pub fn with_operation_timeout(mut self, bound: Duration) -> Self {
        self.operation_timeout = bound;
        self
    }

    /// Override the operation poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn group(&self) -> &GroupRef {
        &self.group
    }

    /// IDs of the instances the group currently manages
    pub async fn running_instances(&self) -> Result<BTreeSet<String>, ScalerError> {
        self.snapshot().await.map_err(ScalerError::Transport)
    }

    async fn snapshot(&self) -> Result<BTreeSet<String>, ClientError> {
        let ids = self.client.list_managed_instances(&self.group).await?;
        Ok(ids.into_iter().collect())
    }

    /// Snapshot taken after a mutation was issued; a failure here means the
    /// effect of `handle` is unknown.
    async fn snapshot_after(
        &self,
        handle: &OperationHandle,
    ) -> Result<BTreeSet<String>, ScalerError> {
        self.snapshot()
            .await
            .map_err(|source| ScalerError::TransportAfterMutation {
                operation: handle.name.clone(),
                source,
            })
    }

    async fn wait(&self, handle: &OperationHandle) -> Result<OperationOutcome, ScalerError> {
        await_terminal(
            self.client.as_ref(),
            handle,
            self.poll_interval,
            self.operation_timeout,
        )
        .await
        .map_err(|e| match e {
            WaitError::Transport(source) => ScalerError::TransportAfterMutation {
                operation: handle.name.clone(),
                source,
            },
            WaitError::Timeout(waited) => {
                error!(
                    "Operation {} on {} did not finish within {:?}",
                    handle, self.group, waited
                );
                ScalerError::Timeout {
                    operation: handle.name.clone(),
                    waited,
                }
            }
        })
    }

    /// Run a filtered lookup over `keys`, one request chain per chunk,
    /// following page tokens to exhaustion, and project each match.
    async fn lookup<F>(
        &self,
        keys: &[String],
        field: &str,
        project: F,
    ) -> Result<Vec<String>, ScalerError>
    where
        F: Fn(InstanceRef) -> Option<String> + Send + Sync,
    {
        let mut found = Vec::new();
        if keys.is_empty() {
            return Ok(found);
        }

        for chunk in chunk_values(keys, self.max_filter_predicates) {
            let filter = build_filter(field, chunk);
            let mut page_token: Option<String> = None;

            loop {
                let page = self
                    .client
                    .list_instances(
                        &self.env_config.project_id,
                        &self.env_config.zone_name,
                        &filter,
                        page_token.as_deref(),
                    )
                    .await?;

                found.extend(page.instances.into_iter().filter_map(&project));

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl AutoScaler for GceAutoScaler {
    fn min_num_workers(&self) -> u32 {
        self.env_config.min_workers
    }

    fn max_num_workers(&self) -> u32 {
        self.env_config.max_workers
    }

    fn env_config(&self) -> &PoolConfig {
        &self.env_config
    }

    async fn provision(&self) -> Result<AutoScalingData, ScalerError> {
        let before = self.running_instances().await?;
        let current = u32::try_from(before.len()).unwrap_or(u32::MAX);
        let desired = current
            .saturating_add(self.env_config.target_workers)
            .min(self.env_config.max_workers);

        if current >= desired {
            debug!(
                "{} already has {} instances (desired {}), nothing to provision",
                self.group, current, desired
            );
            return Ok(AutoScalingData::empty());
        }

        info!("Resizing {} from {} to {} instances", self.group, current, desired);
        let handle = self.client.resize(&self.group, desired).await?;

        match self.wait(&handle).await? {
            OperationOutcome::Succeeded => {
                let after = self.snapshot_after(&handle).await?;
                let added = AutoScalingData::new(after.difference(&before).cloned());
                info!("Provisioned instances{:?} in {}", added.node_ids, self.group);
                Ok(added)
            }
            OperationOutcome::Failed(detail) => {
                error!("Unable to provision instances in {}: {}", self.group, detail);
                Err(ScalerError::OperationFailed {
                    operation: handle.name,
                    detail,
                })
            }
        }
    }

    async fn terminate(&self, ips: &[String]) -> Result<AutoScalingData, ScalerError> {
        if ips.is_empty() {
            return Ok(AutoScalingData::empty());
        }

        let ids = self.ip_to_id_lookup(ips).await?;
        if ids.is_empty() {
            debug!("None of {:?} matched an instance, nothing to terminate", ips);
            return Ok(AutoScalingData::empty());
        }

        self.terminate_with_ids(&ids).await
    }

    async fn terminate_with_ids(&self, ids: &[String]) -> Result<AutoScalingData, ScalerError> {
        if ids.is_empty() {
            return Ok(AutoScalingData::empty());
        }

        let before = self.running_instances().await?;
        let (present, absent): (BTreeSet<String>, BTreeSet<String>) =
            ids.iter().cloned().partition(|id| before.contains(id));

        if !absent.is_empty() {
            info!(
                "Instances{:?} are not managed by {}, skipping them",
                absent, self.group
            );
        }
        if present.is_empty() {
            return Ok(AutoScalingData::empty().with_already_absent(absent));
        }

        let targets: Vec<String> = present.iter().cloned().collect();
        info!("Terminating instances{:?} in {}", targets, self.group);
        let handle = self.client.delete_instances(&self.group, &targets).await?;

        match self.wait(&handle).await? {
            OperationOutcome::Succeeded => {
                Ok(AutoScalingData::new(present).with_already_absent(absent))
            }
            OperationOutcome::Failed(detail) => {
                let after = self.snapshot_after(&handle).await?;
                let removed = AutoScalingData::new(before.difference(&after).cloned())
                    .with_already_absent(absent);
                warn!(
                    "Termination in {} partially failed, removed{:?}: {}",
                    self.group, removed.node_ids, detail
                );
                Err(ScalerError::PartialFailure {
                    operation: handle.name,
                    detail,
                    removed,
                })
            }
        }
    }

    async fn ip_to_id_lookup(&self, ips: &[String]) -> Result<Vec<String>, ScalerError> {
        let ids = self
            .lookup(ips, IP_FILTER_FIELD, |instance| Some(instance.id))
            .await?;
        debug!("Performing lookup: {:?} --> {:?}", ips, ids);
        Ok(ids)
    }

    async fn id_to_ip_lookup(&self, ids: &[String]) -> Result<Vec<String>, ScalerError> {
        let ips = self
            .lookup(ids, ID_FILTER_FIELD, |instance| instance.private_ip)
            .await?;
        debug!("Performing lookup: {:?} --> {:?}", ids, ips);
        Ok(ips)
    }
}
