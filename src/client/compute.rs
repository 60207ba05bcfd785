use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{PoolConfig, ReconcilerSettings};

/// Public Compute Engine v1 endpoint
pub const DEFAULT_COMPUTE_API_URL: &str = "https://compute.googleapis.com/compute/v1";

// ============================================================================
// Data structures (pure, no I/O)
// ============================================================================

/// Fully qualified managed instance group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupRef {
    pub project: String,
    pub zone: String,
    pub name: String,
}

impl GroupRef {
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }

    pub fn from_pool(pool: &PoolConfig) -> Self {
        Self::new(
            &pool.project_id,
            &pool.zone_name,
            &pool.managed_instance_group_name,
        )
    }
}

impl std::fmt::Display for GroupRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.zone, self.name)
    }
}

/// One compute instance as seen by a list call. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    pub id: String,
    #[serde(rename = "privateIp", skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

/// One page of a filtered instance listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePage {
    pub instances: Vec<InstanceRef>,
    pub next_page_token: Option<String>,
}

/// Handle to an asynchronous zonal operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub project: String,
    pub zone: String,
    pub name: String,
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Observed state of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    /// Still PENDING or RUNNING on the provider side
    Pending,
    /// DONE; `error` carries the provider's error detail if it failed
    Done { error: Option<String> },
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Compute API wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResource {
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<OperationErrorBody>,
    #[serde(default)]
    http_error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorBody {
    #[serde(default)]
    errors: Vec<OperationErrorItem>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorItem {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedInstanceList {
    #[serde(default)]
    managed_instances: Vec<ManagedInstance>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedInstance {
    instance: Option<String>,
    #[serde(default)]
    current_action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceList {
    #[serde(default)]
    items: Vec<InstanceResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceResource {
    name: String,
    #[serde(default)]
    network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterface {
    #[serde(rename = "networkIP")]
    network_ip: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteInstancesRequest {
    instances: Vec<String>,
    skip_instances_on_validation_error: bool,
}

/// Managed instance actions after which the instance no longer counts as
/// part of the pool, even while it is still listed
pub const LEAVING_ACTIONS: [&str; 2] = ["DELETING", "ABANDONING"];

/// Whether a managed instance with `current_action` is leaving the group
pub fn is_leaving(current_action: Option<&str>) -> bool {
    current_action.is_some_and(|action| LEAVING_ACTIONS.contains(&action))
}

/// Reduce an instance URL (`.../zones/z/instances/name`) to its name
pub fn instance_name_from_url(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

/// Relative URL the deleteInstances call expects for an instance name
pub fn instance_url(zone: &str, name: &str) -> String {
    format!("zones/{}/instances/{}", zone, name)
}

fn operation_state(op: &OperationResource) -> OperationState {
    if op.status != "DONE" {
        return OperationState::Pending;
    }
    let error = match &op.error {
        Some(body) if !body.errors.is_empty() => Some(
            body.errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Some(_) => Some(
            op.http_error_message
                .clone()
                .unwrap_or_else(|| "operation reported an error".to_string()),
        ),
        None => None,
    };
    OperationState::Done { error }
}

fn to_instance_ref(resource: InstanceResource) -> InstanceRef {
    let private_ip = resource
        .network_interfaces
        .into_iter()
        .find_map(|nic| nic.network_ip);
    InstanceRef {
        id: resource.name,
        private_ip,
    }
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

/// The subset of the Compute API the reconciler relies on
#[async_trait]
pub trait ComputeClientTrait: Send + Sync {
    /// Ask the group to converge on `size` instances
    async fn resize(&self, group: &GroupRef, size: u32) -> Result<OperationHandle, ClientError>;

    /// Delete the named instances from the group
    async fn delete_instances(
        &self,
        group: &GroupRef,
        ids: &[String],
    ) -> Result<OperationHandle, ClientError>;

    /// Names of the instances currently managed by the group (all pages),
    /// leaving out instances that are being deleted or abandoned
    async fn list_managed_instances(&self, group: &GroupRef) -> Result<Vec<String>, ClientError>;

    /// One page of instances in a zone matching `filter`
    async fn list_instances(
        &self,
        project: &str,
        zone: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<InstancePage, ClientError>;

    /// Current state of an operation
    async fn get_operation(&self, handle: &OperationHandle)
        -> Result<OperationState, ClientError>;
}

// ============================================================================
// SBIO: I/O implementation (real HTTP client)
// ============================================================================

#[derive(Clone)]
pub struct GceComputeClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    page_size: u32,
}

impl GceComputeClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token,
            page_size: ReconcilerSettings::default().page_size,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn zone_url(&self, project: &str, zone: &str) -> String {
        format!(
            "{}/projects/{}/zones/{}",
            self.base_url.trim_end_matches('/'),
            project,
            zone
        )
    }

    fn group_url(&self, group: &GroupRef) -> String {
        format!(
            "{}/instanceGroupManagers/{}",
            self.zone_url(&group.project, &group.zone),
            group.name
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.access_token {
            Some(ref token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    fn handle_for(&self, group: &GroupRef, op: OperationResource) -> OperationHandle {
        OperationHandle {
            project: group.project.clone(),
            zone: group.zone.clone(),
            name: op.name,
        }
    }
}

#[async_trait]
impl ComputeClientTrait for GceComputeClient {
    async fn resize(&self, group: &GroupRef, size: u32) -> Result<OperationHandle, ClientError> {
        let url = format!("{}/resize", self.group_url(group));
        debug!("POST {} size={}", url, size);

        let req = self.client.post(&url).query(&[("size", size)]);
        let op: OperationResource = self.send(req).await?;
        Ok(self.handle_for(group, op))
    }

    async fn delete_instances(
        &self,
        group: &GroupRef,
        ids: &[String],
    ) -> Result<OperationHandle, ClientError> {
        let url = format!("{}/deleteInstances", self.group_url(group));
        let body = DeleteInstancesRequest {
            instances: ids.iter().map(|id| instance_url(&group.zone, id)).collect(),
            skip_instances_on_validation_error: true,
        };
        debug!("POST {} instances={}", url, body.instances.len());

        let req = self.client.post(&url).json(&body);
        let op: OperationResource = self.send(req).await?;
        Ok(self.handle_for(group, op))
    }

    async fn list_managed_instances(&self, group: &GroupRef) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/listManagedInstances", self.group_url(group));
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .post(&url)
                .query(&[("maxResults", self.page_size)]);
            if let Some(ref token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let page: ManagedInstanceList = self.send(req).await?;
            names.extend(
                page.managed_instances
                    .iter()
                    .filter(|m| !is_leaving(m.current_action.as_deref()))
                    .filter_map(|m| m.instance.as_deref())
                    .map(|u| instance_name_from_url(u).to_string()),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        trace!("Managed instances of {}: {:?}", group, names);
        Ok(names)
    }

    async fn list_instances(
        &self,
        project: &str,
        zone: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<InstancePage, ClientError> {
        let url = format!("{}/instances", self.zone_url(project, zone));
        let mut req = self
            .client
            .get(&url)
            .query(&[("filter", filter)])
            .query(&[("maxResults", self.page_size)]);
        if let Some(token) = page_token {
            req = req.query(&[("pageToken", token)]);
        }

        let list: InstanceList = self.send(req).await?;
        Ok(InstancePage {
            instances: list.items.into_iter().map(to_instance_ref).collect(),
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_operation(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationState, ClientError> {
        let url = format!(
            "{}/operations/{}",
            self.zone_url(&handle.project, &handle.zone),
            handle.name
        );
        let op: OperationResource = self.send(self.client.get(&url)).await?;
        Ok(operation_state(&op))
    }
}

// ============================================================================
// SBIO: Mock implementation for testing (no I/O)
// ============================================================================
