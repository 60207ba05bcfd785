pub mod compute;

pub use compute::{
    instance_name_from_url, instance_url, ClientError, ComputeClientTrait, GceComputeClient,
    GroupRef, InstancePage, InstanceRef, OperationHandle, OperationState,
    DEFAULT_COMPUTE_API_URL,
};

#[cfg(test)]
pub use compute::mock;
