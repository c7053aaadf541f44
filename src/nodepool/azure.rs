use async_trait::async_trait;
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::platform::NodePoolPlatformOptions;
use crate::crd::hostedcluster::HostedCluster;
use crate::crd::nodepool::{AzureNodePoolPlatform, NodePool};
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::utils::store::ObjectStore;

const DEFAULT_INSTANCE_TYPE: &str = "Standard_D4s_v4";
const DEFAULT_ROOT_DISK_SIZE: i32 = 120;

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AzurePlatformCreateOptions {
    /// VM size for the nodes
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,
    /// OS disk size in GB
    #[arg(long, default_value_t = DEFAULT_ROOT_DISK_SIZE)]
    pub root_disk_size: i32,
    #[arg(long)]
    pub availability_zone: Option<String>,
}

impl Default for AzurePlatformCreateOptions {
    fn default() -> Self {
        AzurePlatformCreateOptions {
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            root_disk_size: DEFAULT_ROOT_DISK_SIZE,
            availability_zone: None,
        }
    }
}

#[async_trait]
impl NodePoolPlatformOptions for AzurePlatformCreateOptions {
    fn validate(&self) -> Result<(), Error> {
        if self.root_disk_size <= 0 {
            return Err(Error::InvalidOption {
                option: "root-disk-size".into(),
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }

    async fn update_node_pool(
        &self,
        _token: &CancellationToken,
        node_pool: &mut NodePool,
        _hosted_cluster: &HostedCluster,
        _store: &dyn ObjectStore,
    ) -> Result<(), Error> {
        node_pool.spec.platform.type_ = self.platform_type();
        node_pool.spec.platform.azure = Some(AzureNodePoolPlatform {
            vm_size: self.instance_type.clone(),
            disk_size_gb: self.root_disk_size,
            availability_zone: self.availability_zone.clone(),
        });
        Ok(())
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::Azure
    }
}
