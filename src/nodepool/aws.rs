use async_trait::async_trait;
use clap::Args;
use kube::ResourceExt;
use kube::api::ApiResource;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cancellable;
use super::platform::NodePoolPlatformOptions;
use crate::crd::hostedcluster::HostedCluster;
use crate::crd::nodepool::{AwsNodePoolPlatform, AwsResourceReference, AwsVolume, NodePool};
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::utils::store::ObjectStore;

const DEFAULT_INSTANCE_TYPE: &str = "m5.large";
const DEFAULT_ROOT_VOLUME_TYPE: &str = "gp3";
const DEFAULT_ROOT_VOLUME_SIZE: i64 = 120;
const MIN_ROOT_VOLUME_SIZE: i64 = 8;
const ROOT_VOLUME_TYPES: [&str; 7] = ["gp2", "gp3", "io1", "io2", "st1", "sc1", "standard"];

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AwsPlatformCreateOptions {
    /// Instance type for the nodes
    #[arg(long, default_value = DEFAULT_INSTANCE_TYPE)]
    pub instance_type: String,
    /// IAM instance profile. Defaults to `<infraID>-worker`
    #[arg(long)]
    pub instance_profile: Option<String>,
    /// Subnet for the nodes. Defaults to the subnet of another pool of the same cluster
    #[arg(long)]
    pub subnet_id: Option<String>,
    #[arg(long, default_value = DEFAULT_ROOT_VOLUME_TYPE)]
    pub root_volume_type: String,
    /// Root volume size in GiB
    #[arg(long, default_value_t = DEFAULT_ROOT_VOLUME_SIZE)]
    pub root_volume_size: i64,
    /// Provisioned IOPS, only meaningful for io1 and io2 volumes
    #[arg(long)]
    pub root_volume_iops: Option<i64>,
}

impl Default for AwsPlatformCreateOptions {
    fn default() -> Self {
        AwsPlatformCreateOptions {
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            instance_profile: None,
            subnet_id: None,
            root_volume_type: DEFAULT_ROOT_VOLUME_TYPE.to_string(),
            root_volume_size: DEFAULT_ROOT_VOLUME_SIZE,
            root_volume_iops: None,
        }
    }
}

impl AwsPlatformCreateOptions {
    /// Subnet of any other AWS pool belonging to the same cluster
    async fn sibling_subnet(
        &self,
        token: &CancellationToken,
        hosted_cluster: &HostedCluster,
        store: &dyn ObjectStore,
    ) -> Result<Option<AwsResourceReference>, Error> {
        let resource = ApiResource::erase::<NodePool>(&());
        let namespace = hosted_cluster.namespace();
        let pools = cancellable(token, store.list(&resource, namespace.as_deref())).await?;

        for pool in pools {
            let pool: NodePool = serde_json::from_value(pool)?;
            if pool.spec.cluster_name != hosted_cluster.name_any() {
                continue;
            }
            if let Some(subnet) = pool.spec.platform.aws.and_then(|aws| aws.subnet) {
                debug!("Using subnet of NodePool {}", pool.metadata.name.unwrap_or_default());
                return Ok(Some(subnet));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl NodePoolPlatformOptions for AwsPlatformCreateOptions {
    fn validate(&self) -> Result<(), Error> {
        if !ROOT_VOLUME_TYPES.contains(&self.root_volume_type.as_str()) {
            return Err(Error::InvalidOption {
                option: "root-volume-type".into(),
                reason: format!(
                    "{} is not one of {}",
                    self.root_volume_type,
                    ROOT_VOLUME_TYPES.join(", ")
                ),
            });
        }
        if self.root_volume_size < MIN_ROOT_VOLUME_SIZE {
            return Err(Error::InvalidOption {
                option: "root-volume-size".into(),
                reason: format!("must be at least {MIN_ROOT_VOLUME_SIZE}"),
            });
        }
        Ok(())
    }

    async fn update_node_pool(
        &self,
        token: &CancellationToken,
        node_pool: &mut NodePool,
        hosted_cluster: &HostedCluster,
        store: &dyn ObjectStore,
    ) -> Result<(), Error> {
        let subnet = match &self.subnet_id {
            Some(id) => Some(AwsResourceReference { id: Some(id.clone()) }),
            None => self.sibling_subnet(token, hosted_cluster, store).await?,
        };
        let instance_profile = self
            .instance_profile
            .clone()
            .unwrap_or_else(|| format!("{}-worker", hosted_cluster.spec.infra_id));

        node_pool.spec.platform.type_ = self.platform_type();
        node_pool.spec.platform.aws = Some(AwsNodePoolPlatform {
            instance_type: self.instance_type.clone(),
            instance_profile: Some(instance_profile),
            subnet,
            root_volume: Some(AwsVolume {
                size: self.root_volume_size,
                type_: self.root_volume_type.clone(),
                iops: self.root_volume_iops,
            }),
        });
        Ok(())
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::Aws
    }
}
