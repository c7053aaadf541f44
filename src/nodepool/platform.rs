use async_trait::async_trait;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use super::aws::AwsPlatformCreateOptions;
use super::azure::AzurePlatformCreateOptions;
use super::kubevirt::KubevirtPlatformCreateOptions;
use super::powervs::PowerVsPlatformCreateOptions;
use crate::crd::hostedcluster::HostedCluster;
use crate::crd::nodepool::NodePool;
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::utils::store::ObjectStore;

/// Platform specific half of node pool creation
#[async_trait]
pub trait NodePoolPlatformOptions: Send + Sync {
    /// Check the flags on their own, before anything is looked up
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Set `spec.platform.type` and fill in the matching platform sub-spec.
    /// Lookups through `store` must give way to `token`
    async fn update_node_pool(
        &self,
        token: &CancellationToken,
        node_pool: &mut NodePool,
        hosted_cluster: &HostedCluster,
        store: &dyn ObjectStore,
    ) -> Result<(), Error>;

    fn platform_type(&self) -> PlatformType;
}

/// Every platform node pools can be created for
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum PlatformOptions {
    /// Create an AWS node pool
    #[command(name = "aws")]
    Aws(AwsPlatformCreateOptions),
    /// Create an Azure node pool
    #[command(name = "azure")]
    Azure(AzurePlatformCreateOptions),
    /// Create a PowerVS node pool
    #[command(name = "powervs")]
    PowerVs(PowerVsPlatformCreateOptions),
    /// Create a KubeVirt node pool
    #[command(name = "kubevirt")]
    KubeVirt(KubevirtPlatformCreateOptions),
}

impl PlatformOptions {
    /// Resolve a selector such as `powervs` to its strategy with default flags.
    /// Pure, so a bad selector fails before anything is looked up
    pub fn from_selector(selector: &str) -> Result<PlatformOptions, Error> {
        match selector.parse::<PlatformType>()? {
            PlatformType::Aws => Ok(PlatformOptions::Aws(Default::default())),
            PlatformType::Azure => Ok(PlatformOptions::Azure(Default::default())),
            PlatformType::PowerVs => Ok(PlatformOptions::PowerVs(Default::default())),
            PlatformType::KubeVirt => Ok(PlatformOptions::KubeVirt(Default::default())),
            other @ (PlatformType::Agent | PlatformType::None) => {
                Err(Error::UnsupportedPlatform(other))
            }
        }
    }

    fn strategy(&self) -> &dyn NodePoolPlatformOptions {
        match self {
            PlatformOptions::Aws(options) => options,
            PlatformOptions::Azure(options) => options,
            PlatformOptions::PowerVs(options) => options,
            PlatformOptions::KubeVirt(options) => options,
        }
    }
}

#[async_trait]
impl NodePoolPlatformOptions for PlatformOptions {
    fn validate(&self) -> Result<(), Error> {
        self.strategy().validate()
    }

    async fn update_node_pool(
        &self,
        token: &CancellationToken,
        node_pool: &mut NodePool,
        hosted_cluster: &HostedCluster,
        store: &dyn ObjectStore,
    ) -> Result<(), Error> {
        self.strategy()
            .update_node_pool(token, node_pool, hosted_cluster, store)
            .await
    }

    fn platform_type(&self) -> PlatformType {
        self.strategy().platform_type()
    }
}
