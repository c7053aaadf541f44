use async_trait::async_trait;
use clap::Args;
use lazy_static::lazy_static;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use super::platform::NodePoolPlatformOptions;
use crate::crd::hostedcluster::HostedCluster;
use crate::crd::nodepool::{
    KubevirtCompute, KubevirtNodePoolPlatform, KubevirtRootVolume, NodePool,
};
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::utils::store::ObjectStore;

const DEFAULT_MEMORY: &str = "4Gi";
const DEFAULT_CORES: u32 = 2;
const DEFAULT_ROOT_VOLUME_SIZE: u32 = 16;

lazy_static! {
    /// Plain decimal quantity with an optional binary or decimal SI suffix
    static ref QUANTITY: Regex =
        Regex::new(r"^[0-9]+(\.[0-9]+)?(Ki|Mi|Gi|Ti|Pi|Ei|k|M|G|T|P|E)?$").unwrap();
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct KubevirtPlatformCreateOptions {
    /// Memory of each VM, as a quantity such as 4Gi
    #[arg(long, default_value = DEFAULT_MEMORY)]
    pub memory: String,
    #[arg(long, default_value_t = DEFAULT_CORES)]
    pub cores: u32,
    /// Root volume size in Gi
    #[arg(long, default_value_t = DEFAULT_ROOT_VOLUME_SIZE)]
    pub root_volume_size: u32,
    /// Storage class of the root volume. The infra cluster default when unset
    #[arg(long)]
    pub root_volume_storage_class: Option<String>,
    /// Container disk image to boot from instead of the release's RHCOS image
    #[arg(long = "containerdisk")]
    pub container_disk: Option<String>,
}

impl Default for KubevirtPlatformCreateOptions {
    fn default() -> Self {
        KubevirtPlatformCreateOptions {
            memory: DEFAULT_MEMORY.to_string(),
            cores: DEFAULT_CORES,
            root_volume_size: DEFAULT_ROOT_VOLUME_SIZE,
            root_volume_storage_class: None,
            container_disk: None,
        }
    }
}

#[async_trait]
impl NodePoolPlatformOptions for KubevirtPlatformCreateOptions {
    fn validate(&self) -> Result<(), Error> {
        if !QUANTITY.is_match(&self.memory) {
            return Err(Error::InvalidOption {
                option: "memory".into(),
                reason: format!("{} is not a valid quantity", self.memory),
            });
        }
        if self.cores == 0 {
            return Err(Error::InvalidOption {
                option: "cores".into(),
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
        node_pool.spec.platform.kubevirt = Some(KubevirtNodePoolPlatform {
            compute: KubevirtCompute {
                memory: self.memory.clone(),
                cores: self.cores,
            },
            root_volume: KubevirtRootVolume {
                size: self.root_volume_size,
                storage_class: self.root_volume_storage_class.clone(),
                container_disk_image: self.container_disk.clone(),
            },
        });
        Ok(())
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::KubeVirt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_must_be_a_quantity() {
        for memory in ["4Gi", "512Mi", "8G", "1.5Gi", "4096"] {
            let options = KubevirtPlatformCreateOptions {
                memory: memory.into(),
                ..Default::default()
            };
            assert!(options.validate().is_ok(), "{memory}");
        }
        for memory in ["", "four", "4 Gi", "-4Gi", "4Gb"] {
            let options = KubevirtPlatformCreateOptions {
                memory: memory.into(),
                ..Default::default()
            };
            assert!(options.validate().is_err(), "{memory}");
        }
    }

    #[test]
    fn cores_must_be_positive() {
        let options = KubevirtPlatformCreateOptions {
            cores: 0,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(Error::InvalidOption { option, .. }) if option == "cores"));
    }
}
