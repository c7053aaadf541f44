use async_trait::async_trait;
use clap::Args;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tokio_util::sync::CancellationToken;

use super::platform::NodePoolPlatformOptions;
use crate::crd::hostedcluster::HostedCluster;
use crate::crd::nodepool::{NodePool, PowerVsNodePoolPlatform};
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::utils::store::ObjectStore;

const DEFAULT_SYS_TYPE: &str = "s922";
const DEFAULT_PROC_TYPE: &str = "shared";
const DEFAULT_PROCESSORS: &str = "0.5";
const DEFAULT_MEMORY: i32 = 32;
const PROC_TYPES: [&str; 3] = ["dedicated", "shared", "capped"];

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PowerVsPlatformCreateOptions {
    /// System type hosting the instances (e.g. s922, e980, e880)
    #[arg(long, default_value = DEFAULT_SYS_TYPE)]
    pub sys_type: String,
    /// Processor type (dedicated, shared, capped)
    #[arg(long, default_value = DEFAULT_PROC_TYPE)]
    pub proc_type: String,
    /// Number of processors allocated
    #[arg(long, default_value = DEFAULT_PROCESSORS)]
    pub processors: String,
    /// Memory allocated, in GB
    #[arg(long, default_value_t = DEFAULT_MEMORY)]
    pub memory: i32,
}

impl Default for PowerVsPlatformCreateOptions {
    fn default() -> Self {
        PowerVsPlatformCreateOptions {
            sys_type: DEFAULT_SYS_TYPE.to_string(),
            proc_type: DEFAULT_PROC_TYPE.to_string(),
            processors: DEFAULT_PROCESSORS.to_string(),
            memory: DEFAULT_MEMORY,
        }
    }
}

#[async_trait]
impl NodePoolPlatformOptions for PowerVsPlatformCreateOptions {
    fn validate(&self) -> Result<(), Error> {
        if !PROC_TYPES.contains(&self.proc_type.as_str()) {
            return Err(Error::InvalidOption {
                option: "proc-type".into(),
                reason: format!("{} is not one of {}", self.proc_type, PROC_TYPES.join(", ")),
            });
        }
        match self.processors.parse::<f64>() {
            Ok(processors) if processors.is_finite() && processors > 0.0 => {}
            _ => {
                return Err(Error::InvalidOption {
                    option: "processors".into(),
                    reason: format!("{} is not a positive number", self.processors),
                });
            }
        }
        if self.memory <= 0 {
            return Err(Error::InvalidOption {
                option: "memory".into(),
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
        node_pool.spec.platform.power_vs = Some(PowerVsNodePoolPlatform {
            system_type: self.sys_type.clone(),
            processor_type: self.proc_type.clone(),
            processors: IntOrString::String(self.processors.clone()),
            memory_gib: self.memory,
        });
        Ok(())
    }

    fn platform_type(&self) -> PlatformType {
        PlatformType::PowerVs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::nodepool::NodePoolSpec;
    use crate::nodepool::testing::hosted_cluster;
    use crate::utils::store::memory::MemoryStore;

    #[tokio::test]
    async fn fills_power_vs_sub_spec() {
        let mut pool = NodePool::new("workers", NodePoolSpec::default());
        PowerVsPlatformCreateOptions::default()
            .update_node_pool(
                &CancellationToken::new(),
                &mut pool,
                &hosted_cluster(PlatformType::PowerVs),
                &MemoryStore::new(),
            )
            .await
            .unwrap();

        let power_vs = pool.spec.platform.power_vs.clone().unwrap();
        assert_eq!(power_vs.system_type, "s922");
        assert_eq!(power_vs.processors, IntOrString::String("0.5".into()));
        assert_eq!(power_vs.memory_gib, 32);
        pool.spec.platform.validate().unwrap();
    }

    #[test]
    fn rejects_bad_flags() {
        for (options, flag) in [
            (
                PowerVsPlatformCreateOptions {
                    proc_type: "turbo".into(),
                    ..Default::default()
                },
                "proc-type",
            ),
            (
                PowerVsPlatformCreateOptions {
                    processors: "-1".into(),
                    ..Default::default()
                },
                "processors",
            ),
            (
                PowerVsPlatformCreateOptions {
                    processors: "many".into(),
                    ..Default::default()
                },
                "processors",
            ),
            (
                PowerVsPlatformCreateOptions {
                    processors: "inf".into(),
                    ..Default::default()
                },
                "processors",
            ),
            (
                PowerVsPlatformCreateOptions {
                    processors: "NaN".into(),
                    ..Default::default()
                },
                "processors",
            ),
            (
                PowerVsPlatformCreateOptions {
                    memory: 0,
                    ..Default::default()
                },
                "memory",
            ),
        ] {
            assert!(
                matches!(options.validate(), Err(Error::InvalidOption { option, .. }) if option == flag),
                "{flag}"
            );
        }
    }
}
