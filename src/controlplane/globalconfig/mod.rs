use crate::crd::hostedcluster::ClusterConfiguration;
use crate::crd::proxy::{Proxy, proxy_config};

pub mod proxy;

/// Cluster-wide configuration objects declared on a hosted cluster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    pub proxy: Option<Proxy>,
}

impl GlobalConfig {
    pub fn parse(configuration: Option<&ClusterConfiguration>) -> GlobalConfig {
        let proxy = configuration
            .and_then(|configuration| configuration.proxy.clone())
            .map(|spec| {
                let mut proxy = proxy_config();
                proxy.spec = spec;
                proxy
            });
        GlobalConfig { proxy }
    }
}
