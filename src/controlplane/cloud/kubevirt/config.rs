use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::errors::Error;
use crate::utils::ownerref::OwnerRef;

pub const CLOUD_CONFIG_KEY: &str = "cloud-config";

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_poll_interval: Option<u32>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InstancesV2Config {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_and_region_enabled: Option<bool>,
}

/// Configuration file read by the KubeVirt cloud controller manager
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    #[serde(default)]
    pub kubeconfig: String,
    pub load_balancer: LoadBalancerConfig,
    pub instances_v2: InstancesV2Config,
    /// Infra cluster namespace the guest's VMs live in
    pub namespace: String,
}

impl CloudConfig {
    /// The CCM talks to the infra cluster in-cluster, so no kubeconfig is set
    pub fn for_namespace(namespace: &str) -> CloudConfig {
        CloudConfig {
            kubeconfig: String::new(),
            load_balancer: LoadBalancerConfig {
                enabled: true,
                creation_poll_interval: None,
            },
            instances_v2: InstancesV2Config {
                enabled: true,
                zone_and_region_enabled: None,
            },
            namespace: namespace.to_string(),
        }
    }

    pub fn serialize(&self) -> Result<String, Error> {
        serde_yaml::to_string(self).map_err(|source| Error::Serialize {
            artifact: "cloud config".into(),
            source,
        })
    }
}

pub fn reconcile_cloud_config(cm: &mut ConfigMap, hcp: &HostedControlPlane) -> Result<(), Error> {
    let serialized = CloudConfig::for_namespace(&hcp.namespace().unwrap_or_default()).serialize()?;
    OwnerRef::from_object(hcp).apply_to(cm);
    cm.data
        .get_or_insert_with(BTreeMap::new)
        .insert(CLOUD_CONFIG_KEY.to_string(), serialized);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::manifests;
    use crate::controlplane::testing::{NAMESPACE, hosted_control_plane};

    #[test]
    fn cloud_config_targets_owner_namespace() {
        let mut cm = manifests::kubevirt_ccm_config_map(NAMESPACE);
        reconcile_cloud_config(&mut cm, &hosted_control_plane()).unwrap();

        let data = cm.data.unwrap();
        let parsed: CloudConfig = serde_yaml::from_str(&data[CLOUD_CONFIG_KEY]).unwrap();
        assert_eq!(parsed, CloudConfig::for_namespace(NAMESPACE));
        assert_eq!(cm.metadata.owner_references.unwrap()[0].kind, "HostedControlPlane");
        assert!(parsed.load_balancer.enabled);
        assert!(parsed.instances_v2.enabled);
    }

    #[test]
    fn serialized_keys_are_camel_case() {
        let yaml = CloudConfig::for_namespace(NAMESPACE).serialize().unwrap();
        assert!(yaml.contains("loadBalancer:"));
        assert!(yaml.contains("instancesV2:"));
        assert!(!yaml.contains("creationPollInterval"));
    }

    #[test]
    fn keeps_other_keys() {
        let mut cm = manifests::kubevirt_ccm_config_map(NAMESPACE);
        cm.data = Some(BTreeMap::from([("extra".to_string(), "1".to_string())]));
        reconcile_cloud_config(&mut cm, &hosted_control_plane()).unwrap();
        assert_eq!(cm.data.unwrap().len(), 2);
    }
}
