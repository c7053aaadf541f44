use crate::crd::hostedcluster::Release;
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::utils::wait_crd_ready;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{
    Api, Client, CustomResource, CustomResourceExt,
    api::{Patch, PatchParams},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const NODE_POOL_CRD_NAME: &str = "nodepools.hypershift.openshift.io";

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, Copy, JsonSchema, clap::ValueEnum)]
pub enum UpgradeType {
    #[default]
    Replace,
    InPlace,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolManagement {
    pub upgrade_type: UpgradeType,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct AwsResourceReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsVolume {
    pub size: i64,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "iops", skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsNodePoolPlatform {
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<AwsResourceReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<AwsVolume>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureNodePoolPlatform {
    pub vm_size: String,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PowerVsNodePoolPlatform {
    pub system_type: String,
    pub processor_type: String,
    pub processors: IntOrString,
    #[serde(rename = "memoryGiB")]
    pub memory_gib: i32,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtCompute {
    pub memory: String,
    pub cores: u32,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtRootVolume {
    /// Size in GiB
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_disk_image: Option<String>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtNodePoolPlatform {
    pub compute: KubevirtCompute,
    pub root_volume: KubevirtRootVolume,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolPlatform {
    #[serde(rename = "type")]
    pub type_: PlatformType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsNodePoolPlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureNodePoolPlatform>,
    #[serde(rename = "powervs", skip_serializing_if = "Option::is_none")]
    pub power_vs: Option<PowerVsNodePoolPlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubevirt: Option<KubevirtNodePoolPlatform>,
}

impl NodePoolPlatform {
    fn populated(&self) -> Vec<PlatformType> {
        let mut populated = Vec::new();
        if self.aws.is_some() {
            populated.push(PlatformType::Aws);
        }
        if self.azure.is_some() {
            populated.push(PlatformType::Azure);
        }
        if self.power_vs.is_some() {
            populated.push(PlatformType::PowerVs);
        }
        if self.kubevirt.is_some() {
            populated.push(PlatformType::KubeVirt);
        }
        populated
    }

    /// `type_` and the populated sub-spec must agree. Platforms without a node pool
    /// sub-spec must not carry one
    pub fn validate(&self) -> Result<(), Error> {
        let populated = self.populated();
        let expected: &[PlatformType] = match self.type_ {
            PlatformType::Agent | PlatformType::None => &[],
            PlatformType::Aws => &[PlatformType::Aws],
            PlatformType::Azure => &[PlatformType::Azure],
            PlatformType::PowerVs => &[PlatformType::PowerVs],
            PlatformType::KubeVirt => &[PlatformType::KubeVirt],
        };

        if populated != expected {
            return Err(Error::PlatformMismatch {
                declared: self.type_,
                reason: format!("populated platform specs: {populated:?}"),
            });
        }
        Ok(())
    }
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1alpha1",
    kind = "NodePool",
    status = "NodePoolStatus",
    derive = "PartialEq",
    derive = "Default",
    shortname = "np",
    namespaced,
    printcolumn = r#"{"name":"Cluster", "type":"string", "description":"Owning hosted cluster", "jsonPath":".spec.clusterName"}"#,
    printcolumn = r#"{"name":"Nodes", "type":"integer", "description":"Desired node count", "jsonPath":".spec.nodeCount"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    pub cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i32>,
    pub management: NodePoolManagement,
    pub release: Release,
    pub platform: NodePoolPlatform,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolStatus {
    #[serde(default)]
    pub node_count: i32,
}

#[instrument(skip(client))]
pub async fn create(client: Client) -> Result<(), Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let patch_params = PatchParams::apply("hosted-cluster-controller").force();

    let crd = NodePool::crd();
    crds.patch(NODE_POOL_CRD_NAME, &patch_params, &Patch::Apply(&crd))
        .await?;
    wait_crd_ready(&crds, NODE_POOL_CRD_NAME).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_platform_without_sub_spec_is_valid() {
        assert!(NodePoolPlatform::default().validate().is_ok());
    }

    #[test]
    fn type_without_sub_spec_is_rejected() {
        let platform = NodePoolPlatform {
            type_: PlatformType::Aws,
            ..Default::default()
        };
        assert!(matches!(
            platform.validate(),
            Err(Error::PlatformMismatch { declared: PlatformType::Aws, .. })
        ));
    }

    #[test]
    fn mismatched_sub_spec_is_rejected() {
        let platform = NodePoolPlatform {
            type_: PlatformType::Azure,
            kubevirt: Some(KubevirtNodePoolPlatform::default()),
            ..Default::default()
        };
        assert!(platform.validate().is_err());
    }

    #[test]
    fn extra_sub_spec_is_rejected() {
        let platform = NodePoolPlatform {
            type_: PlatformType::Aws,
            aws: Some(AwsNodePoolPlatform::default()),
            azure: Some(AzureNodePoolPlatform::default()),
            ..Default::default()
        };
        assert!(platform.validate().is_err());
    }
}
