use crate::crd::hostedcluster::ClusterConfiguration;
use crate::crd::platform::PlatformSpec;
use crate::errors::Error;
use crate::utils::wait_crd_ready;
use ipnet::IpNet;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Api, Client, CustomResource, CustomResourceExt,
    api::{Patch, PatchParams},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const HOSTED_CONTROL_PLANE_CRD_NAME: &str = "hostedcontrolplanes.hypershift.openshift.io";

/// Label carrying the name of the logical cluster a control plane belongs to
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1alpha1",
    kind = "HostedControlPlane",
    status = "HostedControlPlaneStatus",
    derive = "PartialEq",
    derive = "Default",
    shortname = "hcp",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HostedControlPlaneSpec {
    pub release_image: String,
    #[serde(rename = "infraID")]
    pub infra_id: String,
    #[serde(rename = "machineCIDR", default)]
    pub machine_cidr: String,
    #[serde(rename = "podCIDR")]
    pub pod_cidr: String,
    #[serde(rename = "serviceCIDR")]
    pub service_cidr: String,
    pub platform: PlatformSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ClusterConfiguration>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostedControlPlaneStatus {
    #[serde(default)]
    pub ready: bool,
}

impl HostedControlPlaneSpec {
    /// All configured CIDRs must parse. An empty machine CIDR is allowed
    pub fn validate_networking(&self) -> Result<(), Error> {
        for cidr in [&self.pod_cidr, &self.service_cidr] {
            cidr.parse::<IpNet>()?;
        }
        if !self.machine_cidr.is_empty() {
            self.machine_cidr.parse::<IpNet>()?;
        }
        Ok(())
    }
}

#[instrument(skip(client))]
pub async fn create(client: Client) -> Result<(), Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let patch_params = PatchParams::apply("hosted-cluster-controller").force();

    let crd = HostedControlPlane::crd();
    crds.patch(HOSTED_CONTROL_PLANE_CRD_NAME, &patch_params, &Patch::Apply(&crd))
        .await?;
    wait_crd_ready(&crds, HOSTED_CONTROL_PLANE_CRD_NAME).await?;
    Ok(())
}
