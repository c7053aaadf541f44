use crate::crd::platform::PlatformSpec;
use crate::crd::proxy::ProxySpec;
use crate::errors::Error;
use crate::utils::wait_crd_ready;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Api, Client, CustomResource, CustomResourceExt,
    api::{Patch, PatchParams},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const HOSTED_CLUSTER_CRD_NAME: &str = "hostedclusters.hypershift.openshift.io";

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
pub struct Release {
    pub image: String,
}

/// Cluster-wide configuration passed through to the hosted cluster
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySpec>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworking {
    #[serde(default)]
    pub machine_cidr: String,
    pub pod_cidr: String,
    pub service_cidr: String,
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1alpha1",
    kind = "HostedCluster",
    status = "HostedClusterStatus",
    derive = "PartialEq",
    derive = "Default",
    shortname = "hc",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterSpec {
    pub release: Release,
    #[serde(rename = "infraID")]
    pub infra_id: String,
    pub platform: PlatformSpec,
    pub networking: ClusterNetworking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ClusterConfiguration>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[instrument(skip(client))]
pub async fn create(client: Client) -> Result<(), Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let patch_params = PatchParams::apply("hosted-cluster-controller").force();

    let crd = HostedCluster::crd();
    crds.patch(HOSTED_CLUSTER_CRD_NAME, &patch_params, &Patch::Apply(&crd))
        .await?;
    wait_crd_ready(&crds, HOSTED_CLUSTER_CRD_NAME).await?;
    Ok(())
}
