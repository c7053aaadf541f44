use kube::api::{Api, PostParams};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::controller::Action;
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use lazy_static::lazy_static;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, instrument};

use crate::config::OperatorConfig;
use crate::crd;
use crate::crd::hostedcontrolplane::{HostedControlPlane, HostedControlPlaneStatus};
use crate::crd::platform::PlatformType;
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::resource_controller::ResourceController;
use crate::utils::store::{KubeStore, ObjectStore};
use crate::utils::strings::field_manager;

pub mod cloud;
pub mod csi;
pub mod deployment_config;
pub mod globalconfig;
pub mod manifests;
pub mod olm;
pub mod proxy;
pub mod rbac;
pub mod tenant;

lazy_static! {
    static ref FIELD_MANAGER: String = field_manager("controlplane");
}

create_set_status!(HostedControlPlane, HostedControlPlaneStatus, set_status);

pub struct ControllerState {
    client: Client,
    config: OperatorConfig,
}

/// Converge every child object of one hosted control plane.
///
/// Management side children come first. `connect_guest` is only called once they have
/// converged, so a broken guest kubeconfig never holds them back. It yields `None` while
/// the guest cluster is not reachable yet.
/// The first failing component stops the pass, later ones run on the next attempt.
#[instrument(skip_all, fields(hcp = %hcp.name_any()))]
pub async fn reconcile_hosted_control_plane<G, Fut, S>(
    hcp: &HostedControlPlane,
    store: &dyn ObjectStore,
    images: &dyn ReleaseImageProvider,
    connect_guest: G,
) -> Result<(), Error>
where
    G: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<S>, Error>>,
    S: ObjectStore,
{
    hcp.spec.validate_networking()?;

    proxy::reconcile(hcp, store).await?;
    olm::reconcile(hcp, store, images).await?;

    if hcp.spec.platform.type_ == PlatformType::KubeVirt {
        cloud::kubevirt::reconcile(hcp, store, images).await?;
        csi::kubevirt::reconcile_infra(hcp, store, images).await?;
        if let Some(guest) = connect_guest().await? {
            csi::kubevirt::reconcile_tenant(&guest, images).await?;
        }
    }
    Ok(())
}

async fn update_hosted_control_plane(
    hcp: Arc<HostedControlPlane>,
    ctx: Arc<ControllerState>,
) -> Result<Action, Error> {
    let store = KubeStore::new(ctx.client.clone(), &FIELD_MANAGER);

    reconcile_hosted_control_plane(&hcp, &store, &ctx.config.component_images, || {
        tenant::guest_store(&hcp, &store)
    })
    .await?;

    if !hcp.status.as_ref().is_some_and(|status| status.ready) {
        set_status(&hcp, HostedControlPlaneStatus { ready: true }, ctx.client.clone()).await?;
        info!("{} ready", hcp.name_any());
    }
    ok_and_requeue!(ctx.config.resync_seconds)
}

/// Children carry owner references and are garbage collected with the control plane
async fn remove_hosted_control_plane(
    hcp: Arc<HostedControlPlane>,
    _ctx: Arc<ControllerState>,
) -> Result<Action, Error> {
    info!("{} deleted, leaving children to garbage collection", hcp.name_any());
    ok_no_requeue!()
}

#[instrument(skip_all)]
pub async fn run(client: Client, config: OperatorConfig) -> Result<(), Error> {
    info!("Creating CRDs");
    crd::create_all(client.clone()).await?;

    info!("controlplane: Starting controller");
    let deployments: Api<Deployment> = Api::all(client.clone());
    let config_maps: Api<ConfigMap> = Api::all(client.clone());
    ResourceController::<HostedControlPlane, _>::new(
        client.clone(),
        ControllerState { client, config },
    )
    .run(
        update_hosted_control_plane,
        remove_hosted_control_plane,
        |controller| {
            controller
                .owns(deployments, watcher::Config::default())
                .owns(config_maps, watcher::Config::default())
        },
    )
    .await;

    Err(Error::UnexpectedExit(
        "Hosted control plane controller should not exit".into(),
    ))
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::crd::hostedcontrolplane::{CLUSTER_NAME_LABEL, HostedControlPlaneSpec};
    use crate::crd::platform::{KubevirtPlatformSpec, PlatformSpec};
    use crate::release::ComponentImages;
    use crate::utils::store::memory::MemoryStore;
    use std::collections::BTreeMap;

    pub const NAMESPACE: &str = "clusters-guest";

    /// Guest connector for control planes whose guest cluster is not up yet
    pub async fn no_guest() -> Result<Option<MemoryStore>, Error> {
        Ok(None)
    }

    pub fn hosted_control_plane() -> HostedControlPlane {
        let mut hcp = HostedControlPlane::new(
            "guest",
            HostedControlPlaneSpec {
                release_image: "quay.io/openshift-release-dev/ocp-release:4.14.0-x86_64".into(),
                infra_id: "guest-x7k2p".into(),
                machine_cidr: "192.168.126.0/24".into(),
                pod_cidr: "10.132.0.0/14".into(),
                service_cidr: "172.31.0.0/16".into(),
                platform: PlatformSpec {
                    type_: PlatformType::KubeVirt,
                    kubevirt: Some(KubevirtPlatformSpec {}),
                    ..Default::default()
                },
                configuration: None,
            },
        );
        hcp.metadata.namespace = Some(NAMESPACE.into());
        hcp.metadata.uid = Some("3f2b8c4e-9d1a-4e7b-a6c5-1b0d2e3f4a5b".into());
        hcp.metadata.labels = Some(BTreeMap::from([(
            CLUSTER_NAME_LABEL.to_string(),
            "guest".to_string(),
        )]));
        hcp
    }

    pub fn component_images() -> ComponentImages {
        ComponentImages(
            [
                "operator-lifecycle-manager",
                "kubevirt-cloud-controller-manager",
                "kubevirt-csi-driver",
                "csi-external-provisioner",
                "csi-external-attacher",
                "csi-livenessprobe",
                "csi-node-driver-registrar",
            ]
            .into_iter()
            .map(|component| {
                (
                    component.to_string(),
                    format!("quay.io/hypershift/{component}:4.14"),
                )
            })
            .collect(),
        )
    }
}
