//! KubeVirt cloud controller manager, running next to the hosted control plane
//! and managing VMs and load balancer services in the infra cluster.

use kube::ResourceExt;
use tracing::{info, instrument};

use crate::controlplane::manifests;
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::ownerref::OwnerRef;
use crate::utils::store::{ObjectStore, create_or_update};

pub mod config;
pub mod reconcile;

pub use config::reconcile_cloud_config;
pub use reconcile::*;

#[instrument(skip_all, fields(hcp = %hcp.name_any()))]
pub async fn reconcile(
    hcp: &HostedControlPlane,
    store: &dyn ObjectStore,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let namespace = hcp.namespace().unwrap_or_default();
    let owner_ref = OwnerRef::from_object(hcp);

    create_or_update(store, manifests::kubevirt_ccm_config_map(&namespace), |cm| {
        reconcile_cloud_config(cm, hcp)
    })
    .await?;

    let (sa, _) = create_or_update(
        store,
        manifests::kubevirt_ccm_service_account(&namespace),
        |sa| {
            reconcile_ccm_service_account(sa, &owner_ref);
            Ok(())
        },
    )
    .await?;

    let (role, _) = create_or_update(store, manifests::kubevirt_ccm_role(&namespace), |role| {
        reconcile_ccm_role(role, &owner_ref);
        Ok(())
    })
    .await?;

    create_or_update(
        store,
        manifests::kubevirt_ccm_role_binding(&namespace),
        |binding| {
            reconcile_ccm_role_binding(binding, &owner_ref, &sa, &role);
            Ok(())
        },
    )
    .await?;

    create_or_update(
        store,
        manifests::kubevirt_ccm_deployment(&namespace),
        |deployment| reconcile_deployment(deployment, hcp, &sa.name_any(), images),
    )
    .await?;

    info!("KubeVirt cloud controller manager reconciled");
    Ok(())
}
