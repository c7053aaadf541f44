use kube::ResourceExt;
use tracing::{info, instrument};

use crate::controlplane::manifests;
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::ownerref::OwnerRef;
use crate::utils::store::{ObjectStore, create_or_update};

mod assets;
pub mod collect_profiles;

use collect_profiles::*;

pub const OLM_COMPONENT: &str = "operator-lifecycle-manager";

/// Reconcile the periodic OLM profile collection job and everything it needs
#[instrument(skip_all, fields(hcp = %hcp.name_any()))]
pub async fn reconcile(
    hcp: &HostedControlPlane,
    store: &dyn ObjectStore,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let namespace = hcp.namespace().unwrap_or_default();
    let owner_ref = OwnerRef::from_object(hcp);
    let olm_image = images.require_image(OLM_COMPONENT)?;

    create_or_update(
        store,
        manifests::collect_profiles_config_map(&namespace),
        |cm| {
            reconcile_collect_profiles_config_map(cm, &owner_ref);
            Ok(())
        },
    )
    .await?;

    create_or_update(
        store,
        manifests::collect_profiles_service_account(&namespace),
        |sa| {
            reconcile_collect_profiles_service_account(sa, &owner_ref);
            Ok(())
        },
    )
    .await?;

    create_or_update(store, manifests::collect_profiles_role(&namespace), |role| {
        reconcile_collect_profiles_role(role, &owner_ref);
        Ok(())
    })
    .await?;

    create_or_update(
        store,
        manifests::collect_profiles_role_binding(&namespace),
        |binding| {
            reconcile_collect_profiles_role_binding(binding, &owner_ref);
            Ok(())
        },
    )
    .await?;

    create_or_update(store, manifests::collect_profiles_secret(&namespace), |secret| {
        reconcile_collect_profiles_secret(secret, &owner_ref);
        Ok(())
    })
    .await?;

    create_or_update(
        store,
        manifests::collect_profiles_cron_job(&namespace),
        |cron_job| {
            reconcile_collect_profiles_cron_job(cron_job, &owner_ref, &olm_image, &namespace);
            Ok(())
        },
    )
    .await?;

    info!("OLM collect-profiles reconciled");
    Ok(())
}
