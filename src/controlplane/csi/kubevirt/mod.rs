//! KubeVirt CSI driver. The controller half runs in the infra cluster next to the
//! control plane, the node half runs in the guest cluster.

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use crate::controlplane::manifests::{self, KUBEVIRT_CSI_DRIVER_TENANT_NAMESPACE};
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::ownerref::OwnerRef;
use crate::utils::store::{ObjectStore, create_or_update, get_typed};

mod images;
pub mod infra;
pub mod tenant;

use infra::*;
use tenant::*;

/// Infra cluster side, owned by the hosted control plane
#[instrument(skip_all, fields(hcp = %hcp.name_any()))]
pub async fn reconcile_infra(
    hcp: &HostedControlPlane,
    store: &dyn ObjectStore,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let namespace = hcp.namespace().unwrap_or_default();
    let owner_ref = OwnerRef::from_object(hcp);

    create_or_update(
        store,
        manifests::kubevirt_csi_driver_infra_config_map(&namespace),
        |cm| {
            reconcile_infra_config_map(cm, &owner_ref, hcp);
            Ok(())
        },
    )
    .await?;

    let (sa, _) = create_or_update(store, manifests::kubevirt_csi_driver_infra_sa(&namespace), |sa| {
        reconcile_infra_sa(sa, &owner_ref);
        Ok(())
    })
    .await?;

    let (role, _) = create_or_update(
        store,
        manifests::kubevirt_csi_driver_infra_role(&namespace),
        |role| {
            reconcile_infra_role(role, &owner_ref);
            Ok(())
        },
    )
    .await?;

    create_or_update(
        store,
        manifests::kubevirt_csi_driver_infra_role_binding(&namespace),
        |binding| {
            reconcile_infra_role_binding(binding, &owner_ref, &sa, &role);
            Ok(())
        },
    )
    .await?;

    let admin_kubeconfig_name = manifests::kas_service_kubeconfig_secret(&namespace).name_any();
    match get_typed::<Secret>(store, Some(&namespace), &admin_kubeconfig_name).await? {
        Some(admin_kubeconfig) => {
            create_or_update(
                store,
                manifests::kubevirt_csi_driver_tenant_kubeconfig(&namespace),
                |secret| reconcile_tenant_kubeconfig(secret, &owner_ref, &admin_kubeconfig),
            )
            .await?;
        }
        None => debug!("{admin_kubeconfig_name} not published yet, controller will wait for its kubeconfig"),
    }

    create_or_update(
        store,
        manifests::kubevirt_csi_driver_controller(&namespace),
        |deployment| reconcile_controller_deployment(deployment, &owner_ref, &sa.name_any(), images),
    )
    .await?;

    info!("KubeVirt CSI controller reconciled");
    Ok(())
}

/// Guest cluster side. Everything hangs off the driver namespace, which itself has no owner
#[instrument(skip_all)]
pub async fn reconcile_tenant(
    guest: &dyn ObjectStore,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let namespace = KUBEVIRT_CSI_DRIVER_TENANT_NAMESPACE;

    let (tenant_namespace, _) = create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_namespace(),
        |ns| {
            reconcile_tenant_namespace(ns);
            Ok(())
        },
    )
    .await?;
    let owner_ref = OwnerRef::from_object(&tenant_namespace);

    let (controller_sa, _) = create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_controller_sa(namespace),
        |sa| {
            reconcile_tenant_service_account(sa, &owner_ref);
            Ok(())
        },
    )
    .await?;
    let (controller_role, _) = create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_controller_cluster_role(),
        |role| {
            reconcile_tenant_controller_cluster_role(role, &owner_ref);
            Ok(())
        },
    )
    .await?;
    create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_controller_cluster_role_binding(),
        |binding| {
            reconcile_tenant_cluster_role_binding(binding, &owner_ref, &controller_role, &controller_sa);
            Ok(())
        },
    )
    .await?;

    let (node_sa, _) = create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_node_sa(namespace),
        |sa| {
            reconcile_tenant_service_account(sa, &owner_ref);
            Ok(())
        },
    )
    .await?;
    let (node_role, _) = create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_node_cluster_role(),
        |role| {
            reconcile_tenant_node_cluster_role(role, &owner_ref);
            Ok(())
        },
    )
    .await?;
    create_or_update(
        guest,
        manifests::kubevirt_csi_driver_tenant_node_cluster_role_binding(),
        |binding| {
            reconcile_tenant_cluster_role_binding(binding, &owner_ref, &node_role, &node_sa);
            Ok(())
        },
    )
    .await?;

    create_or_update(
        guest,
        manifests::kubevirt_csi_driver_daemon_set(namespace),
        |daemon_set| reconcile_node_daemon_set(daemon_set, &owner_ref, &node_sa.name_any(), images),
    )
    .await?;

    info!("KubeVirt CSI node driver reconciled in guest cluster");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::testing::{NAMESPACE, component_images, hosted_control_plane};
    use crate::utils::store::memory::MemoryStore;
    use k8s_openapi::ByteString;
    use k8s_openapi::api::apps::v1::DaemonSet;
    use k8s_openapi::api::core::v1::Namespace;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn infra_side_without_admin_kubeconfig() {
        let store = MemoryStore::new();
        reconcile_infra(&hosted_control_plane(), &store, &component_images())
            .await
            .unwrap();
        // config map, sa, role, binding, deployment
        assert_eq!(store.len(), 5);
        assert!(
            store
                .get_typed::<Secret>(Some(NAMESPACE), "kubevirt-csi-controller-tenant-kubeconfig")
                .is_none()
        );
    }

    #[tokio::test]
    async fn infra_side_copies_admin_kubeconfig() {
        let store = MemoryStore::new();
        let mut admin = manifests::kas_service_kubeconfig_secret(NAMESPACE);
        admin.data = Some(BTreeMap::from([(
            "kubeconfig".to_string(),
            ByteString(b"apiVersion: v1\nkind: Config\n".to_vec()),
        )]));
        store.insert(&admin);

        reconcile_infra(&hosted_control_plane(), &store, &component_images())
            .await
            .unwrap();
        let copied: Secret = store
            .get_typed(Some(NAMESPACE), "kubevirt-csi-controller-tenant-kubeconfig")
            .unwrap();
        assert_eq!(copied.data, admin.data);
    }

    #[tokio::test]
    async fn tenant_side_is_owned_by_namespace() {
        let guest = MemoryStore::new();
        reconcile_tenant(&guest, &component_images()).await.unwrap();
        assert_eq!(guest.len(), 8);

        let namespace: Namespace = guest
            .get_typed(None, KUBEVIRT_CSI_DRIVER_TENANT_NAMESPACE)
            .unwrap();
        assert!(namespace.owner_references().is_empty());
        let daemon_set: DaemonSet = guest
            .get_typed(Some(KUBEVIRT_CSI_DRIVER_TENANT_NAMESPACE), "kubevirt-csi-node")
            .unwrap();
        assert_eq!(daemon_set.owner_references()[0].uid, namespace.uid().unwrap());

        let calls = guest.calls();
        reconcile_tenant(&guest, &component_images()).await.unwrap();
        assert_eq!(guest.calls(), calls + 8);
    }
}
