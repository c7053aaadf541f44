//! Identity of every child object the controllers manage.
//!
//! Each constructor returns an otherwise empty object whose name and namespace are fixed
//! for the given owner namespace. Reconcilers fill in the rest.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const KUBEVIRT_CSI_DRIVER_TENANT_NAMESPACE: &str = "openshift-cluster-csi-drivers";

fn namespaced(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn cluster_scoped(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

// Control plane

/// Admin kubeconfig of the hosted API server, reachable over the service network
pub fn kas_service_kubeconfig_secret(ns: &str) -> Secret {
    Secret {
        metadata: namespaced("service-network-admin-kubeconfig", ns),
        ..Default::default()
    }
}

pub fn proxy_config_map(ns: &str) -> ConfigMap {
    ConfigMap {
        metadata: namespaced("global-config-proxy", ns),
        ..Default::default()
    }
}

// KubeVirt cloud controller manager

pub fn kubevirt_ccm_config_map(ns: &str) -> ConfigMap {
    ConfigMap {
        metadata: namespaced("kubevirt-cloud-config", ns),
        ..Default::default()
    }
}

pub fn kubevirt_ccm_service_account(ns: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: namespaced("kubevirt-cloud-controller-manager", ns),
        ..Default::default()
    }
}

pub fn kubevirt_ccm_role(ns: &str) -> Role {
    Role {
        metadata: namespaced("kubevirt-cloud-controller-manager", ns),
        ..Default::default()
    }
}

pub fn kubevirt_ccm_role_binding(ns: &str) -> RoleBinding {
    RoleBinding {
        metadata: namespaced("kubevirt-cloud-controller-manager", ns),
        ..Default::default()
    }
}

pub fn kubevirt_ccm_deployment(ns: &str) -> Deployment {
    Deployment {
        metadata: namespaced("kubevirt-cloud-controller-manager", ns),
        ..Default::default()
    }
}

// KubeVirt CSI driver, infra cluster side

pub fn kubevirt_csi_driver_controller(ns: &str) -> Deployment {
    Deployment {
        metadata: namespaced("kubevirt-csi-controller", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_infra_config_map(ns: &str) -> ConfigMap {
    ConfigMap {
        metadata: namespaced("driver-config", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_kubeconfig(ns: &str) -> Secret {
    Secret {
        metadata: namespaced("kubevirt-csi-controller-tenant-kubeconfig", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_infra_sa(ns: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: namespaced("kubevirt-csi", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_infra_role(ns: &str) -> Role {
    Role {
        metadata: namespaced("kubevirt-csi", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_infra_role_binding(ns: &str) -> RoleBinding {
    RoleBinding {
        metadata: namespaced("kubevirt-csi", ns),
        ..Default::default()
    }
}

// KubeVirt CSI driver, tenant (guest) cluster side

pub fn kubevirt_csi_driver_tenant_namespace() -> Namespace {
    Namespace {
        metadata: cluster_scoped(KUBEVIRT_CSI_DRIVER_TENANT_NAMESPACE),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_controller_sa(ns: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: namespaced("kubevirt-csi-controller-sa", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_controller_cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: cluster_scoped("kubevirt-csi-controller-cr"),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_controller_cluster_role_binding() -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_scoped("kubevirt-csi-controller-binding"),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_node_sa(ns: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: namespaced("kubevirt-csi-node-sa", ns),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_node_cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: cluster_scoped("kubevirt-csi-node-cr"),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_tenant_node_cluster_role_binding() -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_scoped("kubevirt-csi-node-binding"),
        ..Default::default()
    }
}

pub fn kubevirt_csi_driver_daemon_set(ns: &str) -> DaemonSet {
    DaemonSet {
        metadata: namespaced("kubevirt-csi-node", ns),
        ..Default::default()
    }
}

// OLM collect-profiles

pub fn collect_profiles_config_map(ns: &str) -> ConfigMap {
    ConfigMap {
        metadata: namespaced("olm-collect-profiles", ns),
        ..Default::default()
    }
}

pub fn collect_profiles_cron_job(ns: &str) -> CronJob {
    CronJob {
        metadata: namespaced("olm-collect-profiles", ns),
        ..Default::default()
    }
}

pub fn collect_profiles_role(ns: &str) -> Role {
    Role {
        metadata: namespaced("olm-collect-profiles", ns),
        ..Default::default()
    }
}

pub fn collect_profiles_role_binding(ns: &str) -> RoleBinding {
    RoleBinding {
        metadata: namespaced("olm-collect-profiles", ns),
        ..Default::default()
    }
}

pub fn collect_profiles_secret(ns: &str) -> Secret {
    Secret {
        metadata: namespaced("pprof-cert", ns),
        ..Default::default()
    }
}

pub fn collect_profiles_service_account(ns: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: namespaced("olm-collect-profiles", ns),
        ..Default::default()
    }
}
