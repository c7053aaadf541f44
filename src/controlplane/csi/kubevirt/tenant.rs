use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, HostPathVolumeSource, Namespace, ObjectFieldSelector,
    PodSpec, PodTemplateSpec, SecurityContext, ServiceAccount, Toleration, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

use super::images::*;
use super::infra::{args, env, mount};
use crate::controlplane::deployment_config::{DeploymentConfig, requests};
use crate::controlplane::rbac::{role_ref, rule, service_account_subject};
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::ownerref::OwnerRef;

pub const NODE_PRIORITY_CLASS: &str = "system-node-critical";

const PLUGIN_DIR: &str = "/var/lib/kubelet/plugins/csi.kubevirt.io/";
const REGISTRATION_SOCKET: &str = "/var/lib/kubelet/plugins/csi.kubevirt.io/csi.sock";

/// Mark the namespace as run-level so the driver pods may be privileged
pub fn reconcile_tenant_namespace(namespace: &mut Namespace) {
    let labels = namespace.labels_mut();
    labels.insert("openshift.io/cluster-monitoring".to_string(), "true".to_string());
    labels.insert("openshift.io/run-level".to_string(), "1".to_string());
}

pub fn reconcile_tenant_service_account(sa: &mut ServiceAccount, owner_ref: &OwnerRef) {
    owner_ref.apply_to(sa);
}

fn privileged_scc() -> PolicyRule {
    PolicyRule {
        resource_names: Some(vec!["privileged".to_string()]),
        ..rule(&["security.openshift.io"], &["securitycontextconstraints"], &["use"])
    }
}

pub fn reconcile_tenant_controller_cluster_role(role: &mut ClusterRole, owner_ref: &OwnerRef) {
    owner_ref.apply_to(role);
    role.rules = Some(vec![
        rule(
            &[""],
            &["persistentvolumes"],
            &["create", "delete", "get", "list", "watch", "update", "patch"],
        ),
        rule(&[""], &["secrets"], &["get", "list"]),
        rule(
            &[""],
            &["persistentvolumeclaims"],
            &["get", "list", "watch", "update"],
        ),
        rule(&[""], &["persistentvolumeclaims/status"], &["update", "patch"]),
        rule(&[""], &["nodes"], &["get", "list", "watch"]),
        rule(
            &["storage.k8s.io"],
            &["volumeattachments"],
            &["get", "list", "watch", "update", "patch"],
        ),
        rule(&["storage.k8s.io"], &["volumeattachments/status"], &["patch"]),
        rule(
            &["storage.k8s.io"],
            &["storageclasses", "csinodes"],
            &["get", "list", "watch"],
        ),
        rule(
            &[""],
            &["events"],
            &["list", "watch", "create", "update", "patch"],
        ),
        privileged_scc(),
    ]);
}

pub fn reconcile_tenant_node_cluster_role(role: &mut ClusterRole, owner_ref: &OwnerRef) {
    owner_ref.apply_to(role);
    role.rules = Some(vec![
        rule(&[""], &["nodes"], &["get"]),
        rule(&[""], &["persistentvolumes"], &["get", "list", "watch"]),
        rule(&["storage.k8s.io"], &["volumeattachments"], &["get", "list", "watch"]),
        rule(&["storage.k8s.io"], &["csinodes"], &["get"]),
        rule(
            &[""],
            &["events"],
            &["list", "watch", "create", "update", "patch"],
        ),
        privileged_scc(),
    ]);
}

pub fn reconcile_tenant_cluster_role_binding(
    binding: &mut ClusterRoleBinding,
    owner_ref: &OwnerRef,
    role: &ClusterRole,
    sa: &ServiceAccount,
) {
    owner_ref.apply_to(binding);
    binding.role_ref = role_ref("ClusterRole", &role.name_any());
    binding.subjects = Some(vec![service_account_subject(sa)]);
}

fn node_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), "kubevirt-csi-driver".to_string())])
}

fn host_path(name: &str, path: &str, type_: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: Some(type_.to_string()),
        }),
        ..Default::default()
    }
}

fn node_volumes() -> Vec<Volume> {
    vec![
        host_path("kubelet-dir", "/var/lib/kubelet", "Directory"),
        host_path("plugin-dir", PLUGIN_DIR, "DirectoryOrCreate"),
        host_path(
            "registration-dir",
            "/var/lib/kubelet/plugins_registry/",
            "Directory",
        ),
        host_path("device-dir", "/dev", "Directory"),
        host_path("udev", "/run/udev", "Directory"),
    ]
}

fn node_containers(images: &NodeImages) -> Vec<Container> {
    vec![
        Container {
            name: "csi-driver".to_string(),
            image: Some(images.driver.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            security_context: Some(SecurityContext {
                privileged: Some(true),
                allow_privilege_escalation: Some(true),
                ..Default::default()
            }),
            args: args(&[
                "--endpoint=unix:/csi/csi.sock",
                "--node-name=$(KUBE_NODE_NAME)",
                "--run-node-service=true",
                "--run-controller-service=false",
                "--v=5",
            ]),
            env: Some(vec![EnvVar {
                name: "KUBE_NODE_NAME".to_string(),
                value_from: Some(EnvVarSource {
                    field_ref: Some(ObjectFieldSelector {
                        field_path: "spec.nodeName".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            volume_mounts: Some(vec![
                VolumeMount {
                    mount_propagation: Some("Bidirectional".to_string()),
                    ..mount("kubelet-dir", "/var/lib/kubelet")
                },
                mount("plugin-dir", "/csi"),
                mount("device-dir", "/dev"),
                mount("udev", "/run/udev"),
            ]),
            ..Default::default()
        },
        Container {
            name: "csi-node-driver-registrar".to_string(),
            image: Some(images.registrar.clone()),
            args: args(&[
                "--csi-address=$(ADDRESS)",
                "--kubelet-registration-path=$(DRIVER_REG_SOCK_PATH)",
                "--v=5",
            ]),
            env: Some(vec![
                env("ADDRESS", "/csi/csi.sock"),
                env("DRIVER_REG_SOCK_PATH", REGISTRATION_SOCKET),
            ]),
            volume_mounts: Some(vec![
                mount("plugin-dir", "/csi"),
                mount("registration-dir", "/registration"),
            ]),
            ..Default::default()
        },
        Container {
            name: "csi-liveness-probe".to_string(),
            image: Some(images.liveness_probe.clone()),
            args: args(&[
                "--csi-address=/csi/csi.sock",
                "--probe-timeout=3s",
                "--health-port=10300",
            ]),
            volume_mounts: Some(vec![mount("plugin-dir", "/csi")]),
            ..Default::default()
        },
    ]
}

fn node_daemon_set_config() -> DeploymentConfig {
    DeploymentConfig {
        resources: BTreeMap::from([("csi-driver".to_string(), requests("50Mi", "10m"))]),
        priority_class: Some(NODE_PRIORITY_CLASS.to_string()),
        ..Default::default()
    }
}

/// Node half of the driver, running on every guest node and attaching the
/// hotplugged disks
pub fn reconcile_node_daemon_set(
    daemon_set: &mut DaemonSet,
    owner_ref: &OwnerRef,
    service_account_name: &str,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let images = NodeImages::resolve(images)?;

    owner_ref.apply_to(daemon_set);
    let spec = daemon_set.spec.get_or_insert_with(Default::default);
    spec.selector = LabelSelector {
        match_labels: Some(node_labels()),
        ..Default::default()
    };
    spec.template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(node_labels()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: node_containers(&images),
            volumes: Some(node_volumes()),
            service_account_name: Some(service_account_name.to_string()),
            tolerations: Some(vec![Toleration {
                operator: Some("Exists".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
    };
    node_daemon_set_config().apply_to_daemon_set(daemon_set);
    Ok(())
}
