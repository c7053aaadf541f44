use k8s_openapi::api::apps::v1::{Deployment, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapKeySelector, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    PodSpec, PodTemplateSpec, Secret, SecretVolumeSource, ServiceAccount, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

use super::images::*;
use crate::controlplane::deployment_config::{
    CONTROL_PLANE_COMPONENT_LABEL, DEFAULT_PRIORITY_CLASS, DeploymentConfig, requests,
};
use crate::controlplane::manifests;
use crate::controlplane::rbac::{role_ref, rule, service_account_subject};
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::ownerref::OwnerRef;

/// Label the CSI driver uses to find the guest's VMs in the infra cluster
pub const INFRA_ID_LABEL: &str = "hypershift.openshift.io/infra-id";

pub const INFRA_CLUSTER_NAMESPACE_KEY: &str = "infraClusterNamespace";
pub const INFRA_CLUSTER_LABELS_KEY: &str = "infraClusterLabels";
pub const KUBECONFIG_KEY: &str = "kubeconfig";

const SOCKET_DIR: &str = "/var/lib/csi/sockets/pluginproxy/";
const SOCKET_ADDRESS: &str = "/var/lib/csi/sockets/pluginproxy/csi.sock";
const TENANT_KUBECONFIG_DIR: &str = "/var/run/secrets/tenantcluster";

pub fn reconcile_infra_config_map(cm: &mut ConfigMap, owner_ref: &OwnerRef, hcp: &HostedControlPlane) {
    owner_ref.apply_to(cm);
    let data = cm.data.get_or_insert_with(BTreeMap::new);
    data.insert(
        INFRA_CLUSTER_NAMESPACE_KEY.to_string(),
        hcp.namespace().unwrap_or_default(),
    );
    data.insert(
        INFRA_CLUSTER_LABELS_KEY.to_string(),
        format!("{INFRA_ID_LABEL}={}", hcp.spec.infra_id),
    );
}

/// Hand the guest admin kubeconfig to the controller so it can watch tenant volumes
pub fn reconcile_tenant_kubeconfig(
    secret: &mut Secret,
    owner_ref: &OwnerRef,
    admin_kubeconfig: &Secret,
) -> Result<(), Error> {
    let kubeconfig = admin_kubeconfig
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_KEY))
        .cloned()
        .ok_or_else(|| {
            Error::MissingField(format!(
                "data.{KUBECONFIG_KEY} of secret {}",
                admin_kubeconfig.name_any()
            ))
        })?;

    owner_ref.apply_to(secret);
    secret
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(KUBECONFIG_KEY.to_string(), kubeconfig);
    Ok(())
}

pub fn reconcile_infra_sa(sa: &mut ServiceAccount, owner_ref: &OwnerRef) {
    owner_ref.apply_to(sa);
}

pub fn reconcile_infra_role(role: &mut Role, owner_ref: &OwnerRef) {
    owner_ref.apply_to(role);
    role.rules = Some(vec![
        rule(&["cdi.kubevirt.io"], &["datavolumes"], &["get", "create", "delete"]),
        rule(&["kubevirt.io"], &["virtualmachineinstances"], &["list", "get"]),
        rule(
            &["subresources.kubevirt.io"],
            &[
                "virtualmachineinstances/addvolume",
                "virtualmachineinstances/removevolume",
            ],
            &["update"],
        ),
    ]);
}

pub fn reconcile_infra_role_binding(
    role_binding: &mut RoleBinding,
    owner_ref: &OwnerRef,
    sa: &ServiceAccount,
    role: &Role,
) {
    owner_ref.apply_to(role_binding);
    role_binding.role_ref = role_ref("Role", &role.name_any());
    role_binding.subjects = Some(vec![service_account_subject(sa)]);
}

fn controller_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), "kubevirt-csi-driver".to_string())])
}

pub(super) fn env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn env_from_driver_config(name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            config_map_key_ref: Some(ConfigMapKeySelector {
                key: key.to_string(),
                name: manifests::kubevirt_csi_driver_infra_config_map("").metadata.name,
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(super) fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

pub(super) fn args(args: &[&str]) -> Option<Vec<String>> {
    Some(args.iter().map(|arg| arg.to_string()).collect())
}

fn sidecar(name: &str, image: String, extra_args: &[&str]) -> Container {
    let mut container_args = vec![
        "--csi-address=$(ADDRESS)".to_string(),
        format!("--kubeconfig={TENANT_KUBECONFIG_DIR}/kubeconfig"),
    ];
    container_args.extend(extra_args.iter().map(|arg| arg.to_string()));
    container_args.push("--v=5".to_string());

    Container {
        name: name.to_string(),
        image: Some(image),
        args: Some(container_args),
        env: Some(vec![env("ADDRESS", SOCKET_ADDRESS)]),
        volume_mounts: Some(vec![
            mount("socket-dir", SOCKET_DIR),
            mount("tenantcluster", TENANT_KUBECONFIG_DIR),
        ]),
        ..Default::default()
    }
}

fn controller_containers(images: &ControllerImages) -> Vec<Container> {
    vec![
        Container {
            name: "csi-driver".to_string(),
            image: Some(images.driver.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            args: args(&[
                "--endpoint=unix:///var/lib/csi/sockets/pluginproxy/csi.sock",
                "--infra-cluster-namespace=$(INFRACLUSTER_NAMESPACE)",
                "--infra-cluster-labels=$(INFRACLUSTER_LABELS)",
                "--tenant-cluster-kubeconfig=/var/run/secrets/tenantcluster/kubeconfig",
                "--run-node-service=false",
                "--run-controller-service=true",
                "--v=5",
            ]),
            env: Some(vec![
                env_from_driver_config("INFRACLUSTER_NAMESPACE", INFRA_CLUSTER_NAMESPACE_KEY),
                env_from_driver_config("INFRACLUSTER_LABELS", INFRA_CLUSTER_LABELS_KEY),
            ]),
            volume_mounts: Some(vec![
                mount("socket-dir", SOCKET_DIR),
                mount("tenantcluster", TENANT_KUBECONFIG_DIR),
            ]),
            ..Default::default()
        },
        sidecar(
            "csi-provisioner",
            images.provisioner.clone(),
            &["--default-fstype=ext4"],
        ),
        sidecar("csi-attacher", images.attacher.clone(), &[]),
        Container {
            name: "csi-liveness-probe".to_string(),
            image: Some(images.liveness_probe.clone()),
            args: args(&[
                "--csi-address=/csi/csi.sock",
                "--probe-timeout=3s",
                "--health-port=10301",
            ]),
            volume_mounts: Some(vec![mount("socket-dir", "/csi")]),
            ..Default::default()
        },
    ]
}

fn controller_volumes() -> Vec<Volume> {
    vec![
        Volume {
            name: "socket-dir".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
        Volume {
            name: "tenantcluster".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: manifests::kubevirt_csi_driver_tenant_kubeconfig("").metadata.name,
                ..Default::default()
            }),
            ..Default::default()
        },
    ]
}

fn controller_deployment_config() -> DeploymentConfig {
    DeploymentConfig {
        replicas: Some(1),
        resources: BTreeMap::from([("csi-driver".to_string(), requests("50Mi", "10m"))]),
        additional_labels: BTreeMap::from([(
            CONTROL_PLANE_COMPONENT_LABEL.to_string(),
            "kubevirt-csi-controller".to_string(),
        )]),
        priority_class: Some(DEFAULT_PRIORITY_CLASS.to_string()),
    }
}

/// Controller half of the driver. Runs next to the control plane and provisions
/// DataVolumes in the infra cluster for PVCs created in the guest
pub fn reconcile_controller_deployment(
    deployment: &mut Deployment,
    owner_ref: &OwnerRef,
    service_account_name: &str,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let images = ControllerImages::resolve(images)?;

    owner_ref.apply_to(deployment);
    let spec = deployment.spec.get_or_insert_with(Default::default);
    spec.selector = LabelSelector {
        match_labels: Some(controller_labels()),
        ..Default::default()
    };
    spec.strategy = Some(DeploymentStrategy {
        type_: Some("Recreate".to_string()),
        ..Default::default()
    });
    spec.template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(controller_labels()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: controller_containers(&images),
            volumes: Some(controller_volumes()),
            service_account_name: Some(service_account_name.to_string()),
            ..Default::default()
        }),
    };
    controller_deployment_config().apply_to_deployment(deployment);
    Ok(())
}
