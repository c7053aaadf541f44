use k8s_openapi::api::apps::v1::{Deployment, DeploymentStrategy};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, PodSpec, PodTemplateSpec, SecretVolumeSource,
    ServiceAccount, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

use crate::controlplane::deployment_config::{
    CONTROL_PLANE_COMPONENT_LABEL, DEFAULT_PRIORITY_CLASS, DeploymentConfig, requests,
};
use crate::controlplane::manifests;
use crate::controlplane::rbac::{role_ref, rule, service_account_subject};
use crate::crd::hostedcontrolplane::{CLUSTER_NAME_LABEL, HostedControlPlane};
use crate::errors::Error;
use crate::release::ReleaseImageProvider;
use crate::utils::ownerref::OwnerRef;

pub const CCM_COMPONENT: &str = "kubevirt-cloud-controller-manager";
pub const CCM_CONTAINER: &str = "cloud-controller-manager";

const KUBECONFIG_VOLUME: &str = "kubeconfig";
const KUBECONFIG_MOUNT_PATH: &str = "/etc/kubernetes/kubeconfig";
const CLOUD_CONFIG_VOLUME: &str = "cloud-config";
const CLOUD_CONFIG_MOUNT_PATH: &str = "/etc/cloud";

pub fn reconcile_ccm_service_account(sa: &mut ServiceAccount, owner_ref: &OwnerRef) {
    owner_ref.apply_to(sa);
}

pub fn reconcile_ccm_role(role: &mut Role, owner_ref: &OwnerRef) {
    owner_ref.apply_to(role);
    role.rules = Some(vec![
        rule(&["kubevirt.io"], &["virtualmachines"], &["get", "list", "watch"]),
        rule(
            &["kubevirt.io"],
            &["virtualmachineinstances"],
            &["get", "list", "watch", "update"],
        ),
        rule(&[""], &["services"], &["*"]),
    ]);
}

pub fn reconcile_ccm_role_binding(
    role_binding: &mut RoleBinding,
    owner_ref: &OwnerRef,
    sa: &ServiceAccount,
    role: &Role,
) {
    owner_ref.apply_to(role_binding);
    role_binding.role_ref = role_ref("Role", &role.name_any());
    role_binding.subjects = Some(vec![service_account_subject(sa)]);
}

fn ccm_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), "cloud-controller-manager".to_string())])
}

fn deployment_config() -> DeploymentConfig {
    DeploymentConfig {
        replicas: Some(1),
        resources: BTreeMap::from([(CCM_CONTAINER.to_string(), requests("60Mi", "75m"))]),
        additional_labels: BTreeMap::from([(
            CONTROL_PLANE_COMPONENT_LABEL.to_string(),
            "cloud-controller-manager".to_string(),
        )]),
        priority_class: Some(DEFAULT_PRIORITY_CLASS.to_string()),
    }
}

fn ccm_container(cluster_name: &str, image: String) -> Container {
    Container {
        name: CCM_CONTAINER.to_string(),
        image: Some(image),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(vec!["/bin/kubevirt-cloud-controller-manager".to_string()]),
        args: Some(
            [
                "--cloud-provider=kubevirt",
                "--cloud-config=/etc/cloud/cloud-config",
                "--kubeconfig=/etc/kubernetes/kubeconfig/kubeconfig",
                "--authentication-skip-lookup",
                "--cluster-name",
                cluster_name,
            ]
            .map(String::from)
            .to_vec(),
        ),
        volume_mounts: Some(vec![
            VolumeMount {
                name: KUBECONFIG_VOLUME.to_string(),
                mount_path: KUBECONFIG_MOUNT_PATH.to_string(),
                ..Default::default()
            },
            VolumeMount {
                name: CLOUD_CONFIG_VOLUME.to_string(),
                mount_path: CLOUD_CONFIG_MOUNT_PATH.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

fn ccm_volumes() -> Vec<Volume> {
    vec![
        Volume {
            name: KUBECONFIG_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: manifests::kas_service_kubeconfig_secret("").metadata.name,
                default_mode: Some(0o640),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: CLOUD_CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: manifests::kubevirt_ccm_config_map("").metadata.name,
                ..Default::default()
            }),
            ..Default::default()
        },
    ]
}

/// Pod template, selector and strategy are owned here. Everything else on the
/// deployment spec is left as found
pub fn reconcile_deployment(
    deployment: &mut Deployment,
    hcp: &HostedControlPlane,
    service_account_name: &str,
    images: &dyn ReleaseImageProvider,
) -> Result<(), Error> {
    let cluster_name = hcp
        .labels()
        .get(CLUSTER_NAME_LABEL)
        .cloned()
        .ok_or_else(|| Error::MissingLabel {
            label: CLUSTER_NAME_LABEL.to_string(),
            kind: "HostedControlPlane".to_string(),
            name: hcp.name_any(),
        })?;
    let image = images.require_image(CCM_COMPONENT)?;

    let spec = deployment.spec.get_or_insert_with(Default::default);
    spec.selector = LabelSelector {
        match_labels: Some(ccm_labels()),
        ..Default::default()
    };
    spec.strategy = Some(DeploymentStrategy {
        type_: Some("Recreate".to_string()),
        ..Default::default()
    });
    spec.template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(ccm_labels()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![ccm_container(&cluster_name, image)],
            volumes: Some(ccm_volumes()),
            service_account_name: Some(service_account_name.to_string()),
            ..Default::default()
        }),
    };

    OwnerRef::from_object(hcp).apply_to(deployment);
    deployment_config().apply_to_deployment(deployment);
    Ok(())
}
