use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{PodTemplateSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

pub const DEFAULT_PRIORITY_CLASS: &str = "hypershift-control-plane";

/// Label identifying which control plane component a pod belongs to
pub const CONTROL_PLANE_COMPONENT_LABEL: &str = "hypershift.openshift.io/control-plane-component";

/// Workload settings layered on top of a freshly computed pod template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentConfig {
    /// Left untouched on the workload when `None`, so an autoscaler can own it
    pub replicas: Option<i32>,
    /// Resource requirements keyed by container name
    pub resources: BTreeMap<String, ResourceRequirements>,
    pub additional_labels: BTreeMap<String, String>,
    pub priority_class: Option<String>,
}

/// Resource requests of a single container
pub fn requests(memory: &str, cpu: &str) -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("memory".to_string(), Quantity(memory.to_string())),
            ("cpu".to_string(), Quantity(cpu.to_string())),
        ])),
        ..Default::default()
    }
}

impl DeploymentConfig {
    fn apply_to_template(&self, template: &mut PodTemplateSpec) {
        if !self.additional_labels.is_empty() {
            let metadata = template.metadata.get_or_insert_with(Default::default);
            let labels = metadata.labels.get_or_insert_with(BTreeMap::new);
            labels.extend(self.additional_labels.clone());
        }

        if let Some(spec) = template.spec.as_mut() {
            if let Some(priority_class) = &self.priority_class {
                spec.priority_class_name = Some(priority_class.clone());
            }
            for container in spec.containers.iter_mut() {
                if let Some(resources) = self.resources.get(&container.name) {
                    container.resources = Some(resources.clone());
                }
            }
        }
    }

    pub fn apply_to_deployment(&self, deployment: &mut Deployment) {
        if let Some(spec) = deployment.spec.as_mut() {
            if self.replicas.is_some() {
                spec.replicas = self.replicas;
            }
            self.apply_to_template(&mut spec.template);
        }
    }

    pub fn apply_to_daemon_set(&self, daemon_set: &mut DaemonSet) {
        if let Some(spec) = daemon_set.spec.as_mut() {
            self.apply_to_template(&mut spec.template);
        }
    }
}
