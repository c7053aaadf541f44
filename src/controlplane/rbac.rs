use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, RoleRef, Subject};
use kube::ResourceExt;

pub const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(strings(api_groups)),
        resources: Some(strings(resources)),
        verbs: strings(verbs),
        ..Default::default()
    }
}

/// `kind` is either `Role` or `ClusterRole`
pub fn role_ref(kind: &str, name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_GROUP.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

pub fn service_account_subject(sa: &ServiceAccount) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: sa.name_any(),
        namespace: sa.namespace(),
        ..Default::default()
    }
}
