use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};

use super::assets::{
    COLLECT_PROFILES_CONFIG_MAP, COLLECT_PROFILES_CRON_JOB, COLLECT_PROFILES_ROLE,
    COLLECT_PROFILES_ROLE_BINDING, COLLECT_PROFILES_SECRET,
};
use crate::utils::ownerref::OwnerRef;

/// Placeholder argument in the job template replaced by the OLM namespace
const OLM_NAMESPACE_PLACEHOLDER: &str = "OLM_NAMESPACE";

/// Daily schedule with minute and hour derived from `input`, read as a big-endian
/// integer. Spreads the jobs of many hosted clusters over the day
pub fn generate_modular_daily_cron_schedule(input: &[u8]) -> String {
    let modulo = |m: u32| {
        input
            .iter()
            .fold(0u32, |acc, byte| (acc * 256 + u32::from(*byte)) % m)
    };
    format!("{} {} * * *", modulo(60), modulo(24))
}

pub fn reconcile_collect_profiles_cron_job(
    cron_job: &mut CronJob,
    owner_ref: &OwnerRef,
    olm_image: &str,
    namespace: &str,
) {
    owner_ref.apply_to(cron_job);

    let mut spec = COLLECT_PROFILES_CRON_JOB.spec.clone().unwrap_or_default();
    let pod_spec = spec
        .job_template
        .spec
        .as_mut()
        .and_then(|job| job.template.spec.as_mut());
    if let Some(container) = pod_spec.and_then(|pod| pod.containers.first_mut()) {
        container.image = Some(olm_image.to_string());
        for arg in container.args.iter_mut().flatten() {
            if arg == OLM_NAMESPACE_PLACEHOLDER {
                *arg = namespace.to_string();
            }
        }
    }
    spec.schedule = generate_modular_daily_cron_schedule(
        cron_job.metadata.namespace.as_deref().unwrap_or_default().as_bytes(),
    );
    cron_job.spec = Some(spec);
}

pub fn reconcile_collect_profiles_config_map(config_map: &mut ConfigMap, owner_ref: &OwnerRef) {
    owner_ref.apply_to(config_map);
    config_map.data = COLLECT_PROFILES_CONFIG_MAP.data.clone();
}

pub fn reconcile_collect_profiles_role(role: &mut Role, owner_ref: &OwnerRef) {
    owner_ref.apply_to(role);
    role.rules = COLLECT_PROFILES_ROLE.rules.clone();
}

/// Service account subjects without a namespace are bound in the binding's own namespace
pub fn reconcile_collect_profiles_role_binding(role_binding: &mut RoleBinding, owner_ref: &OwnerRef) {
    owner_ref.apply_to(role_binding);
    role_binding.role_ref = COLLECT_PROFILES_ROLE_BINDING.role_ref.clone();

    let namespace = role_binding.metadata.namespace.clone();
    let subjects = COLLECT_PROFILES_ROLE_BINDING
        .subjects
        .iter()
        .flatten()
        .cloned()
        .map(|mut subject| {
            if subject.kind == "ServiceAccount" && subject.namespace.is_none() {
                subject.namespace = namespace.clone();
            }
            subject
        })
        .collect();
    role_binding.subjects = Some(subjects);
}

pub fn reconcile_collect_profiles_secret(secret: &mut Secret, owner_ref: &OwnerRef) {
    owner_ref.apply_to(secret);
    secret.type_ = COLLECT_PROFILES_SECRET.type_.clone();
    secret.data = COLLECT_PROFILES_SECRET.data.clone();
}

pub fn reconcile_collect_profiles_service_account(
    service_account: &mut ServiceAccount,
    owner_ref: &OwnerRef,
) {
    owner_ref.apply_to(service_account);
}
