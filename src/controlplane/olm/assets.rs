//! Manifest templates for the OLM collect-profiles job, embedded at build time and parsed
//! once on first use. They are never mutated; reconcilers clone what they need.

use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;

fn must_parse<T: DeserializeOwned>(name: &str, manifest: &str) -> T {
    serde_yaml::from_str(manifest)
        .unwrap_or_else(|e| panic!("embedded asset {name} is not a valid manifest: {e}"))
}

macro_rules! asset {
    ($file:literal) => {
        must_parse($file, include_str!(concat!("assets/", $file)))
    };
}

lazy_static! {
    pub static ref COLLECT_PROFILES_CONFIG_MAP: ConfigMap =
        asset!("olm-collect-profiles.configmap.yaml");
    pub static ref COLLECT_PROFILES_CRON_JOB: CronJob =
        asset!("olm-collect-profiles.cronjob.yaml");
    pub static ref COLLECT_PROFILES_ROLE: Role = asset!("olm-collect-profiles.role.yaml");
    pub static ref COLLECT_PROFILES_ROLE_BINDING: RoleBinding =
        asset!("olm-collect-profiles.rolebinding.yaml");
    pub static ref COLLECT_PROFILES_SECRET: Secret = asset!("olm-collect-profiles.secret.yaml");
}
