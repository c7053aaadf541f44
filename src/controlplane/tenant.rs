use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};
use tracing::{debug, instrument};

use crate::controlplane::manifests;
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::errors::Error;
use crate::utils::store::{KubeStore, ObjectStore, get_typed};
use crate::utils::strings::field_manager;

pub const KUBECONFIG_KEY: &str = "kubeconfig";

/// Build a store for the guest cluster of `hcp` from its published admin kubeconfig.
///
/// Returns `None` while the kubeconfig has not been published yet.
#[instrument(skip_all, fields(hcp = %hcp.name_any()))]
pub async fn guest_store(
    hcp: &HostedControlPlane,
    store: &dyn ObjectStore,
) -> Result<Option<KubeStore>, Error> {
    let namespace = hcp.namespace().unwrap_or_default();
    let name = manifests::kas_service_kubeconfig_secret(&namespace).name_any();

    let Some(secret) = get_typed::<Secret>(store, Some(&namespace), &name).await? else {
        debug!("{name} not found, skipping guest cluster");
        return Ok(None);
    };
    let raw = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_KEY))
        .ok_or_else(|| Error::MissingField(format!("data.{KUBECONFIG_KEY} of secret {name}")))?;

    let kubeconfig = Kubeconfig::from_yaml(&String::from_utf8_lossy(&raw.0))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    let client = Client::try_from(config)?;
    Ok(Some(KubeStore::new(client, &field_manager("guest"))))
}
