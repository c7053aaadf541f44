use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::controlplane::globalconfig::GlobalConfig;
use crate::controlplane::globalconfig::proxy::reconcile_proxy_config_with_status;
use crate::controlplane::manifests;
use crate::crd::hostedcontrolplane::HostedControlPlane;
use crate::crd::proxy::{Proxy, proxy_config};
use crate::errors::Error;
use crate::utils::ownerref::OwnerRef;
use crate::utils::store::{ObjectStore, create_or_update};

pub const PROXY_CONFIG_KEY: &str = "proxy.yaml";

/// Store the fully derived proxy object, status included, for consumers rendering guest config
pub fn reconcile_proxy_config_map(
    cm: &mut ConfigMap,
    owner_ref: &OwnerRef,
    proxy: &Proxy,
) -> Result<(), Error> {
    let serialized = serde_yaml::to_string(proxy).map_err(|source| Error::Serialize {
        artifact: "proxy configuration".into(),
        source,
    })?;

    owner_ref.apply_to(cm);
    cm.data
        .get_or_insert_with(BTreeMap::new)
        .insert(PROXY_CONFIG_KEY.to_string(), serialized);
    Ok(())
}

#[instrument(skip_all, fields(hcp = %hcp.name_any()))]
pub async fn reconcile(hcp: &HostedControlPlane, store: &dyn ObjectStore) -> Result<(), Error> {
    let namespace = hcp.namespace().unwrap_or_default();
    let owner_ref = OwnerRef::from_object(hcp);

    let global_config = GlobalConfig::parse(hcp.spec.configuration.as_ref());
    let mut proxy = proxy_config();
    reconcile_proxy_config_with_status(&mut proxy, hcp, &global_config)?;

    let (_, result) = create_or_update(store, manifests::proxy_config_map(&namespace), |cm| {
        reconcile_proxy_config_map(cm, &owner_ref, &proxy)
    })
    .await?;
    debug!("proxy config: {result:?}");
    Ok(())
}
