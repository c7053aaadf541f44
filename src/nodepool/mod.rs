//! `nodepool create`: build a NodePool for an existing hosted cluster and submit it.

use clap::Args;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::crd::hostedcluster::{HostedCluster, Release};
use crate::crd::nodepool::{NodePool, NodePoolManagement, NodePoolSpec, UpgradeType};
use crate::errors::Error;
use crate::utils::store::{ObjectKey, ObjectStore, get_typed};
use crate::utils::strings::name_namespaced;

pub mod aws;
pub mod azure;
pub mod kubevirt;
pub mod platform;
pub mod powervs;

pub use platform::{NodePoolPlatformOptions, PlatformOptions};

/// Flags shared by every platform
#[derive(Args, Debug, Clone, PartialEq)]
pub struct CreateNodePoolOptions {
    /// Name of the NodePool
    #[arg(long)]
    pub name: String,
    /// Namespace of the HostedCluster and the new NodePool
    #[arg(long, default_value = "clusters")]
    pub namespace: String,
    /// Name of the HostedCluster the NodePool belongs to
    #[arg(long, default_value = "example")]
    pub cluster_name: String,
    #[arg(long, default_value_t = 2)]
    pub node_count: i32,
    /// Release image for the nodes. Defaults to the HostedCluster's release
    #[arg(long)]
    pub release_image: Option<String>,
    /// Print the NodePool as YAML instead of creating it
    #[arg(long)]
    pub render: bool,
    #[arg(long = "node-upgrade-type", value_enum, default_value_t = UpgradeType::Replace)]
    pub upgrade_type: UpgradeType,
}

/// Race `future` against `token`. Cancellation wins ties
pub async fn cancellable<T>(
    token: &CancellationToken,
    future: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

pub fn render(node_pool: &NodePool) -> Result<String, Error> {
    serde_yaml::to_string(node_pool).map_err(|source| Error::Serialize {
        artifact: "node pool".into(),
        source,
    })
}

/// Build and submit a NodePool.
///
/// Every lookup gives way to `token`. The token is checked once more right before
/// the create call; once that call is issued it runs to completion, so a create that
/// lands after cancellation still counts as success. With `render` set nothing is
/// written and the constructed NodePool is returned for printing.
#[instrument(skip_all, fields(nodepool = %opts.name, cluster = %opts.cluster_name))]
pub async fn create_node_pool(
    token: CancellationToken,
    opts: &CreateNodePoolOptions,
    platform: &PlatformOptions,
    store: &dyn ObjectStore,
) -> Result<NodePool, Error> {
    platform.validate()?;

    let hosted_cluster = cancellable(
        &token,
        get_typed::<HostedCluster>(store, Some(&opts.namespace), &opts.cluster_name),
    )
    .await?
    .ok_or_else(|| Error::HostedClusterNotFound(format!("{}/{}", opts.namespace, opts.cluster_name)))?;

    if hosted_cluster.spec.platform.type_ != platform.platform_type() {
        return Err(Error::PlatformMismatch {
            declared: platform.platform_type(),
            reason: format!(
                "hosted cluster {} runs on {}",
                opts.cluster_name, hosted_cluster.spec.platform.type_
            ),
        });
    }

    if !opts.render {
        let existing = cancellable(
            &token,
            get_typed::<NodePool>(store, Some(&opts.namespace), &opts.name),
        )
        .await?;
        if existing.is_some() {
            return Err(Error::NodePoolAlreadyExists(format!(
                "{}/{}",
                opts.namespace, opts.name
            )));
        }
    }

    let mut node_pool = NodePool::new(
        &opts.name,
        NodePoolSpec {
            cluster_name: opts.cluster_name.clone(),
            node_count: Some(opts.node_count),
            management: NodePoolManagement {
                upgrade_type: opts.upgrade_type,
            },
            release: Release {
                image: opts
                    .release_image
                    .clone()
                    .unwrap_or_else(|| hosted_cluster.spec.release.image.clone()),
            },
            platform: Default::default(),
        },
    );
    node_pool.metadata.namespace = Some(opts.namespace.clone());

    platform
        .update_node_pool(&token, &mut node_pool, &hosted_cluster, store)
        .await?;
    node_pool.spec.platform.validate()?;

    if opts.render {
        return Ok(node_pool);
    }

    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let key = ObjectKey::of(&node_pool)?;
    let created = store.create(&key, serde_json::to_value(&node_pool)?).await?;
    info!("NodePool {} created", name_namespaced(&node_pool));
    Ok(serde_json::from_value(created)?)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::crd::platform::PlatformType;
    use crate::utils::store::memory::MemoryStore;
    use async_trait::async_trait;
    use kube::api::ApiResource;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Store whose lookups never complete
    #[derive(Default)]
    struct PendingStore {
        creates: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for PendingStore {
        async fn get(&self, _key: &ObjectKey) -> Result<Option<Value>, Error> {
            futures::future::pending().await
        }
        async fn create(&self, _key: &ObjectKey, object: Value) -> Result<Value, Error> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(object)
        }
        async fn update(&self, _key: &ObjectKey, object: Value) -> Result<Value, Error> {
            Ok(object)
        }
        async fn list(&self, _: &ApiResource, _: Option<&str>) -> Result<Vec<Value>, Error> {
            futures::future::pending().await
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum CancelOn {
        List,
        Create,
    }

    /// Memory store that fires the token from inside one kind of call
    struct CancellingStore {
        inner: MemoryStore,
        token: CancellationToken,
        cancel_on: CancelOn,
    }

    #[async_trait]
    impl ObjectStore for CancellingStore {
        async fn get(&self, key: &ObjectKey) -> Result<Option<Value>, Error> {
            self.inner.get(key).await
        }
        async fn create(&self, key: &ObjectKey, object: Value) -> Result<Value, Error> {
            if self.cancel_on == CancelOn::Create {
                self.token.cancel();
            }
            self.inner.create(key, object).await
        }
        async fn update(&self, key: &ObjectKey, object: Value) -> Result<Value, Error> {
            self.inner.update(key, object).await
        }
        async fn list(&self, resource: &ApiResource, ns: Option<&str>) -> Result<Vec<Value>, Error> {
            if self.cancel_on == CancelOn::List {
                self.token.cancel();
            }
            self.inner.list(resource, ns).await
        }
    }

    fn store_with(platform: PlatformType) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(&hosted_cluster(platform));
        store
    }

    #[tokio::test]
    async fn creates_node_pool_with_matching_platform() {
        let store = store_with(PlatformType::PowerVs);
        let platform = PlatformOptions::from_selector("powervs").unwrap();

        let created = create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store)
            .await
            .unwrap();
        assert_eq!(created.spec.platform.type_, PlatformType::PowerVs);
        assert!(created.spec.platform.power_vs.is_some());
        assert_eq!(
            created.spec.release.image,
            "quay.io/openshift-release-dev/ocp-release:4.14.0-x86_64"
        );
        assert!(store.get_typed::<NodePool>(Some(NAMESPACE), "workers").is_some());
    }

    #[tokio::test]
    async fn every_strategy_agrees_with_its_sub_spec() {
        for platform_type in [
            PlatformType::Aws,
            PlatformType::Azure,
            PlatformType::PowerVs,
            PlatformType::KubeVirt,
        ] {
            let store = store_with(platform_type);
            let platform = PlatformOptions::from_selector(platform_type.as_str()).unwrap();
            let node_pool =
                create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store)
                    .await
                    .unwrap();
            assert_eq!(node_pool.spec.platform.type_, platform_type);
            node_pool.spec.platform.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn release_image_flag_overrides_cluster_release() {
        let store = store_with(PlatformType::KubeVirt);
        let platform = PlatformOptions::from_selector("kubevirt").unwrap();
        let mut opts = options("workers");
        opts.release_image = Some("quay.io/custom:1".into());

        let created = create_node_pool(CancellationToken::new(), &opts, &platform, &store)
            .await
            .unwrap();
        assert_eq!(created.spec.release.image, "quay.io/custom:1");
    }

    #[tokio::test]
    async fn cancelled_before_start_creates_nothing() {
        let store = PendingStore::default();
        let token = CancellationToken::new();
        token.cancel();

        let platform = PlatformOptions::from_selector("azure").unwrap();
        let result = create_node_pool(token, &options("workers"), &platform, &store).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_lookup() {
        let store = PendingStore::default();
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let platform = PlatformOptions::from_selector("azure").unwrap();
        let result = create_node_pool(token, &options("workers"), &platform, &store).await;
        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_after_lookups_stops_before_create() {
        let token = CancellationToken::new();
        let store = CancellingStore {
            inner: store_with(PlatformType::Aws),
            token: token.clone(),
            cancel_on: CancelOn::List,
        };

        // AWS looks up sibling pools for a subnet, which fires the token
        let platform = PlatformOptions::from_selector("aws").unwrap();
        let result = create_node_pool(token, &options("workers"), &platform, &store).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(store.inner.get_typed::<NodePool>(Some(NAMESPACE), "workers").is_none());
    }

    #[tokio::test]
    async fn cancellation_during_create_still_succeeds() {
        let token = CancellationToken::new();
        let store = CancellingStore {
            inner: store_with(PlatformType::KubeVirt),
            token: token.clone(),
            cancel_on: CancelOn::Create,
        };

        let platform = PlatformOptions::from_selector("kubevirt").unwrap();
        let result = create_node_pool(token.clone(), &options("workers"), &platform, &store).await;
        assert!(result.is_ok());
        assert!(token.is_cancelled());
        assert!(store.inner.get_typed::<NodePool>(Some(NAMESPACE), "workers").is_some());
    }

    #[tokio::test]
    async fn existing_node_pool_is_not_replaced() {
        let store = store_with(PlatformType::KubeVirt);
        let platform = PlatformOptions::from_selector("kubevirt").unwrap();
        create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store)
            .await
            .unwrap();

        let result =
            create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store).await;
        assert!(matches!(result, Err(Error::NodePoolAlreadyExists(name)) if name == "clusters/workers"));
    }

    #[tokio::test]
    async fn render_writes_nothing() {
        let store = store_with(PlatformType::Azure);
        let platform = PlatformOptions::from_selector("azure").unwrap();
        let mut opts = options("workers");
        opts.render = true;

        let node_pool = create_node_pool(CancellationToken::new(), &opts, &platform, &store)
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        let yaml = render(&node_pool).unwrap();
        assert!(yaml.contains("vmSize: Standard_D4s_v4"));
        assert!(yaml.contains("kind: NodePool"));
    }

    #[tokio::test]
    async fn platform_must_match_hosted_cluster() {
        let store = store_with(PlatformType::Aws);
        let platform = PlatformOptions::from_selector("powervs").unwrap();
        let result =
            create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store).await;
        assert!(matches!(
            result,
            Err(Error::PlatformMismatch { declared: PlatformType::PowerVs, .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_hosted_cluster_is_reported() {
        let store = MemoryStore::new();
        let platform = PlatformOptions::from_selector("kubevirt").unwrap();
        let result =
            create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store).await;
        assert!(matches!(result, Err(Error::HostedClusterNotFound(_))));
    }

    #[tokio::test]
    async fn invalid_flags_fail_before_any_call() {
        let store = MemoryStore::new();
        let platform = PlatformOptions::PowerVs(powervs::PowerVsPlatformCreateOptions {
            proc_type: "turbo".into(),
            ..Default::default()
        });
        let result =
            create_node_pool(CancellationToken::new(), &options("workers"), &platform, &store).await;
        assert!(matches!(result, Err(Error::InvalidOption { .. })));
        assert_eq!(store.calls(), 0);
    }
}
