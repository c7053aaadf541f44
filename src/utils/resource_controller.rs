use futures::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{Instrument, error, info_span, warn};

use crate::errors::Error;

const RETRY_SECONDS: u64 = 15;

/// Watches every `ResourceType` in the cluster and hands each change to an update or a
/// remove function, depending on whether the object is being deleted.
pub struct ResourceController<ResourceType, State> {
    client: Client,
    state: Arc<State>,
    resource: PhantomData<ResourceType>,
}

impl<ResourceType, State> ResourceController<ResourceType, State>
where
    ResourceType: Resource + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    ResourceType::DynamicType: Clone + Debug + Default + Eq + Hash + Unpin,
    State: Send + Sync + 'static,
{
    pub fn new(client: Client, state: State) -> Self {
        ResourceController {
            client,
            state: Arc::new(state),
            resource: PhantomData,
        }
    }

    /// Run until the watch stream ends. `configure` may add watches on child resources
    /// so that drift in an owned object triggers a reconcile of its owner
    pub async fn run<UpdateFn, UpdateFut, RemoveFn, RemoveFut>(
        self,
        update_fn: UpdateFn,
        remove_fn: RemoveFn,
        configure: impl FnOnce(Controller<ResourceType>) -> Controller<ResourceType>,
    ) where
        UpdateFn: Fn(Arc<ResourceType>, Arc<State>) -> UpdateFut + Send + Sync + 'static,
        UpdateFut: Future<Output = Result<Action, Error>> + Send + 'static,
        RemoveFn: Fn(Arc<ResourceType>, Arc<State>) -> RemoveFut + Send + Sync + 'static,
        RemoveFut: Future<Output = Result<Action, Error>> + Send + 'static,
    {
        let api: Api<ResourceType> = Api::all(self.client.clone());
        let update_fn = Arc::new(update_fn);
        let remove_fn = Arc::new(remove_fn);
        let retry_after = Duration::from_secs(RETRY_SECONDS);
        let kind = ResourceType::kind(&Default::default()).to_string();

        let reconcile = move |object: Arc<ResourceType>, state: Arc<State>| {
            let update_fn = update_fn.clone();
            let remove_fn = remove_fn.clone();
            let span = info_span!(
                "reconcile resource",
                "kind" = kind.as_str(),
                "ns" = object.namespace(),
                "name" = object.name_any()
            );

            async move {
                if object.meta().deletion_timestamp.is_some() {
                    remove_fn(object, state).instrument(info_span!("remove_fn")).await
                } else {
                    update_fn(object, state).instrument(info_span!("update_fn")).await
                }
            }
            .instrument(span)
        };

        let error_policy = move |object: Arc<ResourceType>, error: &Error, _state: Arc<State>| {
            warn!(
                "reconcile of {} failed, retrying in {}s: {}",
                object.name_any(),
                retry_after.as_secs(),
                error
            );
            Action::requeue(retry_after)
        };

        configure(Controller::new(api, watcher::Config::default()))
            .run(reconcile, error_policy, self.state)
            .for_each(|res| async move {
                if let Err(e) = res {
                    error!("controller error: {:?}", e);
                }
            })
            .await
    }
}
