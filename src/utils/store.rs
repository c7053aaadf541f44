//! Persistence seam used by every reconciler.
//!
//! Reconcilers never talk to the API server directly. They go through an
//! [`ObjectStore`], which keeps them testable against an in-memory store, and
//! through [`create_or_update`], which implements the get-or-create-empty,
//! mutate, write-back cycle.

use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, ListParams, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use tracing::{debug, instrument};

use crate::errors::Error;

/// Identity of a stored object: its type plus namespace and name
#[derive(Debug, Clone)]
pub struct ObjectKey {
    pub resource: ApiResource,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn of<K>(object: &K) -> Result<ObjectKey, Error>
    where
        K: Resource<DynamicType = ()>,
    {
        let name = object.meta().name.clone().ok_or_else(|| {
            Error::MissingField(format!("metadata.name of {}", K::kind(&())))
        })?;
        Ok(ObjectKey {
            resource: ApiResource::erase::<K>(&()),
            namespace: object.meta().namespace.clone(),
            name,
        })
    }

    pub fn named<K>(namespace: Option<&str>, name: &str) -> ObjectKey
    where
        K: Resource<DynamicType = ()>,
    {
        ObjectKey {
            resource: ApiResource::erase::<K>(&()),
            namespace: namespace.map(String::from),
            name: name.to_string(),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Value>, Error>;
    async fn create(&self, key: &ObjectKey, object: Value) -> Result<Value, Error>;
    async fn update(&self, key: &ObjectKey, object: Value) -> Result<Value, Error>;
    async fn list(&self, resource: &ApiResource, namespace: Option<&str>)
    -> Result<Vec<Value>, Error>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Value>, Error> {
        (**self).get(key).await
    }

    async fn create(&self, key: &ObjectKey, object: Value) -> Result<Value, Error> {
        (**self).create(key, object).await
    }

    async fn update(&self, key: &ObjectKey, object: Value) -> Result<Value, Error> {
        (**self).update(key, object).await
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, Error> {
        (**self).list(resource, namespace).await
    }
}

/// What [`create_or_update`] had to do to converge an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

/// Load the stored version of `object` (or start from `object` itself when nothing is stored),
/// run `mutate` on it and write it back if anything changed.
///
/// `mutate` runs before any write, so an error from it leaves the stored object untouched.
#[instrument(skip_all, fields(kind = %K::kind(&()), name = ?object.meta().name))]
pub async fn create_or_update<K, F>(
    store: &dyn ObjectStore,
    object: K,
    mutate: F,
) -> Result<(K, OperationResult), Error>
where
    K: Resource<DynamicType = ()> + Clone + PartialEq + Serialize + DeserializeOwned + Debug,
    F: FnOnce(&mut K) -> Result<(), Error>,
{
    let key = ObjectKey::of(&object)?;

    match store.get(&key).await? {
        Some(stored) => {
            let existing: K = serde_json::from_value(stored)?;
            let mut desired = existing.clone();
            mutate(&mut desired)?;
            if desired == existing {
                debug!("{} unchanged", key.name);
                return Ok((existing, OperationResult::Unchanged));
            }
            let written = store.update(&key, serde_json::to_value(&desired)?).await?;
            debug!("{} updated", key.name);
            Ok((serde_json::from_value(written)?, OperationResult::Updated))
        }
        None => {
            let mut desired = object;
            mutate(&mut desired)?;
            let written = store.create(&key, serde_json::to_value(&desired)?).await?;
            debug!("{} created", key.name);
            Ok((serde_json::from_value(written)?, OperationResult::Created))
        }
    }
}

/// Typed lookup through an [`ObjectStore`]
pub async fn get_typed<K>(
    store: &dyn ObjectStore,
    namespace: Option<&str>,
    name: &str,
) -> Result<Option<K>, Error>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    let key = ObjectKey::named::<K>(namespace, name);
    store
        .get(&key)
        .await?
        .map(serde_json::from_value)
        .transpose()
        .map_err(Error::from)
}

/// [`ObjectStore`] backed by a Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    pub fn new(client: Client, field_manager: &str) -> KubeStore {
        KubeStore {
            client,
            field_manager: field_manager.to_string(),
        }
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &ObjectKey) -> Result<Option<Value>, Error> {
        let api = self.api(&key.resource, key.namespace.as_deref());
        Ok(api
            .get_opt(&key.name)
            .await?
            .map(serde_json::to_value)
            .transpose()?)
    }

    #[instrument(skip(self, object))]
    async fn create(&self, key: &ObjectKey, object: Value) -> Result<Value, Error> {
        let api = self.api(&key.resource, key.namespace.as_deref());
        let object: DynamicObject = serde_json::from_value(object)?;
        let created = api.create(&self.post_params(), &object).await?;
        Ok(serde_json::to_value(created)?)
    }

    #[instrument(skip(self, object))]
    async fn update(&self, key: &ObjectKey, object: Value) -> Result<Value, Error> {
        let api = self.api(&key.resource, key.namespace.as_deref());
        let object: DynamicObject = serde_json::from_value(object)?;
        let replaced = api.replace(&key.name, &self.post_params(), &object).await?;
        Ok(serde_json::to_value(replaced)?)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, Error> {
        let api = self.api(resource, namespace);
        api.list(&ListParams::default())
            .await?
            .items
            .into_iter()
            .map(|object| serde_json::to_value(object).map_err(Error::from))
            .collect()
    }
}
