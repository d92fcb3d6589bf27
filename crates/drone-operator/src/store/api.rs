use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::{ObjectKey, ResourceClient, StatusWriter};
use crate::constants::FIELD_MANAGER;
use crate::crds::{DroneServer, DroneServerStatus};
use crate::error::Result;

/// Store backed by the Kubernetes API server.
#[derive(Clone)]
pub struct ApiStore {
    client: Client,
}

impl ApiStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl<K> ResourceClient<K> for ApiStore
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>> {
        Ok(self.api::<K>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        Ok(self
            .api::<K>(&key.namespace)
            .create(&PostParams::default(), obj)
            .await?)
    }

    async fn replace(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        Ok(self
            .api::<K>(&key.namespace)
            .replace(&key.name, &PostParams::default(), obj)
            .await?)
    }
}

#[async_trait]
impl StatusWriter for ApiStore {
    async fn patch_status(&self, key: &ObjectKey, status: &DroneServerStatus) -> Result<()> {
        let status_patch = json!({ "status": status });
        self.api::<DroneServer>(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&status_patch),
            )
            .await?;
        Ok(())
    }
}
