//! In-memory object store.
//!
//! Mirrors the API server behaviour the reconciler depends on: resource
//! versions with optimistic concurrency on replace, 404/409 responses, a
//! status subresource that plain replaces cannot touch, and a bumped
//! `generation` when a spec changes. Every call is logged and failures can be
//! injected per object.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{ObjectKey, ResourceClient, StatusWriter};
use crate::crds::{DroneServer, DroneServerStatus};
use crate::error::{api_error, Result};

/// Store operation, as recorded in the call log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Replace,
    PatchStatus,
}

/// One recorded store call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub kind: String,
    pub key: ObjectKey,
}

type Slot = (String, ObjectKey);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Slot, Value>,
    calls: Vec<Call>,
    failures: Vec<Slot>,
    interleaved: Vec<Slot>,
    last_version: u64,
}

impl Inner {
    fn record(&mut self, verb: Verb, kind: &str, key: &ObjectKey) -> Result<()> {
        self.calls.push(Call {
            verb,
            kind: kind.to_string(),
            key: key.clone(),
        });
        let slot = (kind.to_string(), key.clone());
        if self.failures.contains(&slot) {
            return Err(api_error(
                500,
                "InternalError",
                format!("injected failure for {kind} {key}"),
            ));
        }
        Ok(())
    }

    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }

    /// Bump the stored resource version, as another writer would.
    fn touch(&mut self, slot: &Slot) {
        let version = self.next_version();
        if let Some(Value::Object(stored)) = self.objects.get_mut(slot) {
            if let Some(Value::Object(meta)) = stored.get_mut("metadata") {
                meta.insert("resourceVersion".into(), Value::String(version));
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).to_string()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `obj` as-is, status included, without logging a call.
    pub async fn seed<K>(&self, obj: &K) -> Result<()>
    where
        K: Resource<DynamicType = ()> + Serialize + Clone,
    {
        let key = ObjectKey::of(obj)?;
        let mut inner = self.inner.lock().await;
        let mut stored = obj.clone();
        if stored.meta().resource_version.is_none() {
            stored.meta_mut().resource_version = Some(inner.next_version());
        }
        let value = serde_json::to_value(&stored)?;
        inner.objects.insert((kind_of::<K>(), key), value);
        Ok(())
    }

    /// Current stored object, without logging a call.
    pub async fn object<K>(&self, key: &ObjectKey) -> Result<Option<K>>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let inner = self.inner.lock().await;
        inner
            .objects
            .get(&(kind_of::<K>(), key.clone()))
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(Into::into)
    }

    /// Number of stored objects of kind `K`.
    pub async fn count<K: Resource<DynamicType = ()>>(&self) -> usize {
        let kind = kind_of::<K>();
        let inner = self.inner.lock().await;
        inner.objects.keys().filter(|(k, _)| *k == kind).count()
    }

    /// Make every call touching this object fail with a 500.
    pub async fn fail_on<K: Resource<DynamicType = ()>>(&self, key: &ObjectKey) {
        let mut inner = self.inner.lock().await;
        inner.failures.push((kind_of::<K>(), key.clone()));
    }

    /// Let another writer update this object right before the next replace
    /// of it lands. One-shot.
    pub async fn interleave_write<K: Resource<DynamicType = ()>>(&self, key: &ObjectKey) {
        let mut inner = self.inner.lock().await;
        inner.interleaved.push((kind_of::<K>(), key.clone()));
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        self.inner.lock().await.failures.clear();
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.inner.lock().await.calls.clone()
    }

    /// Recorded calls other than reads.
    pub async fn writes(&self) -> Vec<Call> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| c.verb != Verb::Get)
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }
}

#[async_trait]
impl<K> ResourceClient<K> for MemoryStore
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>> {
        let kind = kind_of::<K>();
        let mut inner = self.inner.lock().await;
        inner.record(Verb::Get, &kind, key)?;
        inner
            .objects
            .get(&(kind, key.clone()))
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(Into::into)
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let kind = kind_of::<K>();
        let key = ObjectKey::of(obj)?;
        let mut inner = self.inner.lock().await;
        inner.record(Verb::Create, &kind, &key)?;

        let slot = (kind.clone(), key.clone());
        if inner.objects.contains_key(&slot) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{kind} {key} already exists"),
            ));
        }

        let version = inner.next_version();
        let mut stored = obj.clone();
        let meta = stored.meta_mut();
        meta.resource_version = Some(version.clone());
        meta.uid.get_or_insert_with(|| format!("uid-{version}"));
        meta.generation = Some(1);

        inner.objects.insert(slot, serde_json::to_value(&stored)?);
        Ok(stored)
    }

    async fn replace(&self, obj: &K) -> Result<K> {
        let kind = kind_of::<K>();
        let key = ObjectKey::of(obj)?;
        let mut inner = self.inner.lock().await;
        inner.record(Verb::Replace, &kind, &key)?;

        let slot = (kind.clone(), key.clone());
        if let Some(pos) = inner.interleaved.iter().position(|s| *s == slot) {
            inner.interleaved.remove(pos);
            inner.touch(&slot);
        }
        let Some(current) = inner.objects.get(&slot).cloned() else {
            return Err(api_error(404, "NotFound", format!("{kind} {key} not found")));
        };
        let current_meta = &current["metadata"];

        let sent_version = obj.meta().resource_version.as_deref();
        let live_version = current_meta["resourceVersion"].as_str();
        if sent_version.is_some() && sent_version != live_version {
            return Err(api_error(
                409,
                "Conflict",
                format!("{kind} {key} has been modified; apply changes to the latest version"),
            ));
        }

        let mut value = serde_json::to_value(obj)?;
        if let Value::Object(map) = &mut value {
            // status belongs to the status subresource
            match current.get("status") {
                Some(status) => map.insert("status".into(), status.clone()),
                None => map.remove("status"),
            };
        }

        let generation = current_meta["generation"].as_i64().unwrap_or(1);
        let generation = if value.get("spec") != current.get("spec") {
            generation + 1
        } else {
            generation
        };

        let mut stored: K = serde_json::from_value(value)?;
        let version = inner.next_version();
        let meta = stored.meta_mut();
        meta.resource_version = Some(version);
        meta.generation = Some(generation);
        if meta.uid.is_none() {
            meta.uid = current_meta["uid"].as_str().map(str::to_string);
        }

        inner.objects.insert(slot, serde_json::to_value(&stored)?);
        Ok(stored)
    }
}

#[async_trait]
impl StatusWriter for MemoryStore {
    async fn patch_status(&self, key: &ObjectKey, status: &DroneServerStatus) -> Result<()> {
        let kind = kind_of::<DroneServer>();
        let mut inner = self.inner.lock().await;
        inner.record(Verb::PatchStatus, &kind, key)?;

        let slot = (kind.clone(), key.clone());
        let status = serde_json::to_value(status)?;
        let Some(Value::Object(stored)) = inner.objects.get_mut(&slot) else {
            return Err(api_error(404, "NotFound", format!("{kind} {key} not found")));
        };
        stored.insert("status".into(), status);
        inner.touch(&slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperatorError;
    use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec, ServiceStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn service(port: i32) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("ci".into()),
                namespace: Some("build".into()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(vec![ServicePort {
                    port,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn key() -> ObjectKey {
        ObjectKey::new("build", "ci")
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let created = ResourceClient::<Service>::create(&store, &service(80)).await.unwrap();
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert_eq!(created.metadata.generation, Some(1));

        let fetched: Option<Service> = store.get(&key()).await.unwrap();
        assert_eq!(fetched.unwrap().spec, service(80).spec);
        assert_eq!(store.count::<Service>().await, 1);
    }

    #[tokio::test]
    async fn test_create_existing_conflicts() {
        let store = MemoryStore::new();
        ResourceClient::<Service>::create(&store, &service(80)).await.unwrap();
        let err = ResourceClient::<Service>::create(&store, &service(80))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_replace_with_stale_version_conflicts() {
        let store = MemoryStore::new();
        ResourceClient::<Service>::create(&store, &service(80)).await.unwrap();
        let mut stale: Service = store.get(&key()).await.unwrap().unwrap();

        // a concurrent writer lands between our get and replace
        let mut other = stale.clone();
        other.spec = service(81).spec;
        store.replace(&other).await.unwrap();

        stale.spec = service(82).spec;
        let err = store.replace(&stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_interleaved_write_fires_once() {
        let store = MemoryStore::new();
        ResourceClient::<Service>::create(&store, &service(80)).await.unwrap();
        store.interleave_write::<Service>(&key()).await;

        let live: Service = store.get(&key()).await.unwrap().unwrap();
        assert!(store.replace(&live).await.unwrap_err().is_conflict());

        let live: Service = store.get(&key()).await.unwrap().unwrap();
        assert!(store.replace(&live).await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_preserves_status_and_bumps_generation() {
        let store = MemoryStore::new();
        let mut seeded = service(80);
        seeded.status = Some(ServiceStatus::default());
        store.seed(&seeded).await.unwrap();

        let mut live: Service = store.get(&key()).await.unwrap().unwrap();
        live.status = None;
        live.spec = service(81).spec;
        let replaced = store.replace(&live).await.unwrap();
        assert!(replaced.status.is_some());
        assert_eq!(replaced.metadata.generation, Some(2));

        let again = store.replace(&replaced).await.unwrap();
        assert_eq!(again.metadata.generation, Some(2));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.fail_on::<Service>(&key()).await;
        let err = ResourceClient::<Service>::get(&store, &key()).await.unwrap_err();
        assert!(matches!(err, OperatorError::Kube(kube::Error::Api(ref e)) if e.code == 500));

        store.clear_failures().await;
        let ok: Option<Service> = store.get(&key()).await.unwrap();
        assert!(ok.is_none());
        assert_eq!(store.calls().await.len(), 2);
    }
}
