//! Object store seam between the reconciler and the Kubernetes API.
//!
//! The reconciler only needs three verbs per kind plus a status write, so it
//! is written against these traits. [`ApiStore`] talks to a live cluster and
//! [`MemoryStore`] keeps objects in memory for tests.

pub mod api;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};

use crate::crds::DroneServerStatus;
use crate::error::{OperatorError, Result};

pub use api::ApiStore;
pub use memory::MemoryStore;

/// Identity of a namespaced object within one kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object; fails if name or namespace is unset.
    pub fn of<K: Resource>(obj: &K) -> Result<Self> {
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or_else(|| OperatorError::MissingObjectKey("name".into()))?;
        let namespace = obj
            .namespace()
            .ok_or_else(|| OperatorError::MissingObjectKey("namespace".into()))?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Fetch and write access to objects of kind `K`.
#[async_trait]
pub trait ResourceClient<K: Send + Sync>: Send + Sync {
    /// Fetch by identity; `Ok(None)` when the object does not exist.
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>>;

    /// Create `obj`; fails with 409 if it already exists.
    async fn create(&self, obj: &K) -> Result<K>;

    /// Replace `obj` in full. A stale `resourceVersion` fails with 409.
    async fn replace(&self, obj: &K) -> Result<K>;
}

/// Write access to the DroneServer status subresource.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn patch_status(&self, key: &ObjectKey, status: &DroneServerStatus) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_object_key_of() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("ci".into()),
                namespace: Some("build".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let key = ObjectKey::of(&svc).unwrap();
        assert_eq!(key, ObjectKey::new("build", "ci"));
        assert_eq!(key.to_string(), "build/ci");
    }

    #[test]
    fn test_object_key_requires_namespace() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("ci".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = ObjectKey::of(&svc).unwrap_err();
        assert!(matches!(err, OperatorError::MissingObjectKey(ref f) if f == "namespace"));
    }
}
