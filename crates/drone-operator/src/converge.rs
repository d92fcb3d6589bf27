//! Create-or-replace of a single managed object.
//!
//! The live object's `spec` is overwritten wholesale with the desired one and
//! the update is sent even when nothing changed. Labels are only set on
//! create; a live object without a controlling owner is adopted.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::Resource;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metrics;
use crate::store::{ObjectKey, ResourceClient};

/// A kind the operator manages through spec overwrite.
pub trait Managed: Resource<DynamicType = ()> + Clone + Send + Sync + 'static {
    /// Replace this object's spec with the spec of `desired`.
    fn overwrite_spec(&mut self, desired: &Self);
}

impl Managed for Deployment {
    fn overwrite_spec(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();
    }
}

impl Managed for Service {
    fn overwrite_spec(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();
    }
}

/// What converge did to the live object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergeOutcome {
    Created,
    Updated,
}

impl ConvergeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvergeOutcome::Created => "created",
            ConvergeOutcome::Updated => "updated",
        }
    }
}

/// Result of a successful converge: the outcome and the object as persisted.
#[derive(Clone, Debug)]
pub struct Converged<K> {
    pub outcome: ConvergeOutcome,
    pub object: K,
}

/// Make the live object identified by `desired` match it.
///
/// A fetch error other than not-found is returned untouched; nothing is
/// created or replaced in that case. A concurrent writer makes the replace
/// fail with a conflict, which is left to the caller's retry.
pub async fn converge<K, C>(client: &C, desired: &K) -> Result<Converged<K>>
where
    K: Managed,
    C: ResourceClient<K> + ?Sized,
{
    let key = ObjectKey::of(desired)?;
    let kind = K::kind(&());

    let converged = match client.get(&key).await? {
        None => {
            info!(kind = %kind, object = %key, "Creating");
            let object = client.create(desired).await?;
            Converged {
                outcome: ConvergeOutcome::Created,
                object,
            }
        }
        Some(mut live) => {
            live.overwrite_spec(desired);
            if adopt(&mut live, desired) {
                info!(kind = %kind, object = %key, "Adopting");
            }
            debug!(kind = %kind, object = %key, "Updating");
            let object = client.replace(&live).await.map_err(|e| {
                if e.is_conflict() {
                    warn!(kind = %kind, object = %key, "Update conflicted with a concurrent write");
                }
                e
            })?;
            Converged {
                outcome: ConvergeOutcome::Updated,
                object,
            }
        }
    };

    metrics::record_converge(&kind, converged.outcome.as_str());
    Ok(converged)
}

/// Give `live` the owner references of `desired` when nothing controls it.
fn adopt<K: Resource>(live: &mut K, desired: &K) -> bool {
    let controlled = live
        .meta()
        .owner_references
        .iter()
        .flatten()
        .any(|r| r.controller == Some(true));
    let Some(wanted) = desired.meta().owner_references.as_ref() else {
        return false;
    };
    if controlled || wanted.is_empty() {
        return false;
    }
    live.meta_mut()
        .owner_references
        .get_or_insert_with(Vec::new)
        .extend(wanted.iter().cloned());
    true
}
