//! One reconciliation pass for one DroneServer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::constants;
use crate::converge::converge;
use crate::crds::{DroneServer, DroneServerStatus};
use crate::error::{OperatorError, Result};
use crate::resources::{DesiredState, Images};
use crate::status::{self, deployment_available};
use crate::store::{ObjectKey, ResourceClient, StatusWriter};

/// Knobs for a [`Reconciler`].
#[derive(Clone, Debug)]
pub struct ReconcilerSettings {
    pub images: Images,
    /// Requeue interval after a successful pass; `None` waits for a change.
    pub resync: Option<Duration>,
    /// Deadline for loading and converging in one pass, and separately for
    /// each status write.
    pub timeout: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            images: Images::default(),
            resync: None,
            timeout: Duration::from_secs(constants::defaults::RECONCILE_TIMEOUT_SECS),
        }
    }
}

/// Drives the objects owned by a DroneServer toward its spec.
///
/// Holds no state between passes: every call re-reads the DroneServer.
pub struct Reconciler<C> {
    client: Arc<C>,
    settings: ReconcilerSettings,
}

impl<C> Reconciler<C>
where
    C: ResourceClient<DroneServer>
        + ResourceClient<Deployment>
        + ResourceClient<Service>
        + StatusWriter,
{
    pub fn new(client: Arc<C>, settings: ReconcilerSettings) -> Self {
        Self { client, settings }
    }

    /// Reconcile the DroneServer identified by `key`.
    ///
    /// Returns the follow-up action on success. Any error means the pass
    /// should be retried from scratch. Loading and converging share one
    /// deadline; running past it fails the pass like any other error.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        let deadline = Instant::now() + self.settings.timeout;
        let client = self.client.as_ref();

        let loaded = self
            .bounded(deadline, ResourceClient::<DroneServer>::get(client, key))
            .await?;
        let Some(ds) = loaded else {
            // owned objects go away through their owner references
            debug!(name = %key.name, namespace = %key.namespace, "DroneServer not found");
            return Ok(Action::await_change());
        };

        info!(name = %key.name, namespace = %key.namespace, "Reconciling DroneServer");

        let desired = DesiredState::build(&ds, &self.settings.images);

        match self.bounded(deadline, self.apply(&desired)).await {
            Ok(available) => {
                let status = status::converged(&ds, available, &now());
                self.write_status(key, &ds, &status).await?;
                Ok(self
                    .settings
                    .resync
                    .map(Action::requeue)
                    .unwrap_or_else(Action::await_change))
            }
            Err(err) => {
                let status = status::failed(&ds, &err.to_string(), &now());
                if let Err(status_err) = self.write_status(key, &ds, &status).await {
                    warn!(
                        name = %key.name,
                        namespace = %key.namespace,
                        "Failed to record failed status: {status_err}"
                    );
                }
                Err(err)
            }
        }
    }

    async fn bounded<T>(
        &self,
        deadline: Instant,
        step: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout_at(deadline, step)
            .await
            .map_err(|_| OperatorError::Timeout(self.settings.timeout))?
    }

    /// Converge the four objects in order, stopping at the first failure.
    ///
    /// Workloads go before their Services. Returns whether both workloads
    /// report their replicas available.
    async fn apply(&self, desired: &DesiredState) -> Result<bool> {
        let client = self.client.as_ref();

        let server = converge(client, &desired.server_deployment).await?;
        let runner = converge(client, &desired.runner_deployment).await?;
        converge(client, &desired.server_service).await?;
        converge(client, &desired.runner_service).await?;

        Ok(deployment_available(&server.object) && deployment_available(&runner.object))
    }

    async fn write_status(
        &self,
        key: &ObjectKey,
        ds: &DroneServer,
        status: &DroneServerStatus,
    ) -> Result<()> {
        if ds
            .status
            .as_ref()
            .is_some_and(|current| current.same_state(status))
        {
            return Ok(());
        }
        debug!(name = %key.name, phase = ?status.phase, "Updating DroneServer status");
        let deadline = Instant::now() + self.settings.timeout;
        self.bounded(deadline, self.client.patch_status(key, status)).await
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
