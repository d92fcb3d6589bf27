use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::Client;
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::crds::DroneServer;
use crate::error::OperatorError;
use crate::metrics;
use crate::reconciler::Reconciler;
use crate::store::{ApiStore, ObjectKey};

/// Shared context for the DroneServer controller.
pub struct Context {
    pub reconciler: Reconciler<ApiStore>,
    pub error_requeue: Duration,
}

/// Start the DroneServer controller and run it until a shutdown signal.
pub async fn run(client: Client, config: &OperatorConfig) {
    let (servers, deployments, services): (Api<DroneServer>, Api<Deployment>, Api<Service>) =
        match &config.namespace {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
            ),
            None => (
                Api::all(client.clone()),
                Api::all(client.clone()),
                Api::all(client.clone()),
            ),
        };

    let ctx = Arc::new(Context {
        reconciler: Reconciler::new(
            Arc::new(ApiStore::new(client)),
            config.reconciler_settings(),
        ),
        error_requeue: config.error_requeue(),
    });

    info!(namespace = ?config.namespace, "Starting DroneServer controller");

    Controller::new(servers, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(services, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((_obj, _action)) => {}
                Err(e) => {
                    error!("Reconciliation error: {:?}", e);
                }
            }
        })
        .await;

    info!("DroneServer controller stopped");
}

/// Reconcile entry point called by the controller runtime.
async fn reconcile(ds: Arc<DroneServer>, ctx: Arc<Context>) -> Result<Action, OperatorError> {
    let key = ObjectKey::of(ds.as_ref())?;
    let started = Instant::now();

    let result = ctx.reconciler.reconcile(&key).await;

    metrics::observe_reconcile_duration(started.elapsed().as_secs_f64());
    metrics::record_reconciliation(if result.is_ok() { "success" } else { "error" });
    result
}

/// Error policy: every failure is retried after the same delay.
fn error_policy(ds: Arc<DroneServer>, error: &OperatorError, ctx: Arc<Context>) -> Action {
    warn!(
        name = ds.metadata.name.as_deref().unwrap_or_default(),
        namespace = ds.metadata.namespace.as_deref().unwrap_or_default(),
        "Reconciliation failed: {error}"
    );
    Action::requeue(ctx.error_requeue)
}
