//! End-to-end reconciliation against the in-memory store.

use std::sync::Arc;

use drone_operator::crds::{DroneServer, DroneServerSpec, SecretRef};
use drone_operator::resources::secret_ref::is_secret_sourced;
use drone_operator::store::memory::Verb;
use drone_operator::store::{MemoryStore, ObjectKey};
use drone_operator::{Reconciler, ReconcilerSettings};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Service};
use kube::runtime::controller::Action;

const NAMESPACE: &str = "default";

fn ci_server() -> DroneServer {
    let mut ds = DroneServer::new(
        "ci",
        DroneServerSpec {
            runner_replicas: 3,
            runner_capacity: 2,
            server_host: "ci.example.com".into(),
            github_server: "https://github.com".into(),
            github_client_id_secret: SecretRef::new("gh", "id"),
            github_client_secret_secret: SecretRef::new("gh", "secret"),
            shared_secret: SecretRef::new("rpc", "key"),
        },
    );
    ds.metadata.namespace = Some(NAMESPACE.into());
    ds.metadata.uid = Some("0d9a6c1e-ci".into());
    ds.metadata.generation = Some(1);
    ds
}

fn key(name: &str) -> ObjectKey {
    ObjectKey::new(NAMESPACE, name)
}

async fn setup() -> (Arc<MemoryStore>, Reconciler<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.seed(&ci_server()).await.unwrap();
    let reconciler = Reconciler::new(store.clone(), ReconcilerSettings::default());
    (store, reconciler)
}

fn container(dep: &Deployment) -> &Container {
    &dep.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
}

fn secret_env_count(c: &Container) -> usize {
    c.env
        .as_ref()
        .map(|env| env.iter().filter(|e| is_secret_sourced(e)).count())
        .unwrap_or(0)
}

async fn deployment(store: &MemoryStore, name: &str) -> Deployment {
    store
        .object(&key(name))
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("deployment {name} should exist"))
}

async fn service(store: &MemoryStore, name: &str) -> Service {
    store
        .object(&key(name))
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("service {name} should exist"))
}

#[tokio::test]
async fn test_fresh_install_creates_server_and_runners() {
    let (store, reconciler) = setup().await;

    let action = reconciler.reconcile(&key("ci")).await.unwrap();
    assert_eq!(action, Action::await_change());

    assert_eq!(store.count::<Deployment>().await, 2);
    assert_eq!(store.count::<Service>().await, 2);

    let server = deployment(&store, "ci-deployment").await;
    let server_container = container(&server);
    assert_eq!(server_container.image.as_deref(), Some("drone/drone:2"));
    assert_eq!(server_container.ports.as_ref().unwrap()[0].container_port, 80);
    assert_eq!(secret_env_count(server_container), 3);

    let runner = deployment(&store, "ci-runner").await;
    let runner_container = container(&runner);
    assert_eq!(runner_container.image.as_deref(), Some("drone/drone-runner-docker:1"));
    assert_eq!(runner_container.ports.as_ref().unwrap()[0].container_port, 3000);
    assert_eq!(secret_env_count(runner_container), 1);
    assert_eq!(runner.spec.as_ref().unwrap().replicas, Some(3));

    assert_eq!(service(&store, "ci").await.spec.unwrap().ports.unwrap()[0].port, 80);
    assert_eq!(service(&store, "ci-runner").await.spec.unwrap().ports.unwrap()[0].port, 3000);

    let ds: DroneServer = store.object(&key("ci")).await.unwrap().unwrap();
    let status = ds.status.expect("status recorded");
    assert_eq!(status.phase.as_deref(), Some("Pending"));
    assert_eq!(status.observed_generation, Some(1));
}

#[tokio::test]
async fn test_second_pass_creates_nothing_new() {
    let (store, reconciler) = setup().await;
    reconciler.reconcile(&key("ci")).await.unwrap();
    let before = deployment(&store, "ci-runner").await;
    store.clear_calls().await;

    reconciler.reconcile(&key("ci")).await.unwrap();

    assert_eq!(store.count::<Deployment>().await, 2);
    assert_eq!(store.count::<Service>().await, 2);
    let writes = store.writes().await;
    assert!(writes.iter().all(|c| c.verb == Verb::Replace));
    assert_eq!(writes.len(), 4);

    let after = deployment(&store, "ci-runner").await;
    assert_eq!(before.spec, after.spec);
    assert_eq!(before.metadata.generation, after.metadata.generation);
}

#[tokio::test]
async fn test_spec_edit_is_rolled_out() {
    let (store, reconciler) = setup().await;
    reconciler.reconcile(&key("ci")).await.unwrap();

    let mut ds: DroneServer = store.object(&key("ci")).await.unwrap().unwrap();
    ds.spec.runner_replicas = 5;
    ds.spec.shared_secret = SecretRef::new("rpc-rotated", "key");
    ds.metadata.generation = Some(2);
    store.seed(&ds).await.unwrap();

    reconciler.reconcile(&key("ci")).await.unwrap();

    let runner = deployment(&store, "ci-runner").await;
    assert_eq!(runner.spec.as_ref().unwrap().replicas, Some(5));
    let rpc = container(&runner)
        .env
        .as_ref()
        .unwrap()
        .iter()
        .find(|e| e.name == "DRONE_RPC_SECRET")
        .and_then(|e| e.value_from.clone())
        .and_then(|v| v.secret_key_ref)
        .unwrap();
    assert_eq!(rpc.name.as_deref(), Some("rpc-rotated"));

    let ds: DroneServer = store.object(&key("ci")).await.unwrap().unwrap();
    assert_eq!(ds.status.unwrap().observed_generation, Some(2));
}

#[tokio::test]
async fn test_external_drift_is_reverted() {
    let (store, reconciler) = setup().await;
    reconciler.reconcile(&key("ci")).await.unwrap();

    let mut drifted = service(&store, "ci").await;
    let spec = drifted.spec.as_mut().unwrap();
    spec.type_ = Some("NodePort".into());
    spec.ports.as_mut().unwrap()[0].port = 8080;
    store.seed(&drifted).await.unwrap();

    reconciler.reconcile(&key("ci")).await.unwrap();

    let svc = service(&store, "ci").await;
    let spec = svc.spec.unwrap();
    assert!(spec.type_.is_none());
    assert_eq!(spec.ports.unwrap()[0].port, 80);
}

#[tokio::test]
async fn test_deleted_server_is_a_clean_no_op() {
    let store = Arc::new(MemoryStore::new());
    let reconciler = Reconciler::new(store.clone(), ReconcilerSettings::default());

    let action = reconciler.reconcile(&key("ci")).await.unwrap();
    assert_eq!(action, Action::await_change());
    assert!(store.writes().await.is_empty());
    assert_eq!(store.count::<Deployment>().await, 0);
}

#[tokio::test]
async fn test_runner_failure_leaves_services_untouched() {
    let (store, reconciler) = setup().await;
    store.fail_on::<Deployment>(&key("ci-runner")).await;

    assert!(reconciler.reconcile(&key("ci")).await.is_err());
    let touched_services = store
        .calls()
        .await
        .into_iter()
        .filter(|c| c.kind == "Service")
        .count();
    assert_eq!(touched_services, 0);

    store.clear_failures().await;
    reconciler.reconcile(&key("ci")).await.unwrap();
    assert_eq!(store.count::<Deployment>().await, 2);
    assert_eq!(store.count::<Service>().await, 2);
}
