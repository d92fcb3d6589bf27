use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};

use super::secret_ref::{plain_env, secret_env, secret_env_with_key};
use super::{
    common_labels, runner_name, runner_selector, server_deployment_name, server_selector,
    server_service_name,
};
use crate::constants::{self, env, ports, values, RPC_SECRET_KEY};
use crate::crds::DroneServerSpec;

/// Build the Drone server Deployment.
pub fn build_server_deployment(
    name: &str,
    namespace: &str,
    spec: &DroneServerSpec,
    image: &str,
    owner_ref: OwnerReference,
) -> Deployment {
    let env_vars = vec![
        secret_env(env::GITHUB_CLIENT_ID, &spec.github_client_id_secret),
        secret_env(env::GITHUB_CLIENT_SECRET, &spec.github_client_secret_secret),
        secret_env_with_key(env::RPC_SECRET, &spec.shared_secret.name, RPC_SECRET_KEY),
        plain_env(env::GITHUB_SERVER, &spec.github_server),
        plain_env(env::SERVER_HOST, &spec.server_host),
    ];

    let container = container("drone-server", image, env_vars, ports::SERVER);

    build_deployment(
        server_deployment_name(name),
        namespace,
        constants::defaults::SERVER_REPLICAS,
        server_selector(name),
        container,
        common_labels(name, values::COMPONENT_SERVER),
        owner_ref,
    )
}

/// Build the Drone runner Deployment, sized by `runnerReplicas`.
pub fn build_runner_deployment(
    name: &str,
    namespace: &str,
    spec: &DroneServerSpec,
    image: &str,
    owner_ref: OwnerReference,
) -> Deployment {
    let env_vars = vec![
        secret_env_with_key(env::RPC_SECRET, &spec.shared_secret.name, RPC_SECRET_KEY),
        plain_env(env::RPC_HOST, server_service_name(name)),
        plain_env(env::RPC_PROTO, constants::defaults::RPC_PROTO),
        plain_env(env::RUNNER_CAPACITY, spec.runner_capacity.to_string()),
    ];

    let container = container("drone-runner", image, env_vars, ports::RUNNER);

    build_deployment(
        runner_name(name),
        namespace,
        spec.runner_replicas,
        runner_selector(name),
        container,
        common_labels(name, values::COMPONENT_RUNNER),
        owner_ref,
    )
}

fn container(name: &str, image: &str, env: Vec<EnvVar>, port: i32) -> Container {
    Container {
        name: name.into(),
        image: Some(image.into()),
        env: Some(env),
        ports: Some(vec![ContainerPort {
            container_port: port,
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn build_deployment(
    deployment_name: String,
    namespace: &str,
    replicas: i32,
    selector: BTreeMap<String, String>,
    container: Container,
    labels: BTreeMap<String, String>,
    owner_ref: OwnerReference,
) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name),
            namespace: Some(namespace.into()),
            labels: Some(labels),
            owner_references: Some(vec![owner_ref]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
