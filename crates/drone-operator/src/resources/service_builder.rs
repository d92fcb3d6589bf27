use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

use super::{common_labels, runner_name, runner_selector, server_selector, server_service_name};
use crate::constants::{ports, values};

/// Build the Service in front of the Drone server.
pub fn build_server_service(name: &str, namespace: &str, owner_ref: OwnerReference) -> Service {
    build_service(
        server_service_name(name),
        namespace,
        server_selector(name),
        ports::SERVER,
        common_labels(name, values::COMPONENT_SERVER),
        owner_ref,
    )
}

/// Build the Service in front of the runner pool.
pub fn build_runner_service(name: &str, namespace: &str, owner_ref: OwnerReference) -> Service {
    build_service(
        runner_name(name),
        namespace,
        runner_selector(name),
        ports::RUNNER,
        common_labels(name, values::COMPONENT_RUNNER),
        owner_ref,
    )
}

fn build_service(
    service_name: String,
    namespace: &str,
    selector: BTreeMap<String, String>,
    port: i32,
    labels: BTreeMap<String, String>,
    owner_ref: OwnerReference,
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(service_name),
            namespace: Some(namespace.into()),
            labels: Some(labels),
            owner_references: Some(vec![owner_ref]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
