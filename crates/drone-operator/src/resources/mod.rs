//! Desired-state construction for a DroneServer.
//!
//! Everything here is pure: the same DroneServer and images always produce
//! the same four objects, which is what lets the reconciler re-run freely.

pub mod deployment_builder;
pub mod secret_ref;
pub mod service_builder;

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::constants::{self, labels, suffixes, values};
use crate::crds::DroneServer;

/// Container images used for the managed workloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Images {
    pub server: String,
    pub runner: String,
}

impl Default for Images {
    fn default() -> Self {
        Self {
            server: constants::defaults::SERVER_IMAGE.into(),
            runner: constants::defaults::RUNNER_IMAGE.into(),
        }
    }
}

/// The four objects a DroneServer owns, in convergence order.
#[derive(Clone, Debug, PartialEq)]
pub struct DesiredState {
    pub server_deployment: Deployment,
    pub runner_deployment: Deployment,
    pub server_service: Service,
    pub runner_service: Service,
}

impl DesiredState {
    /// Build the desired objects for `ds`.
    pub fn build(ds: &DroneServer, images: &Images) -> Self {
        let name = ds.name_any();
        let namespace = ds.namespace().unwrap_or_else(|| "default".into());
        let owner_ref = owner_reference(ds);

        Self {
            server_deployment: deployment_builder::build_server_deployment(
                &name,
                &namespace,
                &ds.spec,
                &images.server,
                owner_ref.clone(),
            ),
            runner_deployment: deployment_builder::build_runner_deployment(
                &name,
                &namespace,
                &ds.spec,
                &images.runner,
                owner_ref.clone(),
            ),
            server_service: service_builder::build_server_service(
                &name,
                &namespace,
                owner_ref.clone(),
            ),
            runner_service: service_builder::build_runner_service(&name, &namespace, owner_ref),
        }
    }
}

pub fn server_deployment_name(name: &str) -> String {
    format!("{name}{}", suffixes::SERVER_DEPLOYMENT)
}

pub fn runner_name(name: &str) -> String {
    format!("{name}{}", suffixes::RUNNER)
}

pub fn server_service_name(name: &str) -> String {
    name.to_string()
}

/// Pod selector for the server workload and its Service.
pub fn server_selector(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(labels::APP.into(), name.into())])
}

/// Pod selector for the runner workload and its Service.
pub fn runner_selector(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(labels::APP.into(), runner_name(name))])
}

/// Metadata labels stamped on every managed object.
pub fn common_labels(name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::NAME.into(), values::APP_NAME.into()),
        (labels::INSTANCE.into(), name.into()),
        (labels::COMPONENT.into(), component.into()),
        (labels::MANAGED_BY.into(), values::MANAGED_BY.into()),
    ])
}

/// Controller owner reference pointing back at the DroneServer.
///
/// Kubernetes garbage-collects owned objects when the DroneServer goes away,
/// and the controller watches owned objects to re-trigger on drift.
pub fn owner_reference(ds: &DroneServer) -> OwnerReference {
    OwnerReference {
        api_version: DroneServer::api_version(&()).to_string(),
        kind: DroneServer::kind(&()).to_string(),
        name: ds.name_any(),
        uid: ds.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}
