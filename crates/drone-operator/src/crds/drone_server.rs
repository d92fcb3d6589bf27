use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{Condition, SecretRef};

/// Desired state of a Drone CI installation: one server and a pool of runners.
#[derive(CustomResource, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "drone.ocean.dev",
    version = "v1alpha1",
    kind = "DroneServer",
    namespaced,
    status = "DroneServerStatus",
    shortname = "ds",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Runners","type":"integer","jsonPath":".spec.runnerReplicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DroneServerSpec {
    /// Number of Drone runner replicas.
    #[schemars(range(min = 0))]
    pub runner_replicas: i32,

    /// Maximum concurrent pipelines per runner.
    #[schemars(range(min = 0))]
    pub runner_capacity: i32,

    /// Public host name of the Drone server, e.g. drone.example.com.
    pub server_host: String,

    /// GitHub server URL, e.g. https://github.com.
    pub github_server: String,

    /// Secret holding the GitHub OAuth client id.
    #[serde(rename = "githubClientIDSecret")]
    pub github_client_id_secret: SecretRef,

    /// Secret holding the GitHub OAuth client secret.
    pub github_client_secret_secret: SecretRef,

    /// Secret holding the RPC secret shared by server and runners.
    pub shared_secret: SecretRef,
}

/// Observed state of a DroneServer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DroneServerStatus {
    /// Current phase: Pending, Ready, Failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Last observed generation of the spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Name of an auto-generated shared secret, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_secret: Option<String>,

    /// Status conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Coarse lifecycle of a DroneServer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DronePhase {
    /// Resources converged, workloads not yet available.
    Pending,
    /// Resources converged and both workloads available.
    Ready,
    /// The last reconciliation pass failed.
    Failed,
}

impl DronePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DronePhase::Pending => "Pending",
            DronePhase::Ready => "Ready",
            DronePhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for DronePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DroneServerStatus {
    /// Status equality ignoring condition timestamps.
    pub fn same_state(&self, other: &DroneServerStatus) -> bool {
        self.phase == other.phase
            && self.observed_generation == other.observed_generation
            && self.generated_secret == other.generated_secret
            && self.conditions.len() == other.conditions.len()
            && self
                .conditions
                .iter()
                .zip(&other.conditions)
                .all(|(a, b)| a.same_state(b))
    }
}
