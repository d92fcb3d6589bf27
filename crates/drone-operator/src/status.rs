//! DroneServer status derived from the outcome of a reconciliation pass.

use k8s_openapi::api::apps::v1::Deployment;

use crate::crds::{Condition, DronePhase, DroneServer, DroneServerStatus};

const READY: &str = "Ready";

/// Whether a Deployment reports at least as many available replicas as it asks for.
pub fn deployment_available(dep: &Deployment) -> bool {
    let wanted = dep.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let available = dep
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);
    available >= wanted
}

/// Status after every managed object converged.
pub fn converged(ds: &DroneServer, workloads_available: bool, now: &str) -> DroneServerStatus {
    let (phase, condition_status, reason, message) = if workloads_available {
        (
            DronePhase::Ready,
            "True",
            "WorkloadsAvailable",
            "Drone server and runners are available".to_string(),
        )
    } else {
        (
            DronePhase::Pending,
            "False",
            "WorkloadsProgressing",
            "Waiting for Drone server and runners to become available".to_string(),
        )
    };
    build(ds, phase, condition_status, reason, message, now)
}

/// Status after a failed pass.
pub fn failed(ds: &DroneServer, error: &str, now: &str) -> DroneServerStatus {
    build(
        ds,
        DronePhase::Failed,
        "False",
        "ReconcileFailed",
        error.to_string(),
        now,
    )
}

fn build(
    ds: &DroneServer,
    phase: DronePhase,
    condition_status: &str,
    reason: &str,
    message: String,
    now: &str,
) -> DroneServerStatus {
    let previous = ds.status.as_ref();
    let previous_ready = previous.and_then(|s| s.conditions.iter().find(|c| c.type_ == READY));

    // keep the transition time while the condition status holds
    let last_transition_time = match previous_ready {
        Some(c) if c.status == condition_status => c.last_transition_time.clone(),
        _ => Some(now.to_string()),
    };

    DroneServerStatus {
        phase: Some(phase.to_string()),
        observed_generation: ds.metadata.generation,
        generated_secret: previous.and_then(|s| s.generated_secret.clone()),
        conditions: vec![Condition {
            type_: READY.into(),
            status: condition_status.into(),
            reason: Some(reason.into()),
            message: Some(message),
            last_transition_time,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::tests::sample_server;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};

    fn deployment(replicas: i32, available: Option<i32>) -> Deployment {
        Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            status: available.map(|a| DeploymentStatus {
                available_replicas: Some(a),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_deployment_available() {
        assert!(!deployment_available(&deployment(3, None)));
        assert!(!deployment_available(&deployment(3, Some(2))));
        assert!(deployment_available(&deployment(3, Some(3))));
        assert!(deployment_available(&deployment(0, None)));
    }

    #[test]
    fn test_converged_phases() {
        let ds = sample_server("ci", 1);
        let pending = converged(&ds, false, "t0");
        assert_eq!(pending.phase.as_deref(), Some("Pending"));
        assert_eq!(pending.observed_generation, Some(1));
        assert_eq!(pending.conditions[0].status, "False");

        let ready = converged(&ds, true, "t0");
        assert_eq!(ready.phase.as_deref(), Some("Ready"));
        assert_eq!(ready.conditions[0].reason.as_deref(), Some("WorkloadsAvailable"));
    }

    #[test]
    fn test_failed_carries_message() {
        let ds = sample_server("ci", 1);
        let status = failed(&ds, "boom", "t0");
        assert_eq!(status.phase.as_deref(), Some("Failed"));
        assert_eq!(status.conditions[0].message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_transition_time_kept_while_status_holds() {
        let mut ds = sample_server("ci", 1);
        ds.status = Some(converged(&ds, false, "t0"));

        let still_pending = converged(&ds, false, "t1");
        assert_eq!(still_pending.conditions[0].last_transition_time.as_deref(), Some("t0"));

        let failed_now = failed(&ds, "boom", "t1");
        assert_eq!(failed_now.conditions[0].last_transition_time.as_deref(), Some("t0"));

        let ready = converged(&ds, true, "t2");
        assert_eq!(ready.conditions[0].last_transition_time.as_deref(), Some("t2"));
    }
}
