use std::time::Duration;

use clap::Parser;

use crate::constants::defaults;
use crate::reconciler::ReconcilerSettings;
use crate::resources::Images;
use crate::telemetry::LogFormat;

/// Operator configuration, from flags or environment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "drone-operator",
    about = "Kubernetes operator for Drone CI servers and runner pools",
    version
)]
pub struct OperatorConfig {
    /// Namespace to watch (default: all namespaces)
    #[arg(long, env = "DRONE_OPERATOR_NAMESPACE")]
    pub namespace: Option<String>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, env = "DRONE_OPERATOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "DRONE_OPERATOR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Bind address for /metrics, /healthz and /readyz
    #[arg(long, env = "DRONE_OPERATOR_METRICS_ADDR", default_value = "0.0.0.0:8080")]
    pub metrics_addr: String,

    /// Drone server image
    #[arg(long, env = "DRONE_SERVER_IMAGE", default_value = defaults::SERVER_IMAGE)]
    pub server_image: String,

    /// Drone runner image
    #[arg(long, env = "DRONE_RUNNER_IMAGE", default_value = defaults::RUNNER_IMAGE)]
    pub runner_image: String,

    /// Delay before retrying a failed reconciliation (seconds)
    #[arg(
        long,
        env = "DRONE_OPERATOR_ERROR_REQUEUE_SECS",
        default_value_t = defaults::ERROR_REQUEUE_SECS
    )]
    pub error_requeue_secs: u64,

    /// Periodic resync after a successful reconciliation (seconds); off when unset
    #[arg(long, env = "DRONE_OPERATOR_RESYNC_SECS")]
    pub resync_secs: Option<u64>,

    /// Deadline for one reconciliation pass (seconds)
    #[arg(
        long,
        env = "DRONE_OPERATOR_RECONCILE_TIMEOUT_SECS",
        default_value_t = defaults::RECONCILE_TIMEOUT_SECS
    )]
    pub reconcile_timeout_secs: u64,
}

impl OperatorConfig {
    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            images: Images {
                server: self.server_image.clone(),
                runner: self.runner_image.clone(),
            },
            resync: self.resync_secs.map(Duration::from_secs),
            timeout: Duration::from_secs(self.reconcile_timeout_secs),
        }
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}
