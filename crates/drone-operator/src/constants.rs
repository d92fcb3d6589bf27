/// Kubernetes label keys following the app.kubernetes.io convention.
pub mod labels {
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const INSTANCE: &str = "app.kubernetes.io/instance";
    pub const COMPONENT: &str = "app.kubernetes.io/component";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";

    /// Selector key shared by a workload's pods and the Service routing to them.
    pub const APP: &str = "app";
}

/// Label values.
pub mod values {
    pub const APP_NAME: &str = "drone";
    pub const MANAGED_BY: &str = "drone-operator";
    pub const COMPONENT_SERVER: &str = "server";
    pub const COMPONENT_RUNNER: &str = "runner";
}

/// Name suffixes of managed resources.
pub mod suffixes {
    pub const SERVER_DEPLOYMENT: &str = "-deployment";
    pub const RUNNER: &str = "-runner";
}

/// Container and Service ports.
pub mod ports {
    pub const SERVER: i32 = 80;
    pub const RUNNER: i32 = 3000;
}

/// Environment variable names understood by the Drone images.
pub mod env {
    pub const GITHUB_CLIENT_ID: &str = "DRONE_GITHUB_CLIENT_ID";
    pub const GITHUB_CLIENT_SECRET: &str = "DRONE_GITHUB_CLIENT_SECRET";
    pub const GITHUB_SERVER: &str = "DRONE_GITHUB_SERVER";
    pub const SERVER_HOST: &str = "DRONE_SERVER_HOST";
    pub const RPC_SECRET: &str = "DRONE_RPC_SECRET";
    pub const RPC_HOST: &str = "DRONE_RPC_HOST";
    pub const RPC_PROTO: &str = "DRONE_RPC_PROTO";
    pub const RUNNER_CAPACITY: &str = "DRONE_RUNNER_CAPACITY";
}

/// Key inside the shared secret that holds the RPC secret.
pub const RPC_SECRET_KEY: &str = "DRONE_RPC_SECRET";

/// Default resource values.
pub mod defaults {
    pub const SERVER_IMAGE: &str = "drone/drone:2";
    pub const RUNNER_IMAGE: &str = "drone/drone-runner-docker:1";
    pub const SERVER_REPLICAS: i32 = 1;
    pub const RPC_PROTO: &str = "http";

    /// Requeue and deadline intervals in seconds.
    pub const ERROR_REQUEUE_SECS: u64 = 30;
    pub const RECONCILE_TIMEOUT_SECS: u64 = 30;
}

/// Field manager used for status patches.
pub const FIELD_MANAGER: &str = "drone-operator";
