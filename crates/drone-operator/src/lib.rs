//! Drone CI Kubernetes operator.
//!
//! Keeps a Drone server Deployment, a runner Deployment and their Services
//! converged to a `DroneServer` custom resource.

pub mod config;
pub mod constants;
pub mod controllers;
pub mod converge;
pub mod crds;
pub mod error;
pub mod metrics;
pub mod reconciler;
pub mod resources;
pub mod status;
pub mod store;
pub mod telemetry;

pub use crds::DroneServer;
pub use reconciler::{Reconciler, ReconcilerSettings};
