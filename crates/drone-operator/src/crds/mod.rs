pub mod common;
pub mod drone_server;

pub use common::{Condition, SecretRef};
pub use drone_server::{DronePhase, DroneServer, DroneServerSpec, DroneServerStatus};
