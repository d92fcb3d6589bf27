//! Print the DroneServer CRD as YAML.

use anyhow::Result;
use kube::CustomResourceExt;

use drone_operator::crds::DroneServer;

fn main() -> Result<()> {
    let crd = DroneServer::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
