use crate::errors::Error;
use kube::Client;
use tracing::info;

pub mod hostedcluster;
pub mod hostedcontrolplane;
pub mod nodepool;
pub mod platform;
pub mod proxy;

/// Install or update the CRDs served by this controller and wait for them to be accepted
pub async fn create_all(client: Client) -> Result<(), Error> {
    info!("Creating CRDs");
    hostedcontrolplane::create(client.clone()).await?;
    hostedcluster::create(client.clone()).await?;
    nodepool::create(client).await?;
    Ok(())
}
