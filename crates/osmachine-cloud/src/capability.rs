//! Capability interfaces over the cloud platform
//!
//! The driver talks to the cloud through three independent traits so that
//! each service can be substituted (or faked) on its own.

use crate::error::{CloudError, Result};
use crate::model::{
    CreatePortRequest, CreateServerRequest, CreateVolumeRequest, Port, PortListOptions, Server,
    ServerListOptions, Subnet, UpdatePortRequest, UpdateVolumeRequest, Volume, VolumeListOptions,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Compute service (servers, images, flavors)
#[async_trait]
pub trait Compute: Send + Sync {
    async fn get_server(&self, id: &str) -> Result<Server>;

    async fn list_servers(&self, opts: &ServerListOptions) -> Result<Vec<Server>>;

    /// Create a server booting from an ephemeral disk carved from the image
    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server>;

    /// Create a server whose root disk is described by `request.block_devices`
    async fn boot_from_volume(&self, request: &CreateServerRequest) -> Result<Server>;

    async fn delete_server(&self, id: &str) -> Result<()>;

    async fn image_id_from_name(&self, name: &str) -> Result<String>;

    async fn flavor_id_from_name(&self, name: &str) -> Result<String>;
}

/// Network service (ports, networks, subnets, security groups)
#[async_trait]
pub trait Network: Send + Sync {
    async fn get_port(&self, id: &str) -> Result<Port>;

    async fn list_ports(&self, opts: &PortListOptions) -> Result<Vec<Port>>;

    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port>;

    async fn update_port(&self, id: &str, request: &UpdatePortRequest) -> Result<Port>;

    async fn delete_port(&self, id: &str) -> Result<()>;

    async fn network_id_from_name(&self, name: &str) -> Result<String>;

    async fn security_group_id_from_name(&self, name: &str) -> Result<String>;

    async fn port_id_from_name(&self, name: &str) -> Result<String>;

    async fn get_subnet(&self, id: &str) -> Result<Subnet>;
}

/// Block-storage service (volumes)
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_volume(&self, id: &str) -> Result<Volume>;

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume>;

    /// Delete a volume; `cascade` also removes its snapshots
    async fn delete_volume(&self, id: &str, cascade: bool) -> Result<()>;

    async fn list_volumes(&self, opts: &VolumeListOptions) -> Result<Vec<Volume>>;

    async fn update_volume(&self, id: &str, request: &UpdateVolumeRequest) -> Result<Volume>;

    async fn volume_id_from_name(&self, name: &str) -> Result<String>;
}

/// One region's worth of capability clients
#[derive(Clone)]
pub struct CloudClients {
    pub compute: Arc<dyn Compute>,
    pub network: Arc<dyn Network>,
    pub storage: Arc<dyn Storage>,
}

/// Produces capability clients scoped to a region
#[async_trait]
pub trait CloudConnector: Send + Sync {
    /// Returns the provider name (e.g. "openstack")
    fn name(&self) -> &str;

    async fn connect(&self, region: &str) -> Result<CloudClients>;
}

/// Resolve a name lookup result to exactly one ID
///
/// Zero candidates is `NotFound`, more than one is `MultipleFound`; the
/// first match is never picked silently.
pub fn unique_id<I>(kind: &str, name: &str, ids: I) -> Result<String>
where
    I: IntoIterator<Item = String>,
{
    let mut ids = ids.into_iter();
    let first = ids
        .next()
        .ok_or_else(|| CloudError::NotFound(format!("{} [Name={:?}]", kind, name)))?;

    let extra = ids.count();
    if extra > 0 {
        return Err(CloudError::MultipleFound(format!(
            "{} [Name={:?}] matches {} resources",
            kind,
            name,
            extra + 1
        )));
    }

    Ok(first)
}
