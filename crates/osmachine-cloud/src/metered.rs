//! Capability wrappers that report every call to an [`ApiRecorder`]

use crate::capability::{Compute, Network, Storage};
use crate::error::Result;
use crate::model::{
    CreatePortRequest, CreateServerRequest, CreateVolumeRequest, Port, PortListOptions, Server,
    ServerListOptions, Subnet, UpdatePortRequest, UpdateVolumeRequest, Volume, VolumeListOptions,
};
use crate::recorder::ApiRecorder;
use async_trait::async_trait;
use std::sync::Arc;

pub const PROVIDER_LABEL: &str = "openstack";
pub const COMPUTE_SERVICE: &str = "nova";
pub const NETWORK_SERVICE: &str = "neutron";
pub const STORAGE_SERVICE: &str = "cinder";

/// Wraps a capability client and counts its calls
///
/// A not-found answer counts as a request but not as a failure: the
/// round trip worked and the caller decides what absence means.
pub struct Metered<T> {
    inner: T,
    service: &'static str,
    recorder: Arc<dyn ApiRecorder>,
}

impl<T> Metered<T> {
    pub fn new(inner: T, service: &'static str, recorder: Arc<dyn ApiRecorder>) -> Self {
        Self {
            inner,
            service,
            recorder,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn observe<R>(&self, result: Result<R>) -> Result<R> {
        self.recorder.record_request(PROVIDER_LABEL, self.service);
        if let Err(e) = &result {
            if !e.is_not_found() {
                tracing::debug!("{} call failed: {}", self.service, e);
                self.recorder.record_failure(PROVIDER_LABEL, self.service);
            }
        }
        result
    }
}

#[async_trait]
impl<T: Compute> Compute for Metered<T> {
    async fn get_server(&self, id: &str) -> Result<Server> {
        self.observe(self.inner.get_server(id).await)
    }

    async fn list_servers(&self, opts: &ServerListOptions) -> Result<Vec<Server>> {
        self.observe(self.inner.list_servers(opts).await)
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        self.observe(self.inner.create_server(request).await)
    }

    async fn boot_from_volume(&self, request: &CreateServerRequest) -> Result<Server> {
        self.observe(self.inner.boot_from_volume(request).await)
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        self.observe(self.inner.delete_server(id).await)
    }

    async fn image_id_from_name(&self, name: &str) -> Result<String> {
        self.observe(self.inner.image_id_from_name(name).await)
    }

    async fn flavor_id_from_name(&self, name: &str) -> Result<String> {
        self.observe(self.inner.flavor_id_from_name(name).await)
    }
}

#[async_trait]
impl<T: Network> Network for Metered<T> {
    async fn get_port(&self, id: &str) -> Result<Port> {
        self.observe(self.inner.get_port(id).await)
    }

    async fn list_ports(&self, opts: &PortListOptions) -> Result<Vec<Port>> {
        self.observe(self.inner.list_ports(opts).await)
    }

    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port> {
        self.observe(self.inner.create_port(request).await)
    }

    async fn update_port(&self, id: &str, request: &UpdatePortRequest) -> Result<Port> {
        self.observe(self.inner.update_port(id, request).await)
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        self.observe(self.inner.delete_port(id).await)
    }

    async fn network_id_from_name(&self, name: &str) -> Result<String> {
        self.observe(self.inner.network_id_from_name(name).await)
    }

    async fn security_group_id_from_name(&self, name: &str) -> Result<String> {
        self.observe(self.inner.security_group_id_from_name(name).await)
    }

    async fn port_id_from_name(&self, name: &str) -> Result<String> {
        self.observe(self.inner.port_id_from_name(name).await)
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        self.observe(self.inner.get_subnet(id).await)
    }
}

#[async_trait]
impl<T: Storage> Storage for Metered<T> {
    async fn get_volume(&self, id: &str) -> Result<Volume> {
        self.observe(self.inner.get_volume(id).await)
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume> {
        self.observe(self.inner.create_volume(request).await)
    }

    async fn delete_volume(&self, id: &str, cascade: bool) -> Result<()> {
        self.observe(self.inner.delete_volume(id, cascade).await)
    }

    async fn list_volumes(&self, opts: &VolumeListOptions) -> Result<Vec<Volume>> {
        self.observe(self.inner.list_volumes(opts).await)
    }

    async fn update_volume(&self, id: &str, request: &UpdateVolumeRequest) -> Result<Volume> {
        self.observe(self.inner.update_volume(id, request).await)
    }

    async fn volume_id_from_name(&self, name: &str) -> Result<String> {
        self.observe(self.inner.volume_id_from_name(name).await)
    }
}
