//! In-memory cloud used by tests
//!
//! `FakeCloud` implements all three capabilities over a shared in-memory
//! state and records every call so tests can assert on what was (or was
//! not) sent to the platform. Cloning it yields another handle to the same
//! state.
//!
//! Behaviour worth knowing when writing tests:
//! - new servers start in `BUILD` and turn `ACTIVE` on the next
//!   `get_server`; new volumes start `creating` and turn `available` on the
//!   next `get_volume`. Scripted statuses take precedence.
//! - attaching a server to a bare network allocates an unnamed port on that
//!   network; deleting the server removes those ports and detaches named ones.
//! - `list_servers` filters names by substring, like Nova's regex filter.

use crate::capability::{CloudClients, CloudConnector, Compute, Network, Storage, unique_id};
use crate::error::{CloudError, Result};
use crate::model::{
    BlockDeviceSource, CreatePortRequest, CreateServerRequest, CreateVolumeRequest, NetworkAttachment,
    Port, PortListOptions, Server, ServerFault, ServerListOptions, ServerStatus, Subnet,
    UpdatePortRequest, UpdateVolumeRequest, Volume, VolumeListOptions, VolumeStatus,
};
use crate::recorder::ApiRecorder;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct FakeState {
    next_id: u64,
    servers: BTreeMap<String, Server>,
    /// server ID -> volumes deleted together with the server
    owned_volumes: HashMap<String, Vec<String>>,
    ports: BTreeMap<String, Port>,
    volumes: BTreeMap<String, Volume>,
    subnets: BTreeMap<String, Subnet>,
    images: Vec<(String, String)>,
    flavors: Vec<(String, String)>,
    networks: Vec<(String, String)>,
    security_groups: Vec<(String, String)>,
    server_statuses: VecDeque<ServerStatus>,
    volume_statuses: VecDeque<VolumeStatus>,
    failures: HashSet<String>,
    create_requests: Vec<CreateServerRequest>,
    calls: Vec<String>,
}

impl FakeState {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

/// In-memory implementation of [`Compute`], [`Network`] and [`Storage`]
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability clients backed by this fake
    pub fn clients(&self) -> CloudClients {
        CloudClients {
            compute: Arc::new(self.clone()),
            network: Arc::new(self.clone()),
            storage: Arc::new(self.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and fail it if a failure was injected for `op`
    fn enter(&self, op: &str, arg: &str) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        state.calls.push(format!("{}:{}", op, arg));
        if state.failures.contains(op) {
            return Err(CloudError::Api {
                status: 500,
                message: format!("injected failure in {}", op),
            });
        }
        Ok(state)
    }

    pub fn add_image(&self, name: &str, id: &str) {
        self.lock().images.push((name.to_string(), id.to_string()));
    }

    pub fn add_flavor(&self, name: &str, id: &str) {
        self.lock().flavors.push((name.to_string(), id.to_string()));
    }

    pub fn add_network(&self, name: &str, id: &str) {
        self.lock().networks.push((name.to_string(), id.to_string()));
    }

    pub fn add_security_group(&self, name: &str, id: &str) {
        self.lock()
            .security_groups
            .push((name.to_string(), id.to_string()));
    }

    pub fn add_subnet(&self, id: &str, network_id: &str) {
        self.lock().subnets.insert(
            id.to_string(),
            Subnet {
                id: id.to_string(),
                name: id.to_string(),
                network_id: network_id.to_string(),
                cidr: String::new(),
            },
        );
    }

    pub fn insert_server(&self, server: Server) {
        self.lock().servers.insert(server.id.clone(), server);
    }

    pub fn insert_port(&self, port: Port) {
        self.lock().ports.insert(port.id.clone(), port);
    }

    pub fn insert_volume(&self, volume: Volume) {
        self.lock().volumes.insert(volume.id.clone(), volume);
    }

    /// Statuses returned by successive `get_server` calls
    pub fn script_server_statuses(&self, statuses: impl IntoIterator<Item = ServerStatus>) {
        self.lock().server_statuses.extend(statuses);
    }

    /// Statuses returned by successive `get_volume` calls
    pub fn script_volume_statuses(&self, statuses: impl IntoIterator<Item = VolumeStatus>) {
        self.lock().volume_statuses.extend(statuses);
    }

    /// Make every call of `op` (a trait method name) fail with a 500
    pub fn fail_on(&self, op: &str) {
        self.lock().failures.insert(op.to_string());
    }

    pub fn clear_failure(&self, op: &str) {
        self.lock().failures.remove(op);
    }

    pub fn servers(&self) -> Vec<Server> {
        self.lock().servers.values().cloned().collect()
    }

    pub fn ports(&self) -> Vec<Port> {
        self.lock().ports.values().cloned().collect()
    }

    pub fn volumes(&self) -> Vec<Volume> {
        self.lock().volumes.values().cloned().collect()
    }

    /// Every call so far as `"op:argument"`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `op`
    pub fn call_count(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    /// Requests received by `create_server` and `boot_from_volume`
    pub fn create_requests(&self) -> Vec<CreateServerRequest> {
        self.lock().create_requests.clone()
    }

    fn launch(state: &mut FakeState, request: &CreateServerRequest) -> Result<Server> {
        let id = state.new_id("server");

        for attachment in &request.networks {
            match attachment {
                NetworkAttachment::Network { id: network_id } => {
                    let port_id = state.new_id("port");
                    state.ports.insert(
                        port_id.clone(),
                        Port {
                            id: port_id,
                            name: String::new(),
                            network_id: network_id.clone(),
                            device_id: id.clone(),
                            fixed_ips: Vec::new(),
                            allowed_address_pairs: Vec::new(),
                        },
                    );
                }
                NetworkAttachment::Port { port_id, .. } => {
                    let port = state.ports.get_mut(port_id).ok_or_else(|| CloudError::Api {
                        status: 400,
                        message: format!("port {} not found", port_id),
                    })?;
                    port.device_id = id.clone();
                }
            }
        }

        let server = Server {
            id: id.clone(),
            name: request.name.clone(),
            status: ServerStatus::Build,
            metadata: request.metadata.clone(),
            fault: None,
        };
        state.servers.insert(id, server.clone());
        state.create_requests.push(request.clone());
        Ok(server)
    }

    fn lookup(kind: &str, name: &str, entries: &[(String, String)]) -> Result<String> {
        unique_id(
            kind,
            name,
            entries
                .iter()
                .filter(|(n, _)| n == name)
                .map(|(_, id)| id.clone()),
        )
    }
}

#[async_trait]
impl Compute for FakeCloud {
    async fn get_server(&self, id: &str) -> Result<Server> {
        let mut guard = self.enter("get_server", id)?;
        let state = &mut *guard;
        let server = state
            .servers
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("server {}", id)))?;

        match state.server_statuses.pop_front() {
            Some(status) => {
                if status == ServerStatus::Error {
                    server.fault = Some(ServerFault {
                        code: Some(500),
                        message: "No valid host was found".to_string(),
                        details: None,
                    });
                }
                server.status = status;
            }
            None if server.status == ServerStatus::Build => server.status = ServerStatus::Active,
            None => {}
        }
        Ok(server.clone())
    }

    async fn list_servers(&self, opts: &ServerListOptions) -> Result<Vec<Server>> {
        let state = self.enter("list_servers", opts.name.as_deref().unwrap_or(""))?;
        Ok(state
            .servers
            .values()
            .filter(|s| opts.name.as_ref().is_none_or(|n| s.name.contains(n.as_str())))
            .cloned()
            .collect())
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        let mut state = self.enter("create_server", &request.name)?;
        if !request.block_devices.is_empty() {
            return Err(CloudError::InvalidRequest(
                "block devices require boot_from_volume".to_string(),
            ));
        }
        Self::launch(&mut state, request)
    }

    async fn boot_from_volume(&self, request: &CreateServerRequest) -> Result<Server> {
        let mut guard = self.enter("boot_from_volume", &request.name)?;
        let state = &mut *guard;
        if request.block_devices.is_empty() {
            return Err(CloudError::InvalidRequest(
                "boot from volume without block devices".to_string(),
            ));
        }

        let mut owned = Vec::new();
        for device in &request.block_devices {
            if device.source != BlockDeviceSource::Volume {
                continue;
            }
            let volume = state
                .volumes
                .get_mut(&device.uuid)
                .ok_or_else(|| CloudError::Api {
                    status: 400,
                    message: format!("volume {} not found", device.uuid),
                })?;
            if volume.status != VolumeStatus::Available {
                return Err(CloudError::Api {
                    status: 400,
                    message: format!("volume {} is {}", volume.id, volume.status),
                });
            }
            volume.status = VolumeStatus::InUse;
            if device.delete_on_termination {
                owned.push(volume.id.clone());
            }
        }

        let server = Self::launch(state, request)?;
        state.owned_volumes.insert(server.id.clone(), owned);
        Ok(server)
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        let mut guard = self.enter("delete_server", id)?;
        let state = &mut *guard;
        if state.servers.remove(id).is_none() {
            return Err(CloudError::NotFound(format!("server {}", id)));
        }

        state
            .ports
            .retain(|_, p| !(p.device_id == id && p.name.is_empty()));
        for port in state.ports.values_mut() {
            if port.device_id == id {
                port.device_id.clear();
            }
        }
        for volume_id in state.owned_volumes.remove(id).unwrap_or_default() {
            state.volumes.remove(&volume_id);
        }
        Ok(())
    }

    async fn image_id_from_name(&self, name: &str) -> Result<String> {
        let state = self.enter("image_id_from_name", name)?;
        Self::lookup("image", name, &state.images)
    }

    async fn flavor_id_from_name(&self, name: &str) -> Result<String> {
        let state = self.enter("flavor_id_from_name", name)?;
        Self::lookup("flavor", name, &state.flavors)
    }
}

#[async_trait]
impl Network for FakeCloud {
    async fn get_port(&self, id: &str) -> Result<Port> {
        let state = self.enter("get_port", id)?;
        state
            .ports
            .get(id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("port {}", id)))
    }

    async fn list_ports(&self, opts: &PortListOptions) -> Result<Vec<Port>> {
        let state = self.enter("list_ports", opts.device_id.as_deref().unwrap_or(""))?;
        Ok(state
            .ports
            .values()
            .filter(|p| opts.name.as_ref().is_none_or(|n| &p.name == n))
            .filter(|p| opts.device_id.as_ref().is_none_or(|d| &p.device_id == d))
            .filter(|p| opts.network_id.as_ref().is_none_or(|n| &p.network_id == n))
            .cloned()
            .collect())
    }

    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port> {
        let mut state = self.enter("create_port", &request.name)?;
        let id = state.new_id("port");
        let port = Port {
            id: id.clone(),
            name: request.name.clone(),
            network_id: request.network_id.clone(),
            device_id: String::new(),
            fixed_ips: request.fixed_ips.clone(),
            allowed_address_pairs: request.allowed_address_pairs.clone(),
        };
        state.ports.insert(id, port.clone());
        Ok(port)
    }

    async fn update_port(&self, id: &str, request: &UpdatePortRequest) -> Result<Port> {
        let mut state = self.enter("update_port", id)?;
        let port = state
            .ports
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("port {}", id)))?;
        if let Some(pairs) = &request.allowed_address_pairs {
            port.allowed_address_pairs = pairs.clone();
        }
        Ok(port.clone())
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        let mut state = self.enter("delete_port", id)?;
        state
            .ports
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CloudError::NotFound(format!("port {}", id)))
    }

    async fn network_id_from_name(&self, name: &str) -> Result<String> {
        let state = self.enter("network_id_from_name", name)?;
        Self::lookup("network", name, &state.networks)
    }

    async fn security_group_id_from_name(&self, name: &str) -> Result<String> {
        let state = self.enter("security_group_id_from_name", name)?;
        Self::lookup("security group", name, &state.security_groups)
    }

    async fn port_id_from_name(&self, name: &str) -> Result<String> {
        let state = self.enter("port_id_from_name", name)?;
        unique_id(
            "port",
            name,
            state
                .ports
                .values()
                .filter(|p| p.name == name)
                .map(|p| p.id.clone()),
        )
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        let state = self.enter("get_subnet", id)?;
        state
            .subnets
            .get(id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("subnet {}", id)))
    }
}

#[async_trait]
impl Storage for FakeCloud {
    async fn get_volume(&self, id: &str) -> Result<Volume> {
        let mut guard = self.enter("get_volume", id)?;
        let state = &mut *guard;
        let volume = state
            .volumes
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("volume {}", id)))?;

        match state.volume_statuses.pop_front() {
            Some(status) => volume.status = status,
            None if matches!(
                volume.status,
                VolumeStatus::Creating | VolumeStatus::Downloading
            ) =>
            {
                volume.status = VolumeStatus::Available
            }
            None => {}
        }
        Ok(volume.clone())
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume> {
        let mut state = self.enter("create_volume", &request.name)?;
        let id = state.new_id("volume");
        let volume = Volume {
            id: id.clone(),
            name: request.name.clone(),
            status: VolumeStatus::Creating,
            size: request.size,
            volume_type: request.volume_type.clone(),
        };
        state.volumes.insert(id, volume.clone());
        Ok(volume)
    }

    async fn delete_volume(&self, id: &str, _cascade: bool) -> Result<()> {
        let mut state = self.enter("delete_volume", id)?;
        match state.volumes.get(id) {
            None => Err(CloudError::NotFound(format!("volume {}", id))),
            Some(v) if v.status == VolumeStatus::InUse => Err(CloudError::Api {
                status: 400,
                message: format!("volume {} is attached", id),
            }),
            Some(_) => {
                state.volumes.remove(id);
                Ok(())
            }
        }
    }

    async fn list_volumes(&self, opts: &VolumeListOptions) -> Result<Vec<Volume>> {
        let state = self.enter("list_volumes", opts.name.as_deref().unwrap_or(""))?;
        Ok(state
            .volumes
            .values()
            .filter(|v| opts.name.as_ref().is_none_or(|n| &v.name == n))
            .cloned()
            .collect())
    }

    async fn update_volume(&self, id: &str, request: &UpdateVolumeRequest) -> Result<Volume> {
        let mut state = self.enter("update_volume", id)?;
        let volume = state
            .volumes
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("volume {}", id)))?;
        if let Some(name) = &request.name {
            volume.name = name.clone();
        }
        Ok(volume.clone())
    }

    async fn volume_id_from_name(&self, name: &str) -> Result<String> {
        let state = self.enter("volume_id_from_name", name)?;
        unique_id(
            "volume",
            name,
            state
                .volumes
                .values()
                .filter(|v| v.name == name)
                .map(|v| v.id.clone()),
        )
    }
}

#[async_trait]
impl CloudConnector for FakeCloud {
    fn name(&self) -> &str {
        "fake"
    }

    async fn connect(&self, _region: &str) -> Result<CloudClients> {
        Ok(self.clients())
    }
}

/// Recorder that keeps per-(provider, service) counts in memory
#[derive(Debug, Default)]
pub struct CountingRecorder {
    counts: Mutex<HashMap<(String, String), (u64, u64)>>,
}

impl CountingRecorder {
    pub fn requests(&self, provider: &str, service: &str) -> u64 {
        self.get(provider, service).0
    }

    pub fn failures(&self, provider: &str, service: &str) -> u64 {
        self.get(provider, service).1
    }

    fn get(&self, provider: &str, service: &str) -> (u64, u64) {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(provider.to_string(), service.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn bump(&self, provider: &str, service: &str, failed: bool) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let entry = counts
            .entry((provider.to_string(), service.to_string()))
            .or_default();
        if failed {
            entry.1 += 1;
        } else {
            entry.0 += 1;
        }
    }
}

impl ApiRecorder for CountingRecorder {
    fn record_request(&self, provider: &str, service: &str) {
        self.bump(provider, service, false);
    }

    fn record_failure(&self, provider: &str, service: &str) {
        self.bump(provider, service, true);
    }
}
