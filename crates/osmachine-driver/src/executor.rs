//! Machine lifecycle orchestration
//!
//! The executor keeps no state between calls. Every operation starts by
//! rediscovering the machine's server, port and boot volume by name (and
//! cluster/role tags), which makes create and delete safe to retry.

use crate::error::{DriverError, Result, ResultExt};
use crate::poller::{Observation, Poller};
use crate::provider_id::ProviderId;
use crate::tags::ClusterTags;
use crate::volume::BootDisk;
use osmachine_cloud::{
    BlockDevice, CloudClients, Compute, CreateServerRequest, Network, NetworkAttachment, Server,
    ServerListOptions, ServerStatus, Storage,
};
use osmachine_config::{DriverSettings, MachineProviderConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Create, delete and list machines of one machine class
pub struct Executor {
    pub(crate) compute: Arc<dyn Compute>,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) config: MachineProviderConfig,
    pub(crate) settings: DriverSettings,
    pub(crate) poller: Poller,
}

impl Executor {
    pub fn new(
        clients: CloudClients,
        config: MachineProviderConfig,
        settings: DriverSettings,
    ) -> Self {
        let poller = Poller::new(settings.poll_interval(), CancellationToken::new());
        Self {
            compute: clients.compute,
            network: clients.network,
            storage: clients.storage,
            config,
            settings,
            poller,
        }
    }

    /// Abort polling when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.poller = Poller::new(self.settings.poll_interval(), cancel);
        self
    }

    pub fn config(&self) -> &MachineProviderConfig {
        &self.config
    }

    /// Create the machine, or adopt an existing server of the same name
    ///
    /// Returns the provider ID. A failure after provisioning started removes
    /// what was created before the error is returned.
    pub async fn create_machine(&self, name: &str, user_data: &[u8]) -> Result<String> {
        let server = match self.find_server_by_name(name).await {
            Ok(server) => {
                info!("Found existing server [Name={}, ID={}]", name, server.id);
                server
            }
            Err(e) if e.is_not_found() => match self.provision(name, user_data).await {
                Ok(server) => server,
                Err(e) => return Err(self.rollback(name, e).await),
            },
            Err(e) => return Err(e),
        };

        if let Err(e) = self.converge(&server.id).await {
            return Err(self.rollback(name, e).await);
        }

        Ok(ProviderId::new(&self.config.region, &server.id).to_string())
    }

    /// Delete the machine and the port and boot volume it owns
    ///
    /// A machine that does not exist is already deleted.
    pub async fn delete_machine(&self, name: &str, provider_id: Option<&str>) -> Result<()> {
        let found = match provider_id.filter(|id| !id.is_empty()) {
            Some(provider_id) => {
                let provider_id: ProviderId = provider_id.parse()?;
                self.find_server_by_id(&provider_id.server_id).await
            }
            None => self.find_server_by_name(name).await,
        };

        match found {
            Ok(server) => self.remove_server(&server).await?,
            Err(e) if e.is_not_found() => {
                debug!("Server [Name={}] not found, nothing to delete", name);
            }
            Err(e) => return Err(e),
        }

        if BootDisk::from_config(&self.config).is_persistent() {
            self.delete_boot_volume(name).await?;
        }
        if self.config.is_user_managed_network() {
            self.delete_port(name).await?;
        }
        Ok(())
    }

    /// Map of provider ID to name for every server of this cluster and role
    pub async fn list_machines(&self) -> Result<BTreeMap<String, String>> {
        let tags = ClusterTags::derive(&self.config.tags)?;
        let servers = self
            .compute
            .list_servers(&ServerListOptions::default())
            .await
            .context("failed to list servers")?;

        Ok(servers
            .into_iter()
            .filter(|s| tags.matches(&s.metadata))
            .map(|s| (ProviderId::new(&self.config.region, &s.id).to_string(), s.name))
            .collect())
    }

    /// The single server with this exact name and the cluster/role tags
    pub async fn find_server_by_name(&self, name: &str) -> Result<Server> {
        let tags = ClusterTags::derive(&self.config.tags)?;
        let listed = self
            .compute
            .list_servers(&ServerListOptions::by_name(name))
            .await
            .with_context(|| format!("failed to list servers [Name={}]", name))?;

        let mut matching: Vec<Server> = listed
            .into_iter()
            .filter(|s| s.name == name && tags.matches(&s.metadata))
            .collect();

        match matching.len() {
            0 => Err(DriverError::NotFound(format!("server [Name={}]", name))),
            1 => Ok(matching.remove(0)),
            n => Err(DriverError::MultipleFound(format!(
                "{} servers [Name={}] carry the cluster/role tags",
                n, name
            ))),
        }
    }

    /// Fetch a server by ID; a server without the cluster/role tags counts as absent
    pub async fn find_server_by_id(&self, server_id: &str) -> Result<Server> {
        let tags = ClusterTags::derive(&self.config.tags)?;
        let server = match self.compute.get_server(server_id).await {
            Ok(server) => server,
            Err(e) if e.is_not_found() => {
                return Err(DriverError::NotFound(format!("server [ID={}]", server_id)));
            }
            Err(e) => return Err(e.into()),
        };

        if !tags.matches(&server.metadata) {
            warn!(
                "Server [ID={}] found, but cluster/role tags are missing or not matching",
                server_id
            );
            return Err(DriverError::NotFound(format!("server [ID={}]", server_id)));
        }
        Ok(server)
    }

    async fn provision(&self, name: &str, user_data: &[u8]) -> Result<Server> {
        let networks = self
            .resolve_server_networks(name)
            .await
            .with_context(|| format!("failed to resolve networks of server [Name={}]", name))?;

        self.deploy(name, user_data, networks)
            .await
            .with_context(|| format!("failed to deploy server [Name={}]", name))
    }

    async fn deploy(
        &self,
        name: &str,
        user_data: &[u8],
        networks: Vec<NetworkAttachment>,
    ) -> Result<Server> {
        let image_ref = self.resolve_image().await?;
        let flavor_ref = self
            .compute
            .flavor_id_from_name(&self.config.flavor_name)
            .await
            .with_context(|| format!("failed to resolve flavor {:?}", self.config.flavor_name))?;

        let mut request = CreateServerRequest {
            name: name.to_string(),
            flavor_ref,
            image_ref,
            networks,
            security_groups: self.config.security_groups.clone(),
            metadata: self.config.tags.clone(),
            user_data: user_data.to_vec(),
            availability_zone: self.config.availability_zone().map(str::to_string),
            config_drive: self.config.use_config_drive,
            key_name: self.config.key_name.clone(),
            server_group: self.config.server_group_id.clone(),
            block_devices: Vec::new(),
        };

        let server = match BootDisk::from_config(&self.config) {
            BootDisk::Ephemeral => {
                info!("Creating server [Name={}]", name);
                self.compute.create_server(&request).await?
            }
            BootDisk::InlineVolume { size } => {
                info!("Creating server [Name={}] with a {} GiB root volume", name, size);
                request.block_devices = vec![BlockDevice::from_image(&request.image_ref, size)];
                self.compute.boot_from_volume(&request).await?
            }
            BootDisk::PersistentVolume { size, volume_type } => {
                self.boot_from_persistent_volume(request, size, volume_type)
                    .await?
            }
        };

        info!("Server [Name={}, ID={}] created", name, server.id);
        Ok(server)
    }

    async fn resolve_image(&self) -> Result<String> {
        if let Some(image_id) = &self.config.image_id {
            return Ok(image_id.clone());
        }
        let image_name = self
            .config
            .image_name
            .as_deref()
            .ok_or_else(|| DriverError::InvalidConfig("imageID or imageName must be set".into()))?;

        self.compute
            .image_id_from_name(image_name)
            .await
            .with_context(|| format!("failed to resolve image {:?}", image_name))
    }

    /// Wait for the server to become active and open its pod network ports
    async fn converge(&self, server_id: &str) -> Result<()> {
        self.poller
            .wait(
                "server",
                server_id,
                &[ServerStatus::Build],
                &[ServerStatus::Active],
                self.settings.server_create_timeout(),
                || self.observe_server(server_id),
            )
            .await
            .with_context(|| format!("error waiting for server [ID={}] to become active", server_id))?;

        self.patch_ports_for_pod_network(server_id)
            .await
            .with_context(|| format!("failed to patch ports of server [ID={}]", server_id))
    }

    /// Delete the server and wait until it is gone
    async fn remove_server(&self, server: &Server) -> Result<()> {
        info!("Deleting server [Name={}, ID={}]", server.name, server.id);
        match self.compute.delete_server(&server.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(DriverError::from(e)
                    .context(format!("failed to delete server [ID={}]", server.id)));
            }
        }

        self.poller
            .wait(
                "server",
                &server.id,
                &[],
                &[ServerStatus::Deleted],
                self.settings.server_delete_timeout(),
                || self.observe_server(&server.id),
            )
            .await
            .with_context(|| format!("error waiting for server [ID={}] to be deleted", server.id))
    }

    async fn observe_server(&self, server_id: &str) -> Result<Option<Observation<ServerStatus>>> {
        match self.compute.get_server(server_id).await {
            Ok(server) => Ok(Some(Observation {
                status: server.status,
                fault: server.fault.map(|f| f.to_string()),
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of everything a failed create may have left behind
    async fn rollback(&self, name: &str, original: DriverError) -> DriverError {
        warn!(
            "Deleting server [Name={}] after unsuccessful create: {}",
            name, original
        );
        let mut cleanup = Vec::new();

        match self.find_server_by_name(name).await {
            Ok(server) => {
                if let Err(e) = self.remove_server(&server).await {
                    cleanup.push(e);
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => cleanup.push(e),
        }

        if BootDisk::from_config(&self.config).is_persistent() {
            if let Err(e) = self.delete_boot_volume(name).await {
                cleanup.push(e);
            }
        }
        if self.config.is_user_managed_network() {
            if let Err(e) = self.delete_port(name).await {
                cleanup.push(e);
            }
        }

        for e in &cleanup {
            tracing::error!("Cleanup of machine [Name={}] failed: {}", name, e);
        }
        original.with_cleanup(cleanup)
    }
}
