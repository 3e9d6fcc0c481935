//! Network attachment, the managed port and pod network address pairs

use crate::error::{DriverError, Result, ResultExt};
use crate::executor::Executor;
use osmachine_cloud::{
    AddressPair, CreatePortRequest, FixedIp, NetworkAttachment, PortListOptions, UpdatePortRequest,
};
use osmachine_config::NetworkMode;
use std::collections::HashSet;
use tracing::{debug, info};

impl Executor {
    /// Networks the new server is attached to, in configuration order
    pub(crate) async fn resolve_server_networks(
        &self,
        name: &str,
    ) -> Result<Vec<NetworkAttachment>> {
        match self.config.network_mode() {
            NetworkMode::ManagedPort {
                network_id,
                subnet_ids,
            } => {
                for subnet_id in &subnet_ids {
                    let subnet = self
                        .network
                        .get_subnet(subnet_id)
                        .await
                        .with_context(|| format!("failed to get subnet [ID={}]", subnet_id))?;
                    if subnet.network_id != network_id {
                        return Err(DriverError::InvalidConfig(format!(
                            "subnet [ID={}] belongs to network {}, not {}",
                            subnet_id, subnet.network_id, network_id
                        )));
                    }
                }

                let port_id = self.get_or_create_port(name, network_id, &subnet_ids).await?;
                Ok(vec![NetworkAttachment::Port {
                    network_id: network_id.to_string(),
                    port_id,
                }])
            }
            NetworkMode::Direct { network_id } => Ok(vec![NetworkAttachment::Network {
                id: network_id.to_string(),
            }]),
            NetworkMode::Named(networks) => {
                let mut attachments = Vec::with_capacity(networks.len());
                for network in networks {
                    let id = match network.id.as_deref().filter(|id| !id.is_empty()) {
                        Some(id) => id.to_string(),
                        None => self.network_id_from_name(network.name.as_deref()).await?,
                    };
                    attachments.push(NetworkAttachment::Network { id });
                }
                Ok(attachments)
            }
        }
    }

    async fn network_id_from_name(&self, name: Option<&str>) -> Result<String> {
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DriverError::InvalidConfig("network needs an id or a name".into()))?;
        self.network
            .network_id_from_name(name)
            .await
            .with_context(|| format!("failed to resolve network {:?}", name))
    }

    /// ID of the port named `name`, created on the configured subnets if missing
    async fn get_or_create_port(
        &self,
        name: &str,
        network_id: &str,
        subnet_ids: &[String],
    ) -> Result<String> {
        match self.network.port_id_from_name(name).await {
            Ok(port_id) => {
                debug!("Found port [Name={}, ID={}], skipping creation", name, port_id);
                return Ok(port_id);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(DriverError::from(e).context(format!("error fetching port [Name={}]", name)));
            }
        }

        let mut security_groups = Vec::with_capacity(self.config.security_groups.len());
        for group in &self.config.security_groups {
            let id = self
                .network
                .security_group_id_from_name(group)
                .await
                .with_context(|| format!("failed to resolve security group {:?}", group))?;
            security_groups.push(id);
        }

        info!("Creating port [Name={}] on network {}", name, network_id);
        let port = self
            .network
            .create_port(&CreatePortRequest {
                name: name.to_string(),
                network_id: network_id.to_string(),
                fixed_ips: subnet_ids.iter().map(FixedIp::in_subnet).collect(),
                allowed_address_pairs: self
                    .config
                    .pod_network_cidrs()
                    .into_iter()
                    .map(AddressPair::new)
                    .collect(),
                security_groups,
            })
            .await
            .with_context(|| format!("failed to create port [Name={}]", name))?;

        Ok(port.id)
    }

    /// Delete the port named `name`; a missing port is already deleted
    pub(crate) async fn delete_port(&self, name: &str) -> Result<()> {
        let port_id = match self.network.port_id_from_name(name).await {
            Ok(port_id) => port_id,
            Err(e) if e.is_not_found() => {
                debug!("Port [Name={}] not found, nothing to delete", name);
                return Ok(());
            }
            Err(e) => {
                return Err(DriverError::from(e).context(format!("error deleting port [Name={}]", name)));
            }
        };

        info!("Deleting port [Name={}, ID={}]", name, port_id);
        match self.network.delete_port(&port_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(DriverError::from(e).context(format!("failed to delete port [ID={}]", port_id))),
        }
    }

    /// Allow pod network traffic on the server's ports in pod networks
    pub(crate) async fn patch_ports_for_pod_network(&self, server_id: &str) -> Result<()> {
        let ports = self
            .network
            .list_ports(&PortListOptions::by_device(server_id))
            .await
            .context("failed to list ports")?;
        if ports.is_empty() {
            return Err(DriverError::Internal(format!(
                "got an empty port list for server [ID={}]",
                server_id
            )));
        }

        let cidrs = self.config.pod_network_cidrs();
        if cidrs.is_empty() {
            return Ok(());
        }
        let pod_networks = self.resolve_pod_network_ids().await?;

        for port in ports.iter().filter(|p| pod_networks.contains(&p.network_id)) {
            if port.allows_all(&cidrs) {
                debug!("Port [ID={}] already allows the pod network, skipping update", port.id);
                continue;
            }

            info!("Allowing pod network on port [ID={}]", port.id);
            let pairs = cidrs.iter().map(AddressPair::new).collect();
            self.network
                .update_port(
                    &port.id,
                    &UpdatePortRequest {
                        allowed_address_pairs: Some(pairs),
                    },
                )
                .await
                .with_context(|| {
                    format!("failed to update allowed address pairs of port [ID={}]", port.id)
                })?;
        }
        Ok(())
    }

    /// Networks that carry pod traffic
    ///
    /// An explicit network ID is the pod network; otherwise the networks
    /// flagged as pod networks are.
    pub(crate) async fn resolve_pod_network_ids(&self) -> Result<HashSet<String>> {
        if let Some(network_id) = self.config.network_id.as_deref() {
            return Ok(HashSet::from([network_id.to_string()]));
        }

        let mut ids = HashSet::new();
        for network in self.config.networks.iter().filter(|n| n.pod_network) {
            let id = match network.id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) => id.to_string(),
                None => self.network_id_from_name(network.name.as_deref()).await?,
            };
            ids.insert(id);
        }
        Ok(ids)
    }
}
