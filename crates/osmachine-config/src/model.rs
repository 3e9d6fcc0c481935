//! Machine provider configuration model
//!
//! Field names follow the provider-spec keys the node orchestrator stores in
//! its machine classes (`imageID`, `networkID`, `subnetIDs`, ...).

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::time::Duration;

/// Tag key fragment identifying the cluster a machine belongs to
pub const CLUSTER_TAG_MARKER: &str = "kubernetes.io-cluster-";

/// Tag key fragment identifying the node role of a machine
pub const ROLE_TAG_MARKER: &str = "kubernetes.io-role-";

/// Desired state of one machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderConfig {
    /// Image to boot; preferred over `image_name` when both are set
    #[serde(rename = "imageID", default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,

    pub region: String,

    #[serde(default)]
    pub availability_zone: String,

    pub flavor_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    /// Security group names
    #[serde(default)]
    pub security_groups: Vec<String>,

    /// Server metadata; must carry the cluster and role tags
    #[serde(default)]
    pub tags: HashMap<String, String>,

    #[serde(rename = "networkID", default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,

    /// Legacy single subnet, merged into `subnet_ids`
    #[serde(rename = "subnetID", default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    #[serde(rename = "subnetIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkConfig>,

    /// Comma separated pod network CIDRs
    #[serde(default)]
    pub pod_network_cidr: String,

    /// Root disk size in GiB; 0 boots from an ephemeral disk
    #[serde(default)]
    pub root_disk_size: u32,

    /// Volume type of a pre-created boot volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_config_drive: Option<bool>,

    /// Server group used as scheduler hint
    #[serde(
        rename = "serverGroupID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_group_id: Option<String>,
}

/// Entry of the named network list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Network ID; wins over `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether pod traffic is routed over this network
    #[serde(default)]
    pub pod_network: bool,
}

/// How the machine is attached to the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode<'a> {
    /// Network ID plus subnets: the driver owns a port bound to the subnets
    ManagedPort {
        network_id: &'a str,
        subnet_ids: Vec<String>,
    },
    /// Network ID only: attach to the whole network
    Direct { network_id: &'a str },
    /// List of networks resolved one by one
    Named(&'a [NetworkConfig]),
}

impl MachineProviderConfig {
    /// Decode a raw JSON provider spec
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// De-duplicated, sorted union of `subnet_ids` and the legacy `subnet_id`
    pub fn effective_subnet_ids(&self) -> Vec<String> {
        self.subnet_ids
            .iter()
            .chain(self.subnet_id.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn network_mode(&self) -> NetworkMode<'_> {
        match self.network_id.as_deref() {
            Some(network_id) => {
                let subnet_ids = self.effective_subnet_ids();
                if subnet_ids.is_empty() {
                    NetworkMode::Direct { network_id }
                } else {
                    NetworkMode::ManagedPort {
                        network_id,
                        subnet_ids,
                    }
                }
            }
            None => NetworkMode::Named(&self.networks),
        }
    }

    /// Whether the driver creates and owns the machine's port
    pub fn is_user_managed_network(&self) -> bool {
        matches!(self.network_mode(), NetworkMode::ManagedPort { .. })
    }

    pub fn pod_network_cidrs(&self) -> Vec<String> {
        self.pod_network_cidr
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn availability_zone(&self) -> Option<&str> {
        Some(self.availability_zone.as_str()).filter(|z| !z.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(invalid("region must be set"));
        }
        if self.flavor_name.trim().is_empty() {
            return Err(invalid("flavorName must be set"));
        }

        for (field, value) in [
            ("imageID", &self.image_id),
            ("imageName", &self.image_name),
            ("keyName", &self.key_name),
            ("networkID", &self.network_id),
            ("subnetID", &self.subnet_id),
            ("volumeType", &self.volume_type),
            ("serverGroupID", &self.server_group_id),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(invalid(format!("{} must not be empty when set", field)));
            }
        }

        if self.image_id.is_none() && self.image_name.is_none() {
            return Err(invalid("one of imageID or imageName must be set"));
        }

        if self.subnet_ids.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("subnetIDs must not contain empty entries"));
        }
        if self.network_id.is_none() && !self.effective_subnet_ids().is_empty() {
            return Err(invalid("subnets require networkID to be set"));
        }
        if self.network_id.is_none() && self.networks.is_empty() {
            return Err(invalid("one of networkID or networks must be set"));
        }
        for (i, network) in self.networks.iter().enumerate() {
            let has_id = network.id.as_deref().is_some_and(|v| !v.is_empty());
            let has_name = network.name.as_deref().is_some_and(|v| !v.is_empty());
            if !has_id && !has_name {
                return Err(invalid(format!("networks[{}] needs an id or a name", i)));
            }
        }

        for cidr in self.pod_network_cidrs() {
            if !is_cidr(&cidr) {
                return Err(invalid(format!("podNetworkCidr entry {:?} is not a CIDR", cidr)));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn is_cidr(value: &str) -> bool {
    let Some((addr, len)) = value.split_once('/') else {
        return false;
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return false;
    };
    let max = if addr.is_ipv4() { 32 } else { 128 };
    len.parse::<u8>().is_ok_and(|len| len <= max)
}

/// Tuning of the driver's polling loops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_server_create_timeout")]
    pub server_create_timeout_secs: u64,

    #[serde(default = "default_server_delete_timeout")]
    pub server_delete_timeout_secs: u64,

    #[serde(default = "default_volume_create_timeout")]
    pub volume_create_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_server_create_timeout() -> u64 {
    600
}
fn default_server_delete_timeout() -> u64 {
    300
}
fn default_volume_create_timeout() -> u64 {
    600
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            server_create_timeout_secs: default_server_create_timeout(),
            server_delete_timeout_secs: default_server_delete_timeout(),
            volume_create_timeout_secs: default_volume_create_timeout(),
        }
    }
}

impl DriverSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn server_create_timeout(&self) -> Duration {
        Duration::from_secs(self.server_create_timeout_secs)
    }

    pub fn server_delete_timeout(&self) -> Duration {
        Duration::from_secs(self.server_delete_timeout_secs)
    }

    pub fn volume_create_timeout(&self) -> Duration {
        Duration::from_secs(self.volume_create_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(invalid("driver.pollIntervalSecs must be greater than 0"));
        }
        Ok(())
    }
}

/// Contents of a machine config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineClass {
    pub provider_spec: MachineProviderConfig,

    #[serde(default)]
    pub driver: DriverSettings,
}

impl MachineClass {
    pub fn validate(&self) -> Result<()> {
        self.provider_spec.validate()?;
        self.driver.validate()
    }
}
