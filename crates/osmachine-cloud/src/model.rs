//! Resource model shared by the capability interfaces
//!
//! These types are what the driver sees of Nova servers, Neutron ports and
//! subnets, and Cinder volumes. Concrete adapters translate their wire
//! formats into them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle status of a compute server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServerStatus {
    /// Server is being built
    Build,
    /// Server is running
    Active,
    /// Server is stopped
    ShutOff,
    /// Server failed; the fault field carries the detail
    Error,
    /// Server was deleted
    Deleted,
    /// Any status the driver does not act on
    Other(String),
}

impl ServerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ServerStatus::Build => "BUILD",
            ServerStatus::Active => "ACTIVE",
            ServerStatus::ShutOff => "SHUTOFF",
            ServerStatus::Error => "ERROR",
            ServerStatus::Deleted => "DELETED",
            ServerStatus::Other(s) => s,
        }
    }
}

impl From<String> for ServerStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "BUILD" => ServerStatus::Build,
            "ACTIVE" => ServerStatus::Active,
            "SHUTOFF" => ServerStatus::ShutOff,
            "ERROR" => ServerStatus::Error,
            "DELETED" => ServerStatus::Deleted,
            _ => ServerStatus::Other(s),
        }
    }
}

impl From<ServerStatus> for String {
    fn from(status: ServerStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a block-storage volume
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VolumeStatus {
    Creating,
    /// Image data is being copied into the volume
    Downloading,
    Available,
    InUse,
    Error,
    Deleting,
    Other(String),
}

impl VolumeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VolumeStatus::Creating => "creating",
            VolumeStatus::Downloading => "downloading",
            VolumeStatus::Available => "available",
            VolumeStatus::InUse => "in-use",
            VolumeStatus::Error => "error",
            VolumeStatus::Deleting => "deleting",
            VolumeStatus::Other(s) => s,
        }
    }
}

impl From<String> for VolumeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "creating" => VolumeStatus::Creating,
            "downloading" => VolumeStatus::Downloading,
            "available" => VolumeStatus::Available,
            "in-use" => VolumeStatus::InUse,
            "error" => VolumeStatus::Error,
            "deleting" => VolumeStatus::Deleting,
            _ => VolumeStatus::Other(s),
        }
    }
}

impl From<VolumeStatus> for String {
    fn from(status: VolumeStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fault reported by the compute service for a server in error state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFault {
    #[serde(default)]
    pub code: Option<u16>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub details: Option<String>,
}

impl fmt::Display for ServerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

/// A compute server (virtual machine instance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,

    pub name: String,

    pub status: ServerStatus,

    /// Server metadata; carries the machine tags
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Present only when the server is in error status
    #[serde(default)]
    pub fault: Option<ServerFault>,
}

/// A block-storage volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,

    pub name: String,

    pub status: VolumeStatus,

    /// Size in GiB
    pub size: u32,

    pub volume_type: Option<String>,
}

/// Fixed IP binding of a port to a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    pub subnet_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl FixedIp {
    pub fn in_subnet(subnet_id: impl Into<String>) -> Self {
        Self {
            subnet_id: subnet_id.into(),
            ip_address: None,
        }
    }
}

/// Additional IP range a port may carry traffic for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPair {
    pub ip_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl AddressPair {
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            mac_address: None,
        }
    }
}

/// A network port (virtual interface)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub network_id: String,

    /// ID of the server the port is attached to, empty if detached
    #[serde(default)]
    pub device_id: String,

    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,

    #[serde(default)]
    pub allowed_address_pairs: Vec<AddressPair>,
}

impl Port {
    /// Whether every given CIDR is already on the allow-list
    pub fn allows_all<S: AsRef<str>>(&self, cidrs: &[S]) -> bool {
        cidrs.iter().all(|cidr| {
            self.allowed_address_pairs
                .iter()
                .any(|pair| pair.ip_address == cidr.as_ref())
        })
    }
}

/// A network subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub network_id: String,

    #[serde(default)]
    pub cidr: String,
}

/// How a server is attached to a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkAttachment {
    /// Attach to the whole network; the platform allocates the port
    Network { id: String },
    /// Attach through a port the driver manages itself
    Port { network_id: String, port_id: String },
}

/// Source of a boot block device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockDeviceSource {
    Image,
    Volume,
}

impl BlockDeviceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockDeviceSource::Image => "image",
            BlockDeviceSource::Volume => "volume",
        }
    }
}

/// Block device mapping used to boot from a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    pub source: BlockDeviceSource,

    /// Image ID or volume ID, depending on the source
    pub uuid: String,

    /// Requested size in GiB when the platform creates the volume inline
    pub volume_size: Option<u32>,

    pub boot_index: i32,

    pub delete_on_termination: bool,
}

impl BlockDevice {
    /// Volume created inline by the compute service from an image
    pub fn from_image(image_id: impl Into<String>, size: u32) -> Self {
        Self {
            source: BlockDeviceSource::Image,
            uuid: image_id.into(),
            volume_size: Some(size),
            boot_index: 0,
            delete_on_termination: true,
        }
    }

    /// Previously created volume
    pub fn from_volume(volume_id: impl Into<String>) -> Self {
        Self {
            source: BlockDeviceSource::Volume,
            uuid: volume_id.into(),
            volume_size: None,
            boot_index: 0,
            delete_on_termination: true,
        }
    }
}

/// Parameters for creating a server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateServerRequest {
    pub name: String,
    pub flavor_ref: String,
    pub image_ref: String,
    pub networks: Vec<NetworkAttachment>,
    /// Security group names
    pub security_groups: Vec<String>,
    pub metadata: HashMap<String, String>,
    pub user_data: Vec<u8>,
    pub availability_zone: Option<String>,
    pub config_drive: Option<bool>,
    /// Key-pair extension
    pub key_name: Option<String>,
    /// Scheduler-hint extension (server group)
    pub server_group: Option<String>,
    /// Boot-from-volume extension; empty for an ephemeral boot disk
    pub block_devices: Vec<BlockDevice>,
}

/// Filters for listing servers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerListOptions {
    pub name: Option<String>,
}

impl ServerListOptions {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Filters for listing ports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortListOptions {
    pub name: Option<String>,
    pub device_id: Option<String>,
    pub network_id: Option<String>,
}

impl PortListOptions {
    pub fn by_device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Default::default()
        }
    }
}

/// Parameters for creating a port
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePortRequest {
    pub name: String,
    pub network_id: String,
    pub fixed_ips: Vec<FixedIp>,
    pub allowed_address_pairs: Vec<AddressPair>,
    /// Security group IDs
    pub security_groups: Vec<String>,
}

/// Parameters for updating a port; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePortRequest {
    pub allowed_address_pairs: Option<Vec<AddressPair>>,
}

/// Parameters for creating a volume
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateVolumeRequest {
    pub name: String,
    /// Size in GiB
    pub size: u32,
    pub availability_zone: Option<String>,
    pub image_id: Option<String>,
    pub volume_type: Option<String>,
}

/// Filters for listing volumes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeListOptions {
    pub name: Option<String>,
}

/// Parameters for updating a volume
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateVolumeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
