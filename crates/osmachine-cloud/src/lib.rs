//! osmachine cloud capabilities
//!
//! This crate defines what the machine driver needs from an OpenStack-style
//! cloud, split into three independently substitutable capabilities, plus
//! the resource model and error taxonomy they share.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               osmachine-driver                  │
//! │        (create / delete / list machines)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │ CloudClients
//! ┌─────────────────▼───────────────────────────────┐
//! │               osmachine-cloud                   │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐      │
//! │  │  Compute  │ │  Network  │ │  Storage  │      │
//! │  └───────────┘ └───────────┘ └───────────┘      │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Metered<T> ──► ApiRecorder              │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │   openstack   │ │   FakeCloud   │
//! │  (REST API)   │ │ (test-utils)  │
//! └───────────────┘ └───────────────┘
//! ```

pub mod capability;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod metered;
pub mod model;
pub mod recorder;

// Re-exports
pub use capability::{CloudClients, CloudConnector, Compute, Network, Storage, unique_id};
pub use error::{CloudError, Result};
pub use metered::{
    COMPUTE_SERVICE, Metered, NETWORK_SERVICE, PROVIDER_LABEL, STORAGE_SERVICE,
};
pub use model::{
    AddressPair, BlockDevice, BlockDeviceSource, CreatePortRequest, CreateServerRequest,
    CreateVolumeRequest, FixedIp, NetworkAttachment, Port, PortListOptions, Server, ServerFault,
    ServerListOptions, ServerStatus, Subnet, UpdatePortRequest, UpdateVolumeRequest, Volume,
    VolumeListOptions, VolumeStatus,
};
pub use recorder::{ApiRecorder, MetricsRecorder, NoopRecorder};
