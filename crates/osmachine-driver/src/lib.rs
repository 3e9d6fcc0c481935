//! osmachine machine driver
//!
//! Creates, deletes and lists virtual machines on an OpenStack-compatible
//! cloud, together with the boot volume and network port each machine owns.
//! The cloud is the only source of truth; every call rediscovers the
//! machine by name and cluster/role tags.
//!
//! ```text
//! Driver ──► Executor ──► Compute / Network / Storage
//!               │
//!               └──► Poller (interval, deadline, cancellation)
//! ```

pub mod driver;
pub mod error;
pub mod executor;
pub mod network;
pub mod poller;
pub mod provider_id;
pub mod tags;
pub mod volume;

pub use driver::Driver;
pub use error::{DriverError, ErrorCode, Result, ResultExt};
pub use executor::Executor;
pub use poller::{Decision, FailReason, Observation, PollStatus, Poller, decide};
pub use provider_id::{PROVIDER_ID_PREFIX, ProviderId};
pub use tags::ClusterTags;
pub use volume::BootDisk;
