//! osmachine OpenStack adapter
//!
//! Implements the compute, network and storage capabilities over the
//! OpenStack REST APIs:
//!
//! - Keystone v3 password authentication and catalog lookup
//! - Nova servers and flavors, Glance images
//! - Neutron ports, networks, subnets and security groups
//! - Cinder volumes
//!
//! ## Environment
//!
//! - `OS_AUTH_URL`, `OS_USERNAME`, `OS_PASSWORD`: required
//! - `OS_PROJECT_ID` or `OS_PROJECT_NAME`: project scope
//! - `OS_USER_DOMAIN_NAME`, `OS_PROJECT_DOMAIN_NAME`: default `Default`
//! - `OS_INTERFACE`: catalog interface, default `public`

pub mod auth;
pub mod compute;
pub mod connector;
pub mod error;
pub mod http;
pub mod network;
pub mod storage;

pub use auth::{Credentials, ProjectScope, Token};
pub use compute::NovaClient;
pub use connector::OpenStackConnector;
pub use error::{OpenStackError, Result};
pub use http::ServiceClient;
pub use network::NeutronClient;
pub use storage::CinderClient;
