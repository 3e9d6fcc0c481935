//! Provider ID codec
//!
//! A provider ID names one server as `openstack:///<region>/<server-id>`.
//! The region must not contain `/`; the server ID may.

use crate::error::DriverError;
use std::fmt;
use std::str::FromStr;

pub const PROVIDER_ID_PREFIX: &str = "openstack:///";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId {
    pub region: String,
    pub server_id: String,
}

impl ProviderId {
    pub fn new(region: impl Into<String>, server_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            server_id: server_id.into(),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", PROVIDER_ID_PREFIX, self.region, self.server_id)
    }
}

impl FromStr for ProviderId {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(PROVIDER_ID_PREFIX).ok_or_else(|| {
            DriverError::InvalidProviderId(format!("{:?} lacks {:?}", s, PROVIDER_ID_PREFIX))
        })?;
        let (region, server_id) = rest
            .split_once('/')
            .ok_or_else(|| DriverError::InvalidProviderId(format!("{:?} has no server ID", s)))?;
        if server_id.is_empty() {
            return Err(DriverError::InvalidProviderId(format!(
                "{:?} has an empty server ID",
                s
            )));
        }
        Ok(Self::new(region, server_id))
    }
}
