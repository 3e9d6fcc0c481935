//! Cluster and role tag keys used to scope server lookups

use crate::error::{DriverError, Result};
use osmachine_config::{CLUSTER_TAG_MARKER, ROLE_TAG_MARKER};
use std::collections::HashMap;

/// Metadata keys a server must carry to belong to this machine class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTags {
    pub cluster_key: String,
    pub role_key: String,
}

impl ClusterTags {
    /// Derive the keys from the configured tags
    ///
    /// When several keys contain the same marker the lexicographically
    /// smallest one is used. A key carrying the cluster marker is never
    /// picked as role key.
    pub fn derive(tags: &HashMap<String, String>) -> Result<Self> {
        let cluster_key = tags
            .keys()
            .filter(|k| k.contains(CLUSTER_TAG_MARKER))
            .min();
        let role_key = tags
            .keys()
            .filter(|k| !k.contains(CLUSTER_TAG_MARKER) && k.contains(ROLE_TAG_MARKER))
            .min();

        match (cluster_key, role_key) {
            (Some(cluster_key), Some(role_key)) => Ok(Self {
                cluster_key: cluster_key.clone(),
                role_key: role_key.clone(),
            }),
            _ => Err(DriverError::MissingClusterTags(format!(
                "tags need keys containing {:?} and {:?}",
                CLUSTER_TAG_MARKER, ROLE_TAG_MARKER
            ))),
        }
    }

    /// Whether server metadata carries both keys
    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        metadata.contains_key(&self.cluster_key) && metadata.contains_key(&self.role_key)
    }
}
