//! Region-scoped OpenStack client factory

use crate::auth::{Credentials, authenticate};
use crate::compute::NovaClient;
use crate::error::Result;
use crate::http::ServiceClient;
use crate::network::NeutronClient;
use crate::storage::CinderClient;
use async_trait::async_trait;
use osmachine_cloud::{
    ApiRecorder, COMPUTE_SERVICE, CloudClients, CloudConnector, Metered, NETWORK_SERVICE,
    STORAGE_SERVICE,
};
use std::sync::Arc;

const COMPUTE_TYPES: &[&str] = &["compute"];
const IMAGE_TYPES: &[&str] = &["image"];
const NETWORK_TYPES: &[&str] = &["network"];
const STORAGE_TYPES: &[&str] = &["volumev3", "block-storage", "volume"];

/// Authenticates against Keystone and builds metered clients per region
pub struct OpenStackConnector {
    credentials: Credentials,
    http: reqwest::Client,
    recorder: Arc<dyn ApiRecorder>,
}

impl OpenStackConnector {
    pub fn new(credentials: Credentials, recorder: Arc<dyn ApiRecorder>) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
            recorder,
        }
    }

    /// Build from the `OS_*` environment variables
    pub fn from_env(recorder: Arc<dyn ApiRecorder>) -> Result<Self> {
        Ok(Self::new(Credentials::from_env()?, recorder))
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[async_trait]
impl CloudConnector for OpenStackConnector {
    fn name(&self) -> &str {
        "openstack"
    }

    async fn connect(&self, region: &str) -> osmachine_cloud::Result<CloudClients> {
        let token = authenticate(&self.http, &self.credentials).await?;
        let interface = self.credentials.interface.as_str();

        let service = |types: &[&str]| -> Result<ServiceClient> {
            let url = token.endpoint(types, region, interface)?;
            Ok(ServiceClient::new(self.http.clone(), url, token.value.clone()))
        };

        let nova = NovaClient::new(service(COMPUTE_TYPES)?, service(IMAGE_TYPES)?);
        let neutron = NeutronClient::new(service(NETWORK_TYPES)?);
        let cinder = CinderClient::new(service(STORAGE_TYPES)?);

        tracing::info!("Connected to OpenStack region {}", region);

        Ok(CloudClients {
            compute: Arc::new(Metered::new(nova, COMPUTE_SERVICE, self.recorder.clone())),
            network: Arc::new(Metered::new(neutron, NETWORK_SERVICE, self.recorder.clone())),
            storage: Arc::new(Metered::new(cinder, STORAGE_SERVICE, self.recorder.clone())),
        })
    }
}
