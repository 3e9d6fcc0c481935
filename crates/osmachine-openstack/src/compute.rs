//! Nova compute client (plus Glance image lookup)

use crate::http::ServiceClient;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use osmachine_cloud::{
    Compute, CreateServerRequest, NetworkAttachment, Result, Server, ServerListOptions,
    ServerStatus, unique_id,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

pub struct NovaClient {
    compute: ServiceClient,
    image: ServiceClient,
}

impl NovaClient {
    pub fn new(compute: ServiceClient, image: ServiceClient) -> Self {
        Self { compute, image }
    }

    async fn post_server(&self, request: &CreateServerRequest) -> Result<Server> {
        let created: CreatedServerEnvelope = self
            .compute
            .post("servers", &server_body(request))
            .await?;

        tracing::debug!("Nova accepted server {} as {}", request.name, created.server.id);
        Ok(Server {
            id: created.server.id,
            name: request.name.clone(),
            status: ServerStatus::Build,
            metadata: request.metadata.clone(),
            fault: None,
        })
    }
}

#[async_trait]
impl Compute for NovaClient {
    async fn get_server(&self, id: &str) -> Result<Server> {
        let envelope: ServerEnvelope = self.compute.get(&format!("servers/{}", id), &[]).await?;
        Ok(envelope.server)
    }

    async fn list_servers(&self, opts: &ServerListOptions) -> Result<Vec<Server>> {
        let mut query = Vec::new();
        if let Some(name) = &opts.name {
            query.push(("name", name.as_str()));
        }
        let envelope: ServersEnvelope = self.compute.get("servers/detail", &query).await?;
        Ok(envelope.servers)
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server> {
        self.post_server(request).await
    }

    async fn boot_from_volume(&self, request: &CreateServerRequest) -> Result<Server> {
        self.post_server(request).await
    }

    async fn delete_server(&self, id: &str) -> Result<()> {
        self.compute.delete(&format!("servers/{}", id), &[]).await
    }

    async fn image_id_from_name(&self, name: &str) -> Result<String> {
        let envelope: ImagesEnvelope = self.image.get("v2/images", &[("name", name)]).await?;
        let ids = envelope
            .images
            .into_iter()
            .filter(|image| image.name == name)
            .map(|image| image.id);
        unique_id("image", name, ids)
    }

    async fn flavor_id_from_name(&self, name: &str) -> Result<String> {
        // The flavor API has no name filter
        let envelope: FlavorsEnvelope = self.compute.get("flavors/detail", &[]).await?;
        let ids = envelope
            .flavors
            .into_iter()
            .filter(|flavor| flavor.name == name)
            .map(|flavor| flavor.id);
        unique_id("flavor", name, ids)
    }
}

/// Request body of `POST /servers`
fn server_body(request: &CreateServerRequest) -> Value {
    let mut server = Map::new();
    server.insert("name".into(), json!(request.name));
    server.insert("flavorRef".into(), json!(request.flavor_ref));

    // Booting from a block device must not also name an image
    if request.block_devices.is_empty() {
        server.insert("imageRef".into(), json!(request.image_ref));
    } else {
        let mappings: Vec<Value> = request
            .block_devices
            .iter()
            .map(|device| {
                let mut mapping = json!({
                    "source_type": device.source.as_str(),
                    "destination_type": "volume",
                    "uuid": device.uuid,
                    "boot_index": device.boot_index,
                    "delete_on_termination": device.delete_on_termination,
                });
                if let Some(size) = device.volume_size {
                    mapping["volume_size"] = json!(size);
                }
                mapping
            })
            .collect();
        server.insert("block_device_mapping_v2".into(), Value::Array(mappings));
    }

    if !request.networks.is_empty() {
        let networks: Vec<Value> = request
            .networks
            .iter()
            .map(|attachment| match attachment {
                NetworkAttachment::Network { id } => json!({ "uuid": id }),
                NetworkAttachment::Port { port_id, .. } => json!({ "port": port_id }),
            })
            .collect();
        server.insert("networks".into(), Value::Array(networks));
    }

    if !request.security_groups.is_empty() {
        let groups: Vec<Value> = request
            .security_groups
            .iter()
            .map(|name| json!({ "name": name }))
            .collect();
        server.insert("security_groups".into(), Value::Array(groups));
    }

    if !request.metadata.is_empty() {
        server.insert("metadata".into(), json!(request.metadata));
    }
    if !request.user_data.is_empty() {
        server.insert("user_data".into(), json!(STANDARD.encode(&request.user_data)));
    }
    if let Some(zone) = &request.availability_zone {
        server.insert("availability_zone".into(), json!(zone));
    }
    if let Some(config_drive) = request.config_drive {
        server.insert("config_drive".into(), json!(config_drive));
    }
    if let Some(key_name) = &request.key_name {
        server.insert("key_name".into(), json!(key_name));
    }

    let mut body = json!({ "server": server });
    if let Some(group) = &request.server_group {
        body["os:scheduler_hints"] = json!({ "group": group });
    }
    body
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Debug, Deserialize)]
struct ServersEnvelope {
    servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
struct CreatedServerEnvelope {
    server: CreatedServer,
}

#[derive(Debug, Deserialize)]
struct CreatedServer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FlavorsEnvelope {
    flavors: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
struct ImagesEnvelope {
    images: Vec<NamedResource>,
}
