//! Neutron network client

use crate::http::ServiceClient;
use async_trait::async_trait;
use osmachine_cloud::{
    CreatePortRequest, Network, Port, PortListOptions, Result, Subnet, UpdatePortRequest,
    unique_id,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub struct NeutronClient {
    client: ServiceClient,
}

impl NeutronClient {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    async fn ids_by_name(&self, collection: &str, kind: &str, name: &str) -> Result<String> {
        let body: Value = self
            .client
            .get(&format!("v2.0/{}", collection), &[("name", name)])
            .await?;
        let resources: Vec<NamedResource> = match body.get(collection.replace('-', "_")) {
            Some(list) => serde_json::from_value(list.clone())?,
            None => Vec::new(),
        };
        let ids = resources
            .into_iter()
            .filter(|r| r.name == name)
            .map(|r| r.id);
        unique_id(kind, name, ids)
    }
}

#[async_trait]
impl Network for NeutronClient {
    async fn get_port(&self, id: &str) -> Result<Port> {
        let envelope: PortEnvelope = self.client.get(&format!("v2.0/ports/{}", id), &[]).await?;
        Ok(envelope.port)
    }

    async fn list_ports(&self, opts: &PortListOptions) -> Result<Vec<Port>> {
        let mut query = Vec::new();
        if let Some(name) = &opts.name {
            query.push(("name", name.as_str()));
        }
        if let Some(device_id) = &opts.device_id {
            query.push(("device_id", device_id.as_str()));
        }
        if let Some(network_id) = &opts.network_id {
            query.push(("network_id", network_id.as_str()));
        }
        let envelope: PortsEnvelope = self.client.get("v2.0/ports", &query).await?;
        Ok(envelope.ports)
    }

    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port> {
        let envelope: PortEnvelope = self
            .client
            .post("v2.0/ports", &create_port_body(request))
            .await?;
        Ok(envelope.port)
    }

    async fn update_port(&self, id: &str, request: &UpdatePortRequest) -> Result<Port> {
        let envelope: PortEnvelope = self
            .client
            .put(&format!("v2.0/ports/{}", id), &update_port_body(request))
            .await?;
        Ok(envelope.port)
    }

    async fn delete_port(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("v2.0/ports/{}", id), &[]).await
    }

    async fn network_id_from_name(&self, name: &str) -> Result<String> {
        self.ids_by_name("networks", "network", name).await
    }

    async fn security_group_id_from_name(&self, name: &str) -> Result<String> {
        self.ids_by_name("security-groups", "security group", name)
            .await
    }

    async fn port_id_from_name(&self, name: &str) -> Result<String> {
        self.ids_by_name("ports", "port", name).await
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        let envelope: SubnetEnvelope = self
            .client
            .get(&format!("v2.0/subnets/{}", id), &[])
            .await?;
        Ok(envelope.subnet)
    }
}

fn create_port_body(request: &CreatePortRequest) -> Value {
    let mut port = json!({
        "name": request.name,
        "network_id": request.network_id,
        "admin_state_up": true,
    });
    if !request.fixed_ips.is_empty() {
        port["fixed_ips"] = json!(request.fixed_ips);
    }
    if !request.allowed_address_pairs.is_empty() {
        port["allowed_address_pairs"] = json!(request.allowed_address_pairs);
    }
    if !request.security_groups.is_empty() {
        port["security_groups"] = json!(request.security_groups);
    }
    json!({ "port": port })
}

fn update_port_body(request: &UpdatePortRequest) -> Value {
    let mut port = json!({});
    if let Some(pairs) = &request.allowed_address_pairs {
        port["allowed_address_pairs"] = json!(pairs);
    }
    json!({ "port": port })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct PortEnvelope {
    port: Port,
}

#[derive(Debug, Deserialize)]
struct PortsEnvelope {
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct SubnetEnvelope {
    subnet: Subnet,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    id: String,
    #[serde(default)]
    name: String,
}
