//! Cinder block-storage client

use crate::http::ServiceClient;
use async_trait::async_trait;
use osmachine_cloud::{
    CreateVolumeRequest, Result, Storage, UpdateVolumeRequest, Volume, VolumeListOptions,
    VolumeStatus, unique_id,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub struct CinderClient {
    client: ServiceClient,
}

impl CinderClient {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Storage for CinderClient {
    async fn get_volume(&self, id: &str) -> Result<Volume> {
        let envelope: VolumeEnvelope = self.client.get(&format!("volumes/{}", id), &[]).await?;
        Ok(envelope.volume.into())
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume> {
        let envelope: VolumeEnvelope = self
            .client
            .post("volumes", &create_volume_body(request))
            .await?;
        Ok(envelope.volume.into())
    }

    async fn delete_volume(&self, id: &str, cascade: bool) -> Result<()> {
        let cascade = if cascade { "true" } else { "false" };
        self.client
            .delete(&format!("volumes/{}", id), &[("cascade", cascade)])
            .await
    }

    async fn list_volumes(&self, opts: &VolumeListOptions) -> Result<Vec<Volume>> {
        let mut query = Vec::new();
        if let Some(name) = &opts.name {
            query.push(("name", name.as_str()));
        }
        let envelope: VolumesEnvelope = self.client.get("volumes/detail", &query).await?;
        Ok(envelope.volumes.into_iter().map(Volume::from).collect())
    }

    async fn update_volume(&self, id: &str, request: &UpdateVolumeRequest) -> Result<Volume> {
        let mut volume = json!({});
        if let Some(name) = &request.name {
            volume["name"] = json!(name);
        }
        if let Some(description) = &request.description {
            volume["description"] = json!(description);
        }

        let envelope: VolumeEnvelope = self
            .client
            .put(&format!("volumes/{}", id), &json!({ "volume": volume }))
            .await?;
        Ok(envelope.volume.into())
    }

    async fn volume_id_from_name(&self, name: &str) -> Result<String> {
        let volumes = self
            .list_volumes(&VolumeListOptions {
                name: Some(name.to_string()),
            })
            .await?;
        let ids = volumes
            .into_iter()
            .filter(|v| v.name == name)
            .map(|v| v.id);
        unique_id("volume", name, ids)
    }
}

fn create_volume_body(request: &CreateVolumeRequest) -> Value {
    let mut volume = json!({
        "name": request.name,
        "size": request.size,
    });
    if let Some(zone) = &request.availability_zone {
        volume["availability_zone"] = json!(zone);
    }
    if let Some(image_id) = &request.image_id {
        volume["imageRef"] = json!(image_id);
    }
    if let Some(volume_type) = &request.volume_type {
        volume["volume_type"] = json!(volume_type);
    }
    json!({ "volume": volume })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct VolumeEnvelope {
    volume: VolumeBody,
}

#[derive(Debug, Deserialize)]
struct VolumesEnvelope {
    volumes: Vec<VolumeBody>,
}

/// Cinder returns `null` for unnamed volumes
#[derive(Debug, Deserialize)]
struct VolumeBody {
    id: String,
    #[serde(default)]
    name: Option<String>,
    status: VolumeStatus,
    size: u32,
    #[serde(default)]
    volume_type: Option<String>,
}

impl From<VolumeBody> for Volume {
    fn from(body: VolumeBody) -> Self {
        Volume {
            id: body.id,
            name: body.name.unwrap_or_default(),
            status: body.status,
            size: body.size,
            volume_type: body.volume_type,
        }
    }
}
