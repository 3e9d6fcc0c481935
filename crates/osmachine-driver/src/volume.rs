//! Boot disk selection and the persistent boot volume

use crate::error::{DriverError, Result, ResultExt};
use crate::executor::Executor;
use crate::poller::Observation;
use osmachine_cloud::{
    BlockDevice, CreateServerRequest, CreateVolumeRequest, Server, Volume, VolumeListOptions,
    VolumeStatus,
};
use osmachine_config::MachineProviderConfig;
use tracing::{debug, info};

/// Where the server's root disk comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootDisk<'a> {
    /// Ephemeral disk carved from the image
    Ephemeral,
    /// Volume created by the compute service while booting
    InlineVolume { size: u32 },
    /// Volume created beforehand and named after the machine
    PersistentVolume { size: u32, volume_type: &'a str },
}

impl<'a> BootDisk<'a> {
    pub fn from_config(config: &'a MachineProviderConfig) -> Self {
        match (config.root_disk_size, config.volume_type.as_deref()) {
            (0, _) => BootDisk::Ephemeral,
            (size, None) => BootDisk::InlineVolume { size },
            (size, Some(volume_type)) => BootDisk::PersistentVolume { size, volume_type },
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, BootDisk::PersistentVolume { .. })
    }
}

impl Executor {
    /// Boot from a volume named after the server, creating it when absent
    ///
    /// On failure the volume is deleted before the error is returned.
    pub(crate) async fn boot_from_persistent_volume(
        &self,
        mut request: CreateServerRequest,
        size: u32,
        volume_type: &str,
    ) -> Result<Server> {
        let name = request.name.clone();

        let booted: Result<Server> = async {
            let volume = match self.find_boot_volume(&name).await? {
                Some(volume) => {
                    debug!("Found boot volume [Name={}, ID={}]", name, volume.id);
                    volume
                }
                None => {
                    info!("Creating boot volume [Name={}] of {} GiB", name, size);
                    self.storage
                        .create_volume(&CreateVolumeRequest {
                            name: name.clone(),
                            size,
                            availability_zone: request.availability_zone.clone(),
                            image_id: Some(request.image_ref.clone()),
                            volume_type: Some(volume_type.to_string()),
                        })
                        .await
                        .with_context(|| format!("failed to create boot volume [Name={}]", name))?
                }
            };

            self.wait_for_volume(&volume.id).await?;

            request.block_devices = vec![BlockDevice::from_volume(&volume.id)];
            info!(
                "Creating server [Name={}] from boot volume [ID={}]",
                name, volume.id
            );
            self.compute
                .boot_from_volume(&request)
                .await
                .with_context(|| format!("failed to boot server [Name={}] from volume", name))
        }
        .await;

        match booted {
            Ok(server) => Ok(server),
            Err(e) => {
                let cleanup = self.delete_boot_volume(&name).await.err();
                Err(e.with_cleanup(cleanup.into_iter().collect()))
            }
        }
    }

    async fn wait_for_volume(&self, volume_id: &str) -> Result<()> {
        self.poller
            .wait(
                "volume",
                volume_id,
                &[VolumeStatus::Downloading, VolumeStatus::Creating],
                &[VolumeStatus::Available],
                self.settings.volume_create_timeout(),
                || self.observe_volume(volume_id),
            )
            .await
            .with_context(|| format!("error waiting for volume [ID={}] to become available", volume_id))
    }

    async fn observe_volume(&self, volume_id: &str) -> Result<Option<Observation<VolumeStatus>>> {
        match self.storage.get_volume(volume_id).await {
            Ok(volume) => Ok(Some(Observation::new(volume.status))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The volume named `name`, if there is one
    pub(crate) async fn find_boot_volume(&self, name: &str) -> Result<Option<Volume>> {
        let listed = self
            .storage
            .list_volumes(&VolumeListOptions {
                name: Some(name.to_string()),
            })
            .await
            .with_context(|| format!("failed to list volumes [Name={}]", name))?;

        let mut matching: Vec<Volume> = listed.into_iter().filter(|v| v.name == name).collect();
        match matching.len() {
            0 => Ok(None),
            1 => Ok(matching.pop()),
            n => Err(DriverError::MultipleFound(format!(
                "{} volumes [Name={}]",
                n, name
            ))),
        }
    }

    /// Delete the volume named `name` together with its snapshots
    pub(crate) async fn delete_boot_volume(&self, name: &str) -> Result<()> {
        let Some(volume) = self.find_boot_volume(name).await? else {
            debug!("Boot volume [Name={}] not found, nothing to delete", name);
            return Ok(());
        };

        info!("Deleting boot volume [Name={}, ID={}]", name, volume.id);
        match self.storage.delete_volume(&volume.id, true).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(DriverError::from(e)
                .context(format!("failed to delete boot volume [ID={}]", volume.id))),
        }
    }
}
