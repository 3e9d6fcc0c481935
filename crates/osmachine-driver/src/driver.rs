//! Entry point used by the node orchestrator

use crate::error::{Result, ResultExt};
use crate::executor::Executor;
use osmachine_cloud::CloudConnector;
use osmachine_config::MachineClass;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Machine driver over one cloud connector
///
/// Each call validates the machine class, connects to its region and runs
/// a fresh [`Executor`]; nothing is shared between calls except the
/// connector and the cancellation token.
pub struct Driver<C> {
    connector: C,
    cancel: CancellationToken,
}

impl<C: CloudConnector> Driver<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel every wait of running and future calls when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub async fn executor(&self, class: &MachineClass) -> Result<Executor> {
        class.validate()?;
        let region = &class.provider_spec.region;
        let clients = self
            .connector
            .connect(region)
            .await
            .with_context(|| format!("failed to connect to {} region {}", self.connector.name(), region))?;

        Ok(
            Executor::new(clients, class.provider_spec.clone(), class.driver.clone())
                .with_cancellation(self.cancel.child_token()),
        )
    }

    pub async fn create_machine(
        &self,
        class: &MachineClass,
        name: &str,
        user_data: &[u8],
    ) -> Result<String> {
        info!("Creating machine [Name={}]", name);
        let provider_id = self.executor(class).await?.create_machine(name, user_data).await?;
        info!("Machine [Name={}] created as {}", name, provider_id);
        Ok(provider_id)
    }

    pub async fn delete_machine(
        &self,
        class: &MachineClass,
        name: &str,
        provider_id: Option<&str>,
    ) -> Result<()> {
        info!("Deleting machine [Name={}]", name);
        self.executor(class)
            .await?
            .delete_machine(name, provider_id)
            .await?;
        info!("Machine [Name={}] deleted", name);
        Ok(())
    }

    pub async fn list_machines(&self, class: &MachineClass) -> Result<BTreeMap<String, String>> {
        self.executor(class).await?.list_machines().await
    }
}
