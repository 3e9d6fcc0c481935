pub mod create;
pub mod delete;
pub mod list;
pub mod validate;

use anyhow::Context;
use osmachine_cloud::NoopRecorder;
use osmachine_config::MachineClass;
use osmachine_driver::Driver;
use osmachine_openstack::OpenStackConnector;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Load and validate the machine class from `path` or the discovered file
pub fn load_class(path: Option<&Path>) -> anyhow::Result<MachineClass> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => osmachine_config::find_config_file()?,
    };
    tracing::debug!("Loading machine config from {}", path.display());

    osmachine_config::load_machine_class(&path)
        .with_context(|| format!("invalid machine config {}", path.display()))
}

/// Driver over the OpenStack REST adapter, cancelled on Ctrl-C
pub fn driver() -> anyhow::Result<Driver<OpenStackConnector>> {
    // One-shot process without a metrics exporter; embedders pass MetricsRecorder
    let recorder = Arc::new(NoopRecorder);
    let connector = OpenStackConnector::from_env(recorder)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling pending waits");
            on_signal.cancel();
        }
    });

    Ok(Driver::new(connector).with_cancellation(cancel))
}
