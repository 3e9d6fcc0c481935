use colored::Colorize;
use osmachine_config::{MachineClass, NetworkMode};
use osmachine_driver::BootDisk;

pub fn handle(class: &MachineClass) -> anyhow::Result<()> {
    let spec = &class.provider_spec;
    println!("{}", "✓ Machine config is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  region: {}", spec.region.cyan());
    println!("  flavor: {}", spec.flavor_name.cyan());

    let image = spec
        .image_id
        .as_deref()
        .or(spec.image_name.as_deref())
        .unwrap_or("(unset)");
    println!("  image: {}", image.cyan());

    match spec.network_mode() {
        NetworkMode::ManagedPort {
            network_id,
            subnet_ids,
        } => println!(
            "  network: {} (managed port, subnets: {})",
            network_id.cyan(),
            subnet_ids.join(", ")
        ),
        NetworkMode::Direct { network_id } => println!("  network: {}", network_id.cyan()),
        NetworkMode::Named(networks) => {
            println!("  networks: {}", networks.len());
            for network in networks {
                let label = network
                    .id
                    .as_deref()
                    .or(network.name.as_deref())
                    .unwrap_or("(unset)");
                let pod = if network.pod_network { " (pod network)" } else { "" };
                println!("    - {}{}", label.cyan(), pod);
            }
        }
    }

    let boot_disk = match BootDisk::from_config(spec) {
        BootDisk::Ephemeral => "ephemeral".to_string(),
        BootDisk::InlineVolume { size } => format!("{} GiB volume", size),
        BootDisk::PersistentVolume { size, volume_type } => {
            format!("{} GiB {} volume (kept by name)", size, volume_type)
        }
    };
    println!("  boot disk: {}", boot_disk);
    println!(
        "  timeouts: create {}s, delete {}s, volume {}s (poll every {}s)",
        class.driver.server_create_timeout_secs,
        class.driver.server_delete_timeout_secs,
        class.driver.volume_create_timeout_secs,
        class.driver.poll_interval_secs
    );
    Ok(())
}
