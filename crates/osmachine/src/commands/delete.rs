use colored::Colorize;
use osmachine_config::MachineClass;

pub async fn handle(class: &MachineClass, name: &str, provider_id: Option<&str>) -> anyhow::Result<()> {
    super::driver()?
        .delete_machine(class, name, provider_id)
        .await?;

    eprintln!("{} {}", "✓ Deleted".green(), name);
    Ok(())
}
