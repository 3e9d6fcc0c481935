use osmachine_config::MachineClass;

/// Print `<provider-id>\t<name>` per machine
pub async fn handle(class: &MachineClass) -> anyhow::Result<()> {
    let machines = super::driver()?.list_machines(class).await?;

    for (provider_id, name) in &machines {
        println!("{}\t{}", provider_id, name);
    }
    Ok(())
}
