use osmachine_config::MachineClass;
use std::path::Path;

pub async fn handle(class: &MachineClass, name: &str, user_data: Option<&Path>) -> anyhow::Result<()> {
    let user_data = match user_data {
        Some(path) => std::fs::read(path)?,
        None => Vec::new(),
    };

    let provider_id = super::driver()?
        .create_machine(class, name, &user_data)
        .await?;

    println!("{}", provider_id);
    Ok(())
}
