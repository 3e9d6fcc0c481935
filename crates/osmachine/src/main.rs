mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use osmachine_driver::DriverError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "osm")]
#[command(about = "Manage the lifecycle of OpenStack machines", long_about = None)]
struct Cli {
    /// Machine config file (default: OSM_CONFIG_PATH, ./machine.yaml, ~/.config/osmachine/machine.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a machine, or return the existing one with the same name
    Create {
        /// Machine name
        name: String,
        /// File passed to the server as user data
        #[arg(short, long)]
        user_data: Option<PathBuf>,
    },
    /// Delete a machine and the resources created for it
    Delete {
        /// Machine name
        name: String,
        /// Provider ID (openstack:///<region>/<server-id>) to delete by
        #[arg(short, long)]
        provider_id: Option<String>,
    },
    /// List machines of the configured cluster and role
    List,
    /// Validate the machine config
    Validate,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("osmachine {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let result = run(cli).await;
    if let Err(e) = result {
        match e.downcast_ref::<DriverError>() {
            Some(driver_error) => eprintln!(
                "{} [{}] {}",
                "Error:".red().bold(),
                driver_error.code(),
                driver_error
            ),
            None => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let class = commands::load_class(cli.config.as_deref())?;

    match cli.command {
        Commands::Create { name, user_data } => {
            commands::create::handle(&class, &name, user_data.as_deref()).await
        }
        Commands::Delete { name, provider_id } => {
            commands::delete::handle(&class, &name, provider_id.as_deref()).await
        }
        Commands::List => commands::list::handle(&class).await,
        Commands::Validate => commands::validate::handle(&class),
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }
}
