//! Command execution.

use clap::Subcommand;
use hostsync_deploy::{DeployError, DeployEvent, VersionOrchestrator};
use hostsync_hosting::{BlobClient, HostingClient};
use hostsync_protocol::VersionId;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{Config, ENV_APP_ID, ENV_MASTER_KEY};
use crate::project::{self, Scaffold};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create template public and cloud directories
    Generate,
    #[command(flatten)]
    Remote(RemoteCommand),
}

/// Commands that talk to the hosting service.
#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// List application versions
    List,
    /// Show the active version
    Current,
    /// Upload assets and cloud code as a new version, then activate it
    Create {
        /// New version number
        version: VersionId,
    },
    /// Make an existing version active
    Activate {
        /// Existing version number
        version: VersionId,
    },
}

/// Runs `command`, returning whether it succeeded. Usage problems are
/// reported on stdout and yield `false`; failures of the operation itself
/// are errors.
pub async fn run(command: Command, config: Config) -> anyhow::Result<bool> {
    match command {
        Command::Generate => generate(&config),
        Command::Remote(command) => run_remote(command, &config).await,
    }
}

fn generate(config: &Config) -> anyhow::Result<bool> {
    match project::generate_template(&config.code_root, &config.asset_root)? {
        Scaffold::Created => {
            println!(
                "Generated template {} and {} directories.",
                config.asset_root.display(),
                config.code_root.display()
            );
            Ok(true)
        }
        Scaffold::Refused => {
            println!(
                "For safety reasons, templates are not generated in existing {} & {} directories.",
                config.code_root.display(),
                config.asset_root.display()
            );
            Ok(false)
        }
    }
}

async fn run_remote(command: RemoteCommand, config: &Config) -> anyhow::Result<bool> {
    if !config.has_credentials() {
        println!("Required environment variables: {ENV_APP_ID}, {ENV_MASTER_KEY}");
        return Ok(false);
    }
    if matches!(command, RemoteCommand::Create { .. })
        && !project::meets_requirements(&config.code_root, &config.asset_root)
    {
        println!(
            "Required directories: {}, {}",
            config.code_root.display(),
            config.asset_root.display()
        );
        println!(
            "The {} directory must contain a {} cloud code file.",
            config.code_root.display(),
            project::ENTRY_POINT
        );
        return Ok(false);
    }

    let client_config = config.client_config()?;
    let api = HostingClient::new(&client_config)?;
    let store = BlobClient::new(&client_config)?;

    let mut orch = VersionOrchestrator::new(&api, &store, config.deploy_config());
    let printer = orch.take_events().map(|rx| tokio::spawn(print_progress(rx)));

    let cancel = orch.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let outcome = execute(&orch, command).await;
    drop(orch);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match outcome {
        Ok(()) => Ok(true),
        Err(DeployError::VersionExists(_)) => {
            println!("Error: version already exists.");
            Ok(false)
        }
        Err(DeployError::VersionNotFound(_)) => {
            println!("Error: version does not exist.");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

async fn execute(orch: &VersionOrchestrator<'_>, command: RemoteCommand) -> Result<(), DeployError> {
    match command {
        RemoteCommand::List => {
            let versions = orch.list_versions().await?;
            let line: Vec<String> = versions.iter().map(ToString::to_string).collect();
            println!("{}", line.join(" "));
        }
        RemoteCommand::Current => match orch.current_version().await? {
            Some(version) => println!("{version}"),
            None => println!("No active version."),
        },
        RemoteCommand::Create { version } => {
            let summary = orch.create_version(version).await?;
            info!(
                version = %summary.version,
                uploaded = summary.upload.uploaded,
                code_files = summary.code_files,
                "deploy finished"
            );
            println!("All done! Version {} is now active.", summary.version);
        }
        RemoteCommand::Activate { version } => {
            orch.activate_version(version).await?;
            println!("Version {version} is now active.");
        }
    }
    Ok(())
}

async fn print_progress(mut rx: mpsc::Receiver<DeployEvent>) {
    while let Some(event) = rx.recv().await {
        if let DeployEvent::AssetUploaded { path, .. } = event {
            println!("  {path}");
        }
    }
}
