//! Models command for listing and downloading Ollama models.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Table;

use nira_ollama::{
    ModelCatalogClient, ProcessSupervisor, PullJobManager, ServerLifecycleManager,
};

use crate::config::ConfigLoader;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Arguments for the models command
#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for models
#[derive(Debug, Subcommand)]
pub enum ModelsCommand {
    /// List locally installed models
    List,
    /// Download a model, showing progress
    Pull {
        /// Model identifier (e.g. "phi3:mini-4k-instruct")
        model: String,
    },
}

/// Run the models command
pub async fn run(args: ModelsArgs) -> Result<()> {
    let lifecycle = lifecycle_from_config()?;

    match args.command {
        ModelsCommand::List => list_models(lifecycle).await,
        ModelsCommand::Pull { model } => pull_model(lifecycle, &model).await,
    }
}

fn lifecycle_from_config() -> Result<Arc<ServerLifecycleManager>> {
    let config = ConfigLoader::load()?;

    let mut supervisor = ProcessSupervisor::new();
    if let Some(bin) = &config.ollama.bin {
        supervisor = supervisor.with_binary(bin);
    }
    if let Some(models_dir) = &config.ollama.models_dir {
        supervisor = supervisor.with_models_dir(models_dir);
    }

    Ok(Arc::new(ServerLifecycleManager::new(
        config.ollama.base_url,
        supervisor,
    )))
}

async fn list_models(lifecycle: Arc<ServerLifecycleManager>) -> Result<()> {
    let catalog = ModelCatalogClient::new(lifecycle);
    let models = catalog.list_installed().await?;

    if models.is_empty() {
        println!("No models installed");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Size"]);
    for model in &models {
        table.add_row(vec![model.name.clone(), format_size(model.size)]);
    }
    println!("{table}");
    Ok(())
}

async fn pull_model(lifecycle: Arc<ServerLifecycleManager>, model: &str) -> Result<()> {
    let catalog = ModelCatalogClient::new(Arc::clone(&lifecycle));
    if catalog.is_installed(model).await? {
        println!("{} is already installed", model);
        return Ok(());
    }

    let manager = PullJobManager::new(lifecycle);
    let job_id = manager.start_pull(model);
    println!("Pulling {} (job {})", model, job_id);

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        let Some(job) = manager.get_status(&job_id) else {
            anyhow::bail!("pull job {} disappeared", job_id);
        };

        print!("\r{:>3}% {:<40}", job.progress, job.status);
        std::io::stdout().flush()?;

        if job.done {
            println!();
            return match job.error {
                Some(error) => Err(anyhow::anyhow!("pull failed: {}", error)),
                None => {
                    println!("{} installed", model);
                    Ok(())
                }
            };
        }
    }
}

/// Render a byte count the way `ollama list` does (GB/MB).
fn format_size(bytes: u64) -> String {
    const GB: u64 = 1_000_000_000;
    const MB: u64 = 1_000_000;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.0} MB", bytes as f64 / MB as f64)
    } else {
        format!("{} B", bytes)
    }
}
