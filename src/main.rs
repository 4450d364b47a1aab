// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sensor_datastore::config::{config_from_env, load_config_with_env, LoggingConfig};
use sensor_datastore::{
    BackendFactory, Report, SensorRecord, SensorService, ServiceResponse, StorageResult,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Sensor Datastore - store sensor readings and export them as CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults plus environment when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend token (overrides config file and DATA_ACCESS)
    #[arg(short, long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the backend namespace if it does not exist
    Provision,
    /// Store one reading
    Log {
        /// Reading as a JSON object
        #[arg(long, conflicts_with = "random")]
        json: Option<String>,
        /// Store a freshly generated demonstration reading
        #[arg(long)]
        random: bool,
    },
    /// Export every stored reading as CSV
    Report {
        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete every stored reading
    Purge,
    /// Check backend connectivity
    Health,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so report output on stdout stays clean
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Print a log/purge outcome as JSON; a failure is printed the same way and
/// then returned so the process exits non-zero
fn respond(result: StorageResult<ServiceResponse>) -> Result<()> {
    let response = result.unwrap_or_else(|e| ServiceResponse::from(&e));
    println!("{}", serde_json::to_string(&response)?);
    if !response.success {
        anyhow::bail!("{}", response.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let mut app_config = match &args.config {
        Some(path) => load_config_with_env(path)?,
        None => config_from_env()?,
    };

    // Apply CLI overrides
    if let Some(backend) = args.backend {
        app_config.storage.backend = backend;
    }

    init_logging(&app_config.logging)?;

    info!("Starting Sensor Datastore");
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {:?}", path);
    }
    info!("Storage backend: {}", app_config.storage.backend);

    // Create storage backend
    let backend = BackendFactory::create(&app_config.storage)
        .context("Failed to create storage backend")?;

    // Provision before first use; a health check must not create anything
    if !matches!(args.command, Command::Health) {
        backend
            .provision()
            .await
            .context("Failed to provision storage backend")?;
        info!("Storage backend initialized: {}", backend.backend_type());
    }

    let service = SensorService::new(backend);

    match args.command {
        Command::Provision => {
            println!("{} backend provisioned", service.backend().backend_type());
        }
        Command::Log { json, random } => {
            let result = match json {
                Some(json) => service.log_json(&json).await,
                None if random => service.log(&SensorRecord::random_reading()).await,
                None => service.log(&SensorRecord::sample()).await,
            };
            respond(result)?;
        }
        Command::Report { output } => match service.report().await? {
            Report::Csv(report) => match output {
                Some(path) => {
                    tokio::fs::write(&path, report.body.as_bytes())
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} rows to {}", report.rows, path.display());
                }
                None => print!("{}", report.body),
            },
            no_data => println!("{}", serde_json::to_string(&no_data)?),
        },
        Command::Purge => respond(service.purge().await)?,
        Command::Health => {
            let health = service.health().await;
            println!("{}", serde_json::to_string(&health)?);
        }
    }

    Ok(())
}
