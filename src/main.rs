use anyhow::{anyhow, Context};
use clap::Parser;
use relocal_shipping::config::{CliConfig, Command, StorageBackend};
use relocal_shipping::core::ShippingStore;
use relocal_shipping::domain::model::EstimateRequest;
use relocal_shipping::utils::{logger, validation::Validate};
use relocal_shipping::{
    CreateShipmentRequest, JsonFileStore, MemoryStore, ShipmentStatus, ShippingConfig,
    ShippingService, TrackingUpdate,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run<S: ShippingStore + Clone>(
    command: Command,
    config: &ShippingConfig,
    store: S,
) -> anyhow::Result<()> {
    let service = ShippingService::from_config(store, config)?;

    match command {
        Command::Estimate { request } => {
            let request: EstimateRequest = read_json(&request)?;
            let estimate = service
                .estimate(&request.from_address, &request.to_address, request.weight_kg)
                .await?;
            print_json(&estimate)?;
        }
        Command::CreateShipment { request } => {
            let request: CreateShipmentRequest = read_json(&request)?;
            let shipment = service.create_shipment(request).await?;
            print_json(&shipment)?;
        }
        Command::Ingest { event } => {
            let update: TrackingUpdate = read_json(&event)?;
            let outcome = service.ingest(update).await?;
            print_json(&outcome)?;
        }
        Command::Advance {
            shipment_id,
            status,
        } => {
            let next = ShipmentStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown shipment status '{}'", status))?;
            let shipment = service.advance_shipment(&shipment_id, next).await?;
            print_json(&shipment)?;
        }
        Command::Show { shipment_id } => {
            let shipment = service.shipment(&shipment_id).await?;
            let history = service.tracking_history(&shipment_id).await?;
            print_json(&serde_json::json!({
                "shipment": shipment,
                "tracking_events": history,
            }))?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let mut config = if cli.config.exists() {
        tracing::info!("Loading configuration from: {}", cli.config.display());
        ShippingConfig::from_file(&cli.config)?
    } else {
        tracing::info!(
            "No config at {}, using built-in defaults",
            cli.config.display()
        );
        ShippingConfig::default()
    };

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let result = match config.storage.backend {
        StorageBackend::Memory => run(cli.command, &config, MemoryStore::new()).await,
        StorageBackend::Json => {
            let store = JsonFileStore::new(&config.storage.data_dir);
            run(cli.command, &config, store).await
        }
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}
