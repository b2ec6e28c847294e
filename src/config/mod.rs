pub mod toml_config;

pub use toml_config::{ShippingConfig, StorageBackend};

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "relocal-shipping")]
#[command(about = "Shipping estimation, shipment lifecycle and carrier tracking")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in defaults when absent)
    #[arg(short, long, default_value = "shipping.toml")]
    pub config: PathBuf,

    /// Override storage.data_dir from the config file
    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate cost and delivery window from an estimate request JSON file
    Estimate {
        #[arg(long)]
        request: PathBuf,
    },
    /// Create a shipment from a create-shipment request JSON file
    CreateShipment {
        #[arg(long)]
        request: PathBuf,
    },
    /// Ingest a carrier tracking event JSON file
    Ingest {
        #[arg(long)]
        event: PathBuf,
    },
    /// Move a shipment to the next lifecycle status
    Advance {
        #[arg(long)]
        shipment_id: String,
        #[arg(long)]
        status: String,
    },
    /// Print a shipment and its tracking history
    Show {
        #[arg(long)]
        shipment_id: String,
    },
}
