pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::storage::{JsonFileStore, MemoryStore};
pub use crate::config::ShippingConfig;
pub use crate::core::{service::ShippingService, tracking::IngestOutcome};
pub use crate::domain::model::{
    Address, CountryCode, CreateShipmentRequest, EstimationMethod, Shipment, ShipmentEstimate,
    TrackingEvent, TrackingUpdate,
};
pub use crate::domain::status::{CanonicalStatus, ShipmentStatus};
pub use crate::utils::error::{Result, ShippingError};
