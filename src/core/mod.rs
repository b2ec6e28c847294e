pub mod estimator;
pub mod lifecycle;
pub mod rate_table;
pub mod rule_resolver;
pub mod service;
pub mod tracking;

pub use crate::domain::model::{Address, Shipment, ShipmentEstimate, TrackingUpdate};
pub use crate::domain::ports::{LabelIssuer, RateProvider, ShippingStore};
pub use crate::utils::error::Result;
