use crate::domain::status::{CanonicalStatus, ShipmentStatus};
use crate::utils::error::{Result, ShippingError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO-3166 alpha-2 country code, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ShippingError::validation(
                "country",
                format!("'{}' is not a two-letter ISO country code", raw),
            ));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ShippingError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl FromStr for CountryCode {
    type Err = ShippingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: CountryCode,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Persisted pricing rule scoped to a country pair and an inclusive weight bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRule {
    pub rule_id: String,
    pub from_country: CountryCode,
    pub to_country: CountryCode,
    pub weight_min_kg: f64,
    pub weight_max_kg: f64,
    pub base_rate: f64,
    pub per_kg_rate: f64,
    pub remote_area_multiplier: f64,
    pub currency: String,
    pub is_active: bool,
}

impl RateRule {
    pub fn matches(&self, from: &CountryCode, to: &CountryCode, weight_kg: f64) -> bool {
        self.is_active
            && &self.from_country == from
            && &self.to_country == to
            && self.weight_min_kg <= weight_kg
            && weight_kg <= self.weight_max_kg
    }

    pub fn bracket_width(&self) -> f64 {
        self.weight_max_kg - self.weight_min_kg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Api,
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentEstimate {
    pub estimated_cost: f64,
    pub currency: String,
    pub service_level: String,
    pub delivery_days_min: u32,
    pub delivery_days_max: u32,
    pub is_international: bool,
    pub is_remote_area: bool,
    pub estimation_method: EstimationMethod,
    /// Carrier that produced a live quote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    /// Vendor rate object that label issuance can purchase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_rate_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomsItem {
    pub description: String,
    pub quantity: u32,
    pub value_amount: f64,
    pub value_currency: String,
    pub net_weight_kg: f64,
    pub origin_country: CountryCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomsInfo {
    pub contents_type: String,
    #[serde(default)]
    pub contents_explanation: Option<String>,
    #[serde(default)]
    pub non_delivery_option: Option<String>,
    #[serde(default)]
    pub items: Vec<CustomsItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentMetadata {
    pub is_international: bool,
    pub is_remote_area: bool,
    pub delivery_days_min: u32,
    pub delivery_days_max: u32,
    pub estimation_method: EstimationMethod,
}

impl From<&ShipmentEstimate> for ShipmentMetadata {
    fn from(estimate: &ShipmentEstimate) -> Self {
        Self {
            is_international: estimate.is_international,
            is_remote_area: estimate.is_remote_area,
            delivery_days_min: estimate.delivery_days_min,
            delivery_days_max: estimate.delivery_days_max,
            estimation_method: estimate.estimation_method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: String,
    pub order_id: String,
    pub courier_provider: String,
    pub tracking_number: Option<String>,
    pub label_url: Option<String>,
    #[serde(default)]
    pub carrier_rate_id: Option<String>,
    pub from_address: Address,
    pub to_address: Address,
    pub weight_kg: f64,
    pub estimated_cost: f64,
    pub final_cost: Option<f64>,
    pub currency: String,
    pub service_level: String,
    pub status: ShipmentStatus,
    pub carrier_tracking_status: Option<String>,
    pub customs_info: Option<CustomsInfo>,
    pub ship_date: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub metadata: ShipmentMetadata,
    pub created_at: DateTime<Utc>,
}

/// Inbound carrier webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    /// Vendor event identity, when the carrier provides one.
    #[serde(default)]
    pub event_id: Option<String>,
    pub tracking_number: String,
    pub status: String,
    #[serde(default)]
    pub status_details: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub carrier_status_code: Option<String>,
}

impl TrackingUpdate {
    /// Vendor id when present. Otherwise the payload itself: the timestamp, or
    /// the scan's location, details and code when the carrier sent no timestamp.
    pub fn dedup_key(&self) -> String {
        if let Some(id) = self.event_id.as_deref().filter(|id| !id.trim().is_empty()) {
            return format!("vendor:{}", id.trim());
        }
        let identity = match self.occurred_at {
            Some(t) => t.to_rfc3339(),
            None => format!(
                "untimed:{}|{}|{}",
                self.location.as_deref().unwrap_or("").trim(),
                self.status_details.as_deref().unwrap_or("").trim(),
                self.carrier_status_code.as_deref().unwrap_or("").trim()
            ),
        };
        format!(
            "derived:{}|{}|{}",
            self.tracking_number.trim(),
            self.status.trim().to_ascii_lowercase(),
            identity
        )
    }
}

/// Immutable history row appended for every accepted carrier event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_id: String,
    pub shipment_id: String,
    pub status: String,
    pub canonical_status: Option<CanonicalStatus>,
    pub status_details: Option<String>,
    pub location: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub carrier_status_code: Option<String>,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierConfig {
    pub country: CountryCode,
    #[serde(default)]
    pub preferred_carriers: Vec<String>,
    #[serde(default)]
    pub backup_carriers: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CourierConfig {
    pub fn pick(&self) -> Option<&str> {
        if !self.is_active {
            return None;
        }
        self.preferred_carriers
            .iter()
            .chain(self.backup_carriers.iter())
            .map(|c| c.trim())
            .find(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedLabel {
    pub tracking_number: String,
    pub label_url: Option<String>,
    pub final_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub from_address: Address,
    pub to_address: Address,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    pub order_id: String,
    pub from_address: Address,
    pub to_address: Address,
    pub weight_kg: f64,
    #[serde(default)]
    pub customs_info: Option<CustomsInfo>,
}
