use crate::config::toml_config::{CarrierConfig, ParcelConfig};
use crate::core::estimator::round_money;
use crate::domain::model::{Address, EstimationMethod, IssuedLabel, Shipment, ShipmentEstimate};
use crate::domain::ports::{LabelIssuer, QuoteOutcome, RateProvider, UnavailableReason};
use crate::utils::error::{Result, ShippingError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::time::Duration;

/// Days assumed when a quote carries no transit estimate.
const FALLBACK_DAYS_MIN: u32 = 5;
const FALLBACK_DAYS_MAX: u32 = 7;

#[derive(Debug, Deserialize)]
struct ShipmentResponse {
    #[serde(default)]
    rates: Vec<Rate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Rate {
    #[serde(default)]
    object_id: Option<String>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    servicelevel: Option<ServiceLevel>,
    #[serde(default)]
    estimated_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceLevel {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    label_url: Option<String>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    messages: Vec<Value>,
}

/// Carrier amounts arrive as decimal strings; plain numbers are accepted too.
fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

fn cheapest(rates: &[Rate]) -> Option<(&Rate, f64)> {
    rates
        .iter()
        .filter(|r| r.currency.as_deref().is_some_and(|c| !c.trim().is_empty()))
        .filter_map(|r| r.amount.as_ref().and_then(parse_amount).map(|a| (r, a)))
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

fn address_payload(address: &Address) -> Value {
    json!({
        "name": address.name,
        "street1": address.street1,
        "street2": address.street2.clone().unwrap_or_default(),
        "city": address.city,
        "state": address.state.clone().unwrap_or_default(),
        "zip": address.postal_code,
        "country": address.country.as_str(),
        "phone": address.phone.clone().unwrap_or_default(),
        "email": address.email.clone().unwrap_or_default(),
    })
}

/// Shippo-compatible carrier API client: live rates and label purchase.
pub struct ShippoClient {
    client: Client,
    api_url: String,
    api_key: String,
    parcel: ParcelConfig,
}

impl ShippoClient {
    pub fn new(
        api_url: &str,
        api_key: &str,
        timeout: Duration,
        parcel: ParcelConfig,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            parcel,
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &CarrierConfig) -> Result<Option<Self>> {
        match config.api_key() {
            Some(key) => Self::new(&config.api_url, key, config.timeout(), config.parcel).map(Some),
            None => Ok(None),
        }
    }

    fn auth_header(&self) -> String {
        format!("ShippoToken {}", self.api_key)
    }

    fn shipment_payload(&self, from: &Address, to: &Address, weight_kg: f64) -> Value {
        json!({
            "address_from": address_payload(from),
            "address_to": address_payload(to),
            "parcels": [{
                "length": self.parcel.length_cm.to_string(),
                "width": self.parcel.width_cm.to_string(),
                "height": self.parcel.height_cm.to_string(),
                "distance_unit": "cm",
                "weight": weight_kg.to_string(),
                "mass_unit": "kg",
            }],
            "async": false,
        })
    }
}

#[async_trait]
impl RateProvider for ShippoClient {
    fn name(&self) -> &str {
        "shippo"
    }

    async fn quote(&self, from: &Address, to: &Address, weight_kg: f64) -> QuoteOutcome {
        let url = format!("{}/shipments", self.api_url);
        tracing::debug!("Requesting carrier rates from: {}", url);

        let response = match self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&self.shipment_payload(from, to, weight_kg))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return QuoteOutcome::Unavailable(UnavailableReason::Timeout),
            Err(e) => {
                return QuoteOutcome::Unavailable(UnavailableReason::Transport(e.to_string()))
            }
        };

        let status = response.status();
        tracing::debug!("Carrier rate response status: {}", status);
        if !status.is_success() {
            return QuoteOutcome::Unavailable(UnavailableReason::Status(status.as_u16()));
        }

        let body: ShipmentResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return QuoteOutcome::Unavailable(UnavailableReason::Timeout),
            Err(e) => {
                return QuoteOutcome::Unavailable(UnavailableReason::Malformed(e.to_string()))
            }
        };

        let Some((rate, amount)) = cheapest(&body.rates) else {
            return QuoteOutcome::Unavailable(UnavailableReason::NoRates);
        };

        let (days_min, days_max) = match rate.estimated_days {
            Some(days) => (days, days),
            None => (FALLBACK_DAYS_MIN, FALLBACK_DAYS_MAX),
        };

        QuoteOutcome::Quoted(ShipmentEstimate {
            estimated_cost: round_money(amount),
            currency: rate.currency.clone().unwrap_or_default().trim().to_uppercase(),
            service_level: rate
                .servicelevel
                .as_ref()
                .and_then(|s| s.name.clone())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "standard".to_string()),
            delivery_days_min: days_min,
            delivery_days_max: days_max,
            is_international: from.country != to.country,
            is_remote_area: false,
            estimation_method: EstimationMethod::Api,
            carrier: Some(rate.provider.clone().unwrap_or_else(|| "Unknown".to_string())),
            carrier_rate_id: rate.object_id.clone(),
        })
    }
}

#[async_trait]
impl LabelIssuer for ShippoClient {
    async fn issue_label(&self, shipment: &Shipment) -> Result<IssuedLabel> {
        let rate_id = shipment
            .carrier_rate_id
            .as_deref()
            .ok_or_else(|| ShippingError::LabelError {
                message: format!("shipment {} has no carrier rate to purchase", shipment.shipment_id),
            })?;

        let url = format!("{}/transactions", self.api_url);
        tracing::debug!("Purchasing label for {} via {}", shipment.shipment_id, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({
                "rate": rate_id,
                "label_file_type": "PDF",
                "async": false,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShippingError::LabelError {
                message: format!("carrier returned HTTP {}", status.as_u16()),
            });
        }

        let body: TransactionResponse = response.json().await?;
        if body.status.as_deref() != Some("SUCCESS") {
            return Err(ShippingError::LabelError {
                message: format!(
                    "transaction status {:?}: {}",
                    body.status,
                    Value::Array(body.messages)
                ),
            });
        }

        let tracking_number = body
            .tracking_number
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ShippingError::LabelError {
                message: "transaction succeeded without a tracking number".to_string(),
            })?;

        Ok(IssuedLabel {
            tracking_number,
            label_url: body.label_url,
            final_cost: body.amount.as_ref().and_then(parse_amount).map(round_money),
        })
    }
}
