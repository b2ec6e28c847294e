#![allow(dead_code)]

use async_trait::async_trait;
use relocal_shipping::domain::model::IssuedLabel;
use relocal_shipping::domain::ports::{LabelIssuer, QuoteOutcome, RateProvider, UnavailableReason};
use relocal_shipping::{
    Address, CountryCode, CreateShipmentRequest, EstimationMethod, Shipment, ShipmentEstimate,
    ShippingError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn address(country: &str, city: &str) -> Address {
    Address {
        name: "Test Receiver".to_string(),
        street1: "221B Market Road".to_string(),
        street2: None,
        city: city.to_string(),
        state: None,
        postal_code: "110001".to_string(),
        country: CountryCode::parse(country).unwrap(),
        phone: Some("+91-9000000000".to_string()),
        email: None,
    }
}

pub fn create_request(order_id: &str, from: Address, to: Address, weight_kg: f64) -> CreateShipmentRequest {
    CreateShipmentRequest {
        order_id: order_id.to_string(),
        from_address: from,
        to_address: to,
        weight_kg,
        customs_info: None,
    }
}

/// Rate provider double that answers with a fixed outcome and counts calls.
pub struct StaticProvider {
    outcome: QuoteOutcome,
    pub calls: AtomicUsize,
}

impl StaticProvider {
    pub fn quoting(estimate: ShipmentEstimate) -> Arc<Self> {
        Arc::new(Self {
            outcome: QuoteOutcome::Quoted(estimate),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unavailable(reason: UnavailableReason) -> Arc<Self> {
        Arc::new(Self {
            outcome: QuoteOutcome::Unavailable(reason),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn quote(&self, _from: &Address, _to: &Address, _weight_kg: f64) -> QuoteOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

pub fn api_estimate(cost: f64, carrier: &str) -> ShipmentEstimate {
    ShipmentEstimate {
        estimated_cost: cost,
        currency: "USD".to_string(),
        service_level: "Priority".to_string(),
        delivery_days_min: 3,
        delivery_days_max: 4,
        is_international: false,
        is_remote_area: false,
        estimation_method: EstimationMethod::Api,
        carrier: Some(carrier.to_string()),
        carrier_rate_id: Some("rate_123".to_string()),
    }
}

/// Label issuer double. Succeeds with `TRK-<shipment_id>` unless built failing.
pub struct FakeLabelIssuer {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeLabelIssuer {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LabelIssuer for FakeLabelIssuer {
    async fn issue_label(&self, shipment: &Shipment) -> relocal_shipping::Result<IssuedLabel> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ShippingError::LabelError {
                message: "carrier rejected the purchase".to_string(),
            });
        }
        Ok(IssuedLabel {
            tracking_number: format!("TRK-{}", shipment.shipment_id),
            label_url: Some(format!("https://labels.example/{}.pdf", shipment.shipment_id)),
            final_cost: Some(shipment.estimated_cost + 1.0),
        })
    }
}
