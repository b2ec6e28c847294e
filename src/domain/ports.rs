use crate::domain::model::{
    Address, CountryCode, IssuedLabel, OrderStatus, RateRule, Shipment, ShipmentEstimate,
    TrackingEvent,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Persistent store shared by every entry point. Each method is a single
/// atomic document operation.
pub trait ShippingStore: Send + Sync {
    /// Active rules for the country pair whose bracket contains `weight_kg`.
    fn matching_rate_rules(
        &self,
        from: &CountryCode,
        to: &CountryCode,
        weight_kg: f64,
    ) -> impl std::future::Future<Output = Result<Vec<RateRule>>> + Send;

    fn put_rate_rule(&self, rule: RateRule)
        -> impl std::future::Future<Output = Result<()>> + Send;

    /// Insert-if-absent. Fails with `ShipmentConflict` when the id is taken.
    fn insert_shipment(
        &self,
        shipment: &Shipment,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get_shipment(
        &self,
        shipment_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Shipment>>> + Send;

    fn find_shipment_by_tracking(
        &self,
        tracking_number: &str,
    ) -> impl std::future::Future<Output = Result<Option<Shipment>>> + Send;

    /// Applies `f` to the stored document and persists it in one step.
    fn update_shipment<F, R>(
        &self,
        shipment_id: &str,
        f: F,
    ) -> impl std::future::Future<Output = Result<R>> + Send
    where
        F: FnOnce(&mut Shipment) -> R + Send,
        R: Send;

    fn append_tracking_event(
        &self,
        event: &TrackingEvent,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn tracking_events(
        &self,
        shipment_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<TrackingEvent>>> + Send;

    /// Records `key` in the seen-events set. Returns `false` if it was already there.
    fn mark_event_seen(&self, key: &str) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn forget_event(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn set_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn order_status(
        &self,
        order_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<OrderStatus>>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    NotConfigured,
    Timeout,
    Transport(String),
    Status(u16),
    NoRates,
    Malformed(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NotConfigured => write!(f, "provider not configured"),
            UnavailableReason::Timeout => write!(f, "request timed out"),
            UnavailableReason::Transport(msg) => write!(f, "transport error: {}", msg),
            UnavailableReason::Status(code) => write!(f, "unexpected HTTP status {}", code),
            UnavailableReason::NoRates => write!(f, "no usable rates returned"),
            UnavailableReason::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

/// Result of asking a live carrier for a quote. `Unavailable` is always
/// recoverable by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Quoted(ShipmentEstimate),
    Unavailable(UnavailableReason),
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn quote(&self, from: &Address, to: &Address, weight_kg: f64) -> QuoteOutcome;
}

#[async_trait]
pub trait LabelIssuer: Send + Sync {
    async fn issue_label(&self, shipment: &Shipment) -> Result<IssuedLabel>;
}
