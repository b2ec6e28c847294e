use crate::adapters::storage::MemoryStore;
use crate::domain::model::{CountryCode, OrderStatus, RateRule, Shipment, TrackingEvent};
use crate::domain::ports::ShippingStore;
use crate::utils::error::{Result, ShippingError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `MemoryStore` with injectable failures on the rule and order paths.
#[derive(Debug, Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    rule_delay: Option<Duration>,
    rules_broken: Arc<AtomicBool>,
    order_write_failures: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn with_rule_delay(mut self, delay: Duration) -> Self {
        self.rule_delay = Some(delay);
        self
    }

    pub fn break_rules(&self) {
        self.rules_broken.store(true, Ordering::SeqCst);
    }

    pub fn fail_order_writes(&self, times: usize) {
        self.order_write_failures.store(times, Ordering::SeqCst);
    }
}

impl ShippingStore for FaultyStore {
    async fn matching_rate_rules(
        &self,
        from: &CountryCode,
        to: &CountryCode,
        weight_kg: f64,
    ) -> Result<Vec<RateRule>> {
        if let Some(delay) = self.rule_delay {
            tokio::time::sleep(delay).await;
        }
        if self.rules_broken.load(Ordering::SeqCst) {
            return Err(ShippingError::StoreError {
                message: "rate_rules unavailable".into(),
            });
        }
        self.inner.matching_rate_rules(from, to, weight_kg).await
    }

    async fn put_rate_rule(&self, rule: RateRule) -> Result<()> {
        self.inner.put_rate_rule(rule).await
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<()> {
        self.inner.insert_shipment(shipment).await
    }

    async fn get_shipment(&self, shipment_id: &str) -> Result<Option<Shipment>> {
        self.inner.get_shipment(shipment_id).await
    }

    async fn find_shipment_by_tracking(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        self.inner.find_shipment_by_tracking(tracking_number).await
    }

    async fn update_shipment<F, R>(&self, shipment_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Shipment) -> R + Send,
        R: Send,
    {
        self.inner.update_shipment(shipment_id, f).await
    }

    async fn append_tracking_event(&self, event: &TrackingEvent) -> Result<()> {
        self.inner.append_tracking_event(event).await
    }

    async fn tracking_events(&self, shipment_id: &str) -> Result<Vec<TrackingEvent>> {
        self.inner.tracking_events(shipment_id).await
    }

    async fn mark_event_seen(&self, key: &str) -> Result<bool> {
        self.inner.mark_event_seen(key).await
    }

    async fn forget_event(&self, key: &str) -> Result<()> {
        self.inner.forget_event(key).await
    }

    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        let remaining = self.order_write_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.order_write_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(ShippingError::StoreError {
                message: "orders unavailable".into(),
            });
        }
        self.inner.set_order_status(order_id, status).await
    }

    async fn order_status(&self, order_id: &str) -> Result<Option<OrderStatus>> {
        self.inner.order_status(order_id).await
    }
}
