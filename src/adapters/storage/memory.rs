use crate::domain::model::{CountryCode, OrderStatus, RateRule, Shipment, TrackingEvent};
use crate::domain::ports::ShippingStore;
use crate::utils::error::{Result, ShippingError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    rate_rules: Vec<RateRule>,
    shipments: BTreeMap<String, Shipment>,
    tracking_events: Vec<TrackingEvent>,
    seen_events: HashSet<String>,
    orders: HashMap<String, OrderStatus>,
}

/// In-process store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_rules(rules: Vec<RateRule>) -> Self {
        let store = Self::new();
        store.state.lock().await.rate_rules = rules;
        store
    }

    pub async fn seed_order(&self, order_id: &str, status: OrderStatus) {
        self.state
            .lock()
            .await
            .orders
            .insert(order_id.to_string(), status);
    }
}

impl ShippingStore for MemoryStore {
    async fn matching_rate_rules(
        &self,
        from: &CountryCode,
        to: &CountryCode,
        weight_kg: f64,
    ) -> Result<Vec<RateRule>> {
        let state = self.state.lock().await;
        Ok(state
            .rate_rules
            .iter()
            .filter(|r| r.matches(from, to, weight_kg))
            .cloned()
            .collect())
    }

    async fn put_rate_rule(&self, rule: RateRule) -> Result<()> {
        let mut state = self.state.lock().await;
        state.rate_rules.retain(|r| r.rule_id != rule.rule_id);
        state.rate_rules.push(rule);
        Ok(())
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.shipments.contains_key(&shipment.shipment_id) {
            return Err(ShippingError::ShipmentConflict {
                shipment_id: shipment.shipment_id.clone(),
            });
        }
        state
            .shipments
            .insert(shipment.shipment_id.clone(), shipment.clone());
        Ok(())
    }

    async fn get_shipment(&self, shipment_id: &str) -> Result<Option<Shipment>> {
        Ok(self.state.lock().await.shipments.get(shipment_id).cloned())
    }

    async fn find_shipment_by_tracking(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let state = self.state.lock().await;
        Ok(state
            .shipments
            .values()
            .find(|s| s.tracking_number.as_deref() == Some(tracking_number))
            .cloned())
    }

    async fn update_shipment<F, R>(&self, shipment_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Shipment) -> R + Send,
        R: Send,
    {
        let mut state = self.state.lock().await;
        let shipment =
            state
                .shipments
                .get_mut(shipment_id)
                .ok_or_else(|| ShippingError::ShipmentNotFound {
                    shipment_id: shipment_id.to_string(),
                })?;
        Ok(f(shipment))
    }

    async fn append_tracking_event(&self, event: &TrackingEvent) -> Result<()> {
        self.state.lock().await.tracking_events.push(event.clone());
        Ok(())
    }

    async fn tracking_events(&self, shipment_id: &str) -> Result<Vec<TrackingEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .tracking_events
            .iter()
            .filter(|e| e.shipment_id == shipment_id)
            .cloned()
            .collect())
    }

    async fn mark_event_seen(&self, key: &str) -> Result<bool> {
        Ok(self.state.lock().await.seen_events.insert(key.to_string()))
    }

    async fn forget_event(&self, key: &str) -> Result<()> {
        self.state.lock().await.seen_events.remove(key);
        Ok(())
    }

    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        self.state
            .lock()
            .await
            .orders
            .insert(order_id.to_string(), status);
        Ok(())
    }

    async fn order_status(&self, order_id: &str) -> Result<Option<OrderStatus>> {
        Ok(self.state.lock().await.orders.get(order_id).copied())
    }
}
