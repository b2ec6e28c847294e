use crate::adapters::http::ShippoClient;
use crate::config::toml_config::ShippingConfig;
use crate::core::estimator::ShippingEstimator;
use crate::core::lifecycle::{LifecycleSettings, ShipmentLifecycle};
use crate::core::rule_resolver::RuleResolver;
use crate::core::tracking::{IngestOutcome, TrackingIngest};
use crate::domain::model::{
    Address, CreateShipmentRequest, Shipment, ShipmentEstimate, TrackingEvent, TrackingUpdate,
};
use crate::domain::ports::{LabelIssuer, RateProvider, ShippingStore};
use crate::domain::status::ShipmentStatus;
use crate::utils::deadline::bounded;
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Entry points exposed to the order and webhook collaborators.
pub struct ShippingService<S: ShippingStore + Clone> {
    store: S,
    estimator: Arc<ShippingEstimator<S>>,
    lifecycle: ShipmentLifecycle<S>,
    tracking: TrackingIngest<S>,
    store_timeout: Duration,
}

impl<S: ShippingStore + Clone> ShippingService<S> {
    pub fn new(
        store: S,
        config: &ShippingConfig,
        provider: Option<Arc<dyn RateProvider>>,
        label_issuer: Option<Arc<dyn LabelIssuer>>,
    ) -> Self {
        let store_timeout = config.storage.timeout();
        let resolver = RuleResolver::new(
            store.clone(),
            Arc::new(config.rates.clone()),
            store_timeout,
        );
        let estimator = Arc::new(ShippingEstimator::new(
            resolver,
            provider,
            config.delivery_windows,
        ));
        let lifecycle = ShipmentLifecycle::new(
            store.clone(),
            Arc::clone(&estimator),
            label_issuer,
            LifecycleSettings {
                couriers: config.couriers.clone(),
                default_courier: config.default_courier.clone(),
                labels_enabled: config.labels.enabled,
                store_timeout,
            },
        );
        let tracking = TrackingIngest::new(store.clone(), store_timeout);

        Self {
            store,
            estimator,
            lifecycle,
            tracking,
            store_timeout,
        }
    }

    /// Wires the carrier HTTP client in when an API key is configured.
    pub fn from_config(store: S, config: &ShippingConfig) -> Result<Self> {
        match ShippoClient::from_config(&config.carrier)? {
            Some(client) => {
                tracing::info!("Carrier rate API enabled at {}", config.carrier.api_url);
                let client = Arc::new(client);
                let provider: Arc<dyn RateProvider> = client.clone();
                let issuer: Arc<dyn LabelIssuer> = client;
                Ok(Self::new(store, config, Some(provider), Some(issuer)))
            }
            None => {
                tracing::info!("No carrier API key configured, using rule-based estimates only");
                Ok(Self::new(store, config, None, None))
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn estimate(
        &self,
        from: &Address,
        to: &Address,
        weight_kg: f64,
    ) -> Result<ShipmentEstimate> {
        self.estimator.estimate(from, to, weight_kg).await
    }

    pub async fn create_shipment(&self, request: CreateShipmentRequest) -> Result<Shipment> {
        self.lifecycle.create(request).await
    }

    /// `true` when the event was recorded against a shipment.
    pub async fn ingest_tracking_event(&self, update: TrackingUpdate) -> Result<bool> {
        Ok(self.tracking.ingest(update).await?.is_applied())
    }

    pub async fn ingest(&self, update: TrackingUpdate) -> Result<IngestOutcome> {
        self.tracking.ingest(update).await
    }

    pub async fn advance_shipment(
        &self,
        shipment_id: &str,
        next: ShipmentStatus,
    ) -> Result<Shipment> {
        self.lifecycle.advance(shipment_id, next).await
    }

    pub async fn shipment(&self, shipment_id: &str) -> Result<Shipment> {
        self.lifecycle.shipment(shipment_id).await
    }

    /// History in occurrence order; receipt time breaks ties.
    pub async fn tracking_history(&self, shipment_id: &str) -> Result<Vec<TrackingEvent>> {
        let mut events = bounded(
            "tracking_events",
            self.store_timeout,
            self.store.tracking_events(shipment_id),
        )
        .await?;
        events.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(events)
    }
}
