use crate::domain::model::{OrderStatus, TrackingEvent, TrackingUpdate};
use crate::domain::ports::ShippingStore;
use crate::domain::status::{CanonicalStatus, ShipmentStatus};
use crate::utils::deadline::bounded;
use crate::utils::error::Result;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Event recorded. `status_changed` is false for unmapped vendor statuses
    /// and for events that arrive after a terminal state.
    Applied {
        shipment_id: String,
        status: ShipmentStatus,
        status_changed: bool,
    },
    /// Same event seen before; nothing was written.
    Duplicate { shipment_id: String },
    /// No shipment carries this tracking number; event dropped.
    UnknownShipment,
}

impl IngestOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, IngestOutcome::Applied { .. })
    }
}

pub struct TrackingIngest<S: ShippingStore> {
    store: S,
    store_timeout: Duration,
}

impl<S: ShippingStore> TrackingIngest<S> {
    pub fn new(store: S, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    #[tracing::instrument(skip_all, fields(tracking_number = %update.tracking_number, status = %update.status))]
    pub async fn ingest(&self, update: TrackingUpdate) -> Result<IngestOutcome> {
        let tracking_number = update.tracking_number.trim();
        if tracking_number.is_empty() {
            tracing::warn!("Tracking event without tracking number dropped");
            return Ok(IngestOutcome::UnknownShipment);
        }

        let shipment = bounded(
            "find_shipment_by_tracking",
            self.store_timeout,
            self.store.find_shipment_by_tracking(tracking_number),
        )
        .await?;
        let Some(shipment) = shipment else {
            tracing::warn!("Shipment not found for tracking: {}", tracking_number);
            return Ok(IngestOutcome::UnknownShipment);
        };

        let dedup_key = update.dedup_key();
        let first_seen = bounded(
            "mark_event_seen",
            self.store_timeout,
            self.store.mark_event_seen(&dedup_key),
        )
        .await?;
        if !first_seen {
            tracing::info!(
                "Duplicate tracking event {} for {} ignored",
                dedup_key,
                shipment.shipment_id
            );
            return Ok(IngestOutcome::Duplicate {
                shipment_id: shipment.shipment_id,
            });
        }

        match self.apply(&shipment.shipment_id, &update, &dedup_key).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Release the key so the carrier's redelivery can be applied.
                if let Err(forget_err) = bounded(
                    "forget_event",
                    self.store_timeout,
                    self.store.forget_event(&dedup_key),
                )
                .await
                {
                    tracing::error!("Failed to release event key {}: {}", dedup_key, forget_err);
                }
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        shipment_id: &str,
        update: &TrackingUpdate,
        dedup_key: &str,
    ) -> Result<IngestOutcome> {
        let now = Utc::now();
        let canonical = CanonicalStatus::from_vendor(&update.status);
        if canonical.is_none() {
            tracing::debug!("Vendor status '{}' has no canonical mapping", update.status);
        }
        let occurred_at = update.occurred_at.unwrap_or(now);

        let event = TrackingEvent {
            event_id: format!("evt_{}", uuid::Uuid::new_v4().simple()),
            shipment_id: shipment_id.to_string(),
            status: update.status.clone(),
            canonical_status: canonical,
            status_details: update.status_details.clone(),
            location: update.location.clone(),
            occurred_at,
            carrier_status_code: update.carrier_status_code.clone(),
            dedup_key: dedup_key.to_string(),
            created_at: now,
        };
        bounded(
            "append_tracking_event",
            self.store_timeout,
            self.store.append_tracking_event(&event),
        )
        .await?;

        let raw_status = update.status.clone();
        let (status, status_changed, order_id) = bounded(
            "update_shipment",
            self.store_timeout,
            self.store.update_shipment(shipment_id, |s| {
                s.carrier_tracking_status = Some(raw_status);
                let next = canonical.and_then(|c| s.status.on_carrier_status(c));
                if let Some(next) = next {
                    s.status = next;
                    match next {
                        ShipmentStatus::InTransit => {
                            s.ship_date.get_or_insert(occurred_at);
                        }
                        ShipmentStatus::Delivered => s.actual_delivery = Some(occurred_at),
                        _ => {}
                    }
                }
                (s.status, next.is_some(), s.order_id.clone())
            }),
        )
        .await?;

        if status_changed {
            tracing::info!("Shipment {} is now {}", shipment_id, status);
        } else if let Some(c) = canonical {
            tracing::info!(
                "Shipment {} stays {} despite carrier status {:?}",
                shipment_id,
                status,
                c
            );
        }

        // Every delivered event re-asserts the order status, not only the transition.
        if canonical == Some(CanonicalStatus::Delivered) && status == ShipmentStatus::Delivered {
            bounded(
                "set_order_status",
                self.store_timeout,
                self.store.set_order_status(&order_id, OrderStatus::Delivered),
            )
            .await?;
            tracing::info!("Order {} marked delivered", order_id);
        }

        Ok(IngestOutcome::Applied {
            shipment_id: shipment_id.to_string(),
            status,
            status_changed,
        })
    }
}
