use crate::core::estimator::ShippingEstimator;
use crate::domain::model::{
    CountryCode, CourierConfig, CreateShipmentRequest, Shipment, ShipmentEstimate,
    ShipmentMetadata,
};
use crate::domain::ports::{LabelIssuer, ShippingStore};
use crate::domain::status::ShipmentStatus;
use crate::utils::deadline::bounded;
use crate::utils::error::{Result, ShippingError};
use crate::utils::validation::validate_required_text;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Same-day attempts for one order before giving up on a free shipment id.
const MAX_ID_ATTEMPTS: u32 = 50;

/// `ship_<YYYYMMDD>_<last 8 chars of order id>`, suffixed `_<n>` for repeat attempts.
pub fn shipment_id_for(order_id: &str, created_at: DateTime<Utc>, attempt: u32) -> String {
    let chars: Vec<char> = order_id.trim().chars().collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    let base = format!("ship_{}_{}", created_at.format("%Y%m%d"), tail);
    if attempt <= 1 {
        base
    } else {
        format!("{}_{}", base, attempt)
    }
}

pub struct LifecycleSettings {
    pub couriers: Vec<CourierConfig>,
    pub default_courier: String,
    pub labels_enabled: bool,
    pub store_timeout: Duration,
}

pub struct ShipmentLifecycle<S: ShippingStore> {
    store: S,
    estimator: Arc<ShippingEstimator<S>>,
    label_issuer: Option<Arc<dyn LabelIssuer>>,
    settings: LifecycleSettings,
}

impl<S: ShippingStore> ShipmentLifecycle<S> {
    pub fn new(
        store: S,
        estimator: Arc<ShippingEstimator<S>>,
        label_issuer: Option<Arc<dyn LabelIssuer>>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            estimator,
            label_issuer,
            settings,
        }
    }

    fn choose_courier(&self, estimate: &ShipmentEstimate, origin: &CountryCode) -> String {
        if let Some(carrier) = estimate.carrier.as_deref().filter(|c| !c.trim().is_empty()) {
            return carrier.to_string();
        }
        self.settings
            .couriers
            .iter()
            .filter(|c| &c.country == origin)
            .find_map(|c| c.pick())
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.default_courier.clone())
    }

    /// Estimates, persists a `pending` shipment, then tries label issuance.
    /// Label failures leave the shipment `pending` and never fail creation.
    #[tracing::instrument(skip_all, fields(order_id = %request.order_id))]
    pub async fn create(&self, request: CreateShipmentRequest) -> Result<Shipment> {
        validate_required_text("order_id", &request.order_id)?;

        let estimate = self
            .estimator
            .estimate(&request.from_address, &request.to_address, request.weight_kg)
            .await?;

        let created_at = Utc::now();
        let courier_provider = self.choose_courier(&estimate, &request.from_address.country);
        let mut shipment = Shipment {
            shipment_id: String::new(),
            order_id: request.order_id.trim().to_string(),
            courier_provider,
            tracking_number: None,
            label_url: None,
            carrier_rate_id: estimate.carrier_rate_id.clone(),
            from_address: request.from_address,
            to_address: request.to_address,
            weight_kg: request.weight_kg,
            estimated_cost: estimate.estimated_cost,
            final_cost: None,
            currency: estimate.currency.clone(),
            service_level: estimate.service_level.clone(),
            status: ShipmentStatus::Pending,
            carrier_tracking_status: None,
            customs_info: request.customs_info,
            ship_date: None,
            estimated_delivery: Some(
                created_at + ChronoDuration::days(i64::from(estimate.delivery_days_max)),
            ),
            actual_delivery: None,
            metadata: ShipmentMetadata::from(&estimate),
            created_at,
        };

        self.insert_with_fresh_id(&mut shipment).await?;
        tracing::info!(
            "Created shipment {} via {} ({} {})",
            shipment.shipment_id,
            shipment.courier_provider,
            shipment.estimated_cost,
            shipment.currency
        );

        if let Some(labelled) = self.try_issue_label(&shipment).await {
            return Ok(labelled);
        }
        Ok(shipment)
    }

    async fn insert_with_fresh_id(&self, shipment: &mut Shipment) -> Result<()> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            shipment.shipment_id = shipment_id_for(&shipment.order_id, shipment.created_at, attempt);
            match bounded(
                "insert_shipment",
                self.settings.store_timeout,
                self.store.insert_shipment(shipment),
            )
            .await
            {
                Ok(()) => return Ok(()),
                Err(ShippingError::ShipmentConflict { shipment_id }) => {
                    tracing::debug!("Shipment id {} taken, trying next suffix", shipment_id);
                }
                Err(e) => return Err(e),
            }
        }
        Err(ShippingError::ShipmentConflict {
            shipment_id: shipment_id_for(&shipment.order_id, shipment.created_at, 1),
        })
    }

    async fn try_issue_label(&self, shipment: &Shipment) -> Option<Shipment> {
        if !self.settings.labels_enabled {
            return None;
        }
        let issuer = self.label_issuer.as_ref()?;

        let label = match issuer.issue_label(shipment).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(
                    "Label issuance failed for {}: {}, shipment stays pending",
                    shipment.shipment_id,
                    e
                );
                return None;
            }
        };

        let updated = bounded(
            "update_shipment",
            self.settings.store_timeout,
            self.store.update_shipment(&shipment.shipment_id, |s| {
                if !s.status.can_advance_to(ShipmentStatus::LabelCreated) {
                    return None;
                }
                s.status = ShipmentStatus::LabelCreated;
                s.tracking_number = Some(label.tracking_number.clone());
                s.label_url = label.label_url.clone();
                s.carrier_tracking_status = Some(ShipmentStatus::LabelCreated.as_str().to_string());
                if label.final_cost.is_some() {
                    s.final_cost = label.final_cost;
                }
                Some(s.clone())
            }),
        )
        .await;

        match updated {
            Ok(Some(shipment)) => {
                tracing::info!(
                    "Label created for {} (tracking {})",
                    shipment.shipment_id,
                    label.tracking_number
                );
                Some(shipment)
            }
            Ok(None) => {
                tracing::warn!(
                    "Shipment {} moved on before its label was recorded",
                    shipment.shipment_id
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    "Failed to record label for {}: {}",
                    shipment.shipment_id,
                    e
                );
                None
            }
        }
    }

    /// Operator-driven transition (e.g. carrier pickup), checked against the
    /// state machine.
    #[tracing::instrument(skip(self))]
    pub async fn advance(&self, shipment_id: &str, next: ShipmentStatus) -> Result<Shipment> {
        let now = Utc::now();
        let outcome = bounded(
            "update_shipment",
            self.settings.store_timeout,
            self.store.update_shipment(shipment_id, |s| {
                if !s.status.can_advance_to(next) {
                    return Err(ShippingError::InvalidStateTransition {
                        from: s.status.to_string(),
                        to: next.to_string(),
                    });
                }
                s.status = next;
                match next {
                    ShipmentStatus::PickedUp | ShipmentStatus::InTransit => {
                        s.ship_date.get_or_insert(now);
                    }
                    ShipmentStatus::Delivered => s.actual_delivery = Some(now),
                    _ => {}
                }
                Ok(s.clone())
            }),
        )
        .await??;

        tracing::info!("Shipment {} advanced to {}", shipment_id, next);
        Ok(outcome)
    }

    pub async fn shipment(&self, shipment_id: &str) -> Result<Shipment> {
        bounded(
            "get_shipment",
            self.settings.store_timeout,
            self.store.get_shipment(shipment_id),
        )
        .await?
        .ok_or_else(|| ShippingError::ShipmentNotFound {
            shipment_id: shipment_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_shipment_id_uses_date_and_order_tail() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(
            shipment_id_for("order_1234abcd5678", at, 1),
            "ship_20260309_abcd5678"
        );
        assert_eq!(
            shipment_id_for("order_1234abcd5678", at, 3),
            "ship_20260309_abcd5678_3"
        );
    }

    #[test]
    fn test_shipment_id_short_order_id() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(shipment_id_for("o42", at, 1), "ship_20260101_o42");
    }
}
