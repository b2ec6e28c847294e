use crate::core::rule_resolver::RuleResolver;
use crate::domain::model::{Address, EstimationMethod, ShipmentEstimate};
use crate::domain::ports::{QuoteOutcome, RateProvider, ShippingStore};
use crate::utils::error::Result;
use crate::utils::validation::{validate_address, validate_weight};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub min: u32,
    pub max: u32,
}

impl DayWindow {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Delivery-day buckets, checked in the order international, remote, domestic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryWindows {
    pub international: DayWindow,
    pub remote: DayWindow,
    pub domestic: DayWindow,
}

impl Default for DeliveryWindows {
    fn default() -> Self {
        Self {
            international: DayWindow::new(7, 14),
            remote: DayWindow::new(5, 10),
            domestic: DayWindow::new(2, 5),
        }
    }
}

impl DeliveryWindows {
    pub fn pick(&self, is_international: bool, is_remote: bool) -> DayWindow {
        if is_international {
            self.international
        } else if is_remote {
            self.remote
        } else {
            self.domestic
        }
    }
}

/// Rounds a monetary amount to two decimals, half away from zero.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub struct ShippingEstimator<S: ShippingStore> {
    resolver: RuleResolver<S>,
    provider: Option<Arc<dyn RateProvider>>,
    windows: DeliveryWindows,
}

impl<S: ShippingStore> ShippingEstimator<S> {
    pub fn new(
        resolver: RuleResolver<S>,
        provider: Option<Arc<dyn RateProvider>>,
        windows: DeliveryWindows,
    ) -> Self {
        Self {
            resolver,
            provider,
            windows,
        }
    }

    /// Live quote when a provider is configured and answers, otherwise the
    /// rule-based fallback. Only input validation can make this fail.
    #[tracing::instrument(skip_all, fields(from = %from.country, to = %to.country, weight_kg = weight_kg))]
    pub async fn estimate(
        &self,
        from: &Address,
        to: &Address,
        weight_kg: f64,
    ) -> Result<ShipmentEstimate> {
        validate_address("from_address", from)?;
        validate_address("to_address", to)?;
        validate_weight(weight_kg)?;

        let is_international = from.country != to.country;
        let is_remote = self.resolver.table().is_remote(to);

        if let Some(provider) = &self.provider {
            match provider.quote(from, to, weight_kg).await {
                QuoteOutcome::Quoted(mut estimate) => {
                    estimate.is_remote_area = is_remote;
                    estimate.is_international = is_international;
                    tracing::info!(
                        "Live quote from {}: {} {} ({})",
                        provider.name(),
                        estimate.estimated_cost,
                        estimate.currency,
                        estimate.service_level
                    );
                    return Ok(estimate);
                }
                QuoteOutcome::Unavailable(reason) => {
                    tracing::warn!(
                        "Rate provider {} unavailable: {}, falling back to rules",
                        provider.name(),
                        reason
                    );
                }
            }
        }

        Ok(self
            .estimate_via_rules(from, to, weight_kg, is_international, is_remote)
            .await)
    }

    async fn estimate_via_rules(
        &self,
        from: &Address,
        to: &Address,
        weight_kg: f64,
        is_international: bool,
        is_remote: bool,
    ) -> ShipmentEstimate {
        let rate = self
            .resolver
            .resolve(&from.country, &to.country, weight_kg, is_remote)
            .await;

        let cost = (rate.base_rate + weight_kg * rate.per_kg_rate) * rate.remote_multiplier;
        let window = self.windows.pick(is_international, is_remote);

        ShipmentEstimate {
            estimated_cost: round_money(cost.max(0.0)),
            currency: rate.currency,
            service_level: "standard".to_string(),
            delivery_days_min: window.min.min(window.max),
            delivery_days_max: window.max.max(window.min),
            is_international,
            is_remote_area: is_remote,
            estimation_method: EstimationMethod::RuleBased,
            carrier: None,
            carrier_rate_id: None,
        }
    }
}
