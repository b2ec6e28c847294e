use crate::core::rate_table::RateTable;
use crate::domain::model::{CountryCode, RateRule};
use crate::domain::ports::ShippingStore;
use crate::utils::deadline::bounded;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RateSource {
    PersistedRule(String),
    DefaultTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRate {
    pub base_rate: f64,
    pub per_kg_rate: f64,
    pub currency: String,
    /// 1.0 unless the destination is remote.
    pub remote_multiplier: f64,
    pub source: RateSource,
}

/// Picks the rule that applies among the candidates. Overlapping brackets are
/// broken by narrowest bracket, then higher lower bound, then rule id.
pub fn select_rule<'a>(
    rules: &'a [RateRule],
    from: &CountryCode,
    to: &CountryCode,
    weight_kg: f64,
) -> Option<&'a RateRule> {
    let mut matching: Vec<&RateRule> = rules
        .iter()
        .filter(|r| r.matches(from, to, weight_kg))
        .collect();

    if matching.len() > 1 {
        tracing::warn!(
            "{} active rate rules overlap for {}->{} at {}kg, choosing narrowest bracket",
            matching.len(),
            from,
            to,
            weight_kg
        );
    }

    matching.sort_by(|a, b| {
        a.bracket_width()
            .partial_cmp(&b.bracket_width())
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.weight_min_kg
                    .partial_cmp(&a.weight_min_kg)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
    matching.into_iter().next()
}

/// Pure resolution over already-loaded rules and the default table. Never fails.
pub fn resolve_with(
    rules: &[RateRule],
    table: &RateTable,
    from: &CountryCode,
    to: &CountryCode,
    weight_kg: f64,
    is_remote: bool,
) -> ResolvedRate {
    if let Some(rule) = select_rule(rules, from, to, weight_kg) {
        return ResolvedRate {
            base_rate: rule.base_rate,
            per_kg_rate: rule.per_kg_rate,
            currency: rule.currency.clone(),
            remote_multiplier: if is_remote {
                rule.remote_area_multiplier
            } else {
                1.0
            },
            source: RateSource::PersistedRule(rule.rule_id.clone()),
        };
    }

    let schedule = table.schedule_for(from, to);
    ResolvedRate {
        base_rate: schedule.base_rate,
        per_kg_rate: schedule.per_kg_rate,
        currency: schedule.currency.clone(),
        remote_multiplier: if is_remote {
            table.remote_multiplier
        } else {
            1.0
        },
        source: RateSource::DefaultTable,
    }
}

pub struct RuleResolver<S: ShippingStore> {
    store: S,
    table: Arc<RateTable>,
    store_timeout: Duration,
}

impl<S: ShippingStore> RuleResolver<S> {
    pub fn new(store: S, table: Arc<RateTable>, store_timeout: Duration) -> Self {
        Self {
            store,
            table,
            store_timeout,
        }
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// A failed or slow rule lookup degrades to the default table.
    pub async fn resolve(
        &self,
        from: &CountryCode,
        to: &CountryCode,
        weight_kg: f64,
        is_remote: bool,
    ) -> ResolvedRate {
        let rules = match bounded(
            "matching_rate_rules",
            self.store_timeout,
            self.store.matching_rate_rules(from, to, weight_kg),
        )
        .await
        {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!("Rate rule lookup failed: {}, using default table", e);
                Vec::new()
            }
        };

        let resolved = resolve_with(&rules, &self.table, from, to, weight_kg, is_remote);
        tracing::debug!("Resolved rate for {}->{}: {:?}", from, to, resolved.source);
        resolved
    }
}
