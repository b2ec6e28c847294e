mod common;

use common::{address, api_estimate, StaticProvider};
use httpmock::prelude::*;
use relocal_shipping::domain::model::RateRule;
use relocal_shipping::domain::ports::{RateProvider, UnavailableReason};
use relocal_shipping::{
    CountryCode, EstimationMethod, MemoryStore, ShippingConfig, ShippingError, ShippingService,
};
use std::sync::Arc;

fn rules_only() -> ShippingService<MemoryStore> {
    ShippingService::new(MemoryStore::new(), &ShippingConfig::default(), None, None)
}

#[tokio::test]
async fn test_domestic_india_uses_default_table() {
    let service = rules_only();
    let estimate = service
        .estimate(&address("IN", "Mumbai"), &address("IN", "Delhi"), 2.0)
        .await
        .unwrap();

    assert_eq!(estimate.estimated_cost, 200.0);
    assert_eq!(estimate.currency, "INR");
    assert_eq!(estimate.service_level, "standard");
    assert_eq!((estimate.delivery_days_min, estimate.delivery_days_max), (2, 5));
    assert!(!estimate.is_international);
    assert!(!estimate.is_remote_area);
    assert_eq!(estimate.estimation_method, EstimationMethod::RuleBased);
    assert!(estimate.carrier.is_none());
}

#[tokio::test]
async fn test_india_to_us_is_international_tier() {
    let service = rules_only();
    let estimate = service
        .estimate(&address("IN", "Pune"), &address("US", "Austin"), 3.0)
        .await
        .unwrap();

    assert_eq!(estimate.estimated_cost, 50.0);
    assert_eq!(estimate.currency, "USD");
    assert_eq!((estimate.delivery_days_min, estimate.delivery_days_max), (7, 14));
    assert!(estimate.is_international);
}

#[tokio::test]
async fn test_remote_destination_applies_multiplier() {
    let service = rules_only();
    let origin = address("IN", "Mumbai");

    let plain = service
        .estimate(&origin, &address("IN", "Delhi"), 1.0)
        .await
        .unwrap();
    let remote = service
        .estimate(&origin, &address("IN", "Leh"), 1.0)
        .await
        .unwrap();

    assert_eq!(plain.estimated_cost, 150.0);
    assert_eq!(remote.estimated_cost, 195.0);
    assert!(remote.is_remote_area);
    assert_eq!((remote.delivery_days_min, remote.delivery_days_max), (5, 10));
}

#[tokio::test]
async fn test_unknown_pair_falls_to_rest_of_world() {
    let service = rules_only();
    let estimate = service
        .estimate(&address("BR", "Recife"), &address("KE", "Nairobi"), 2.0)
        .await
        .unwrap();

    assert_eq!(estimate.estimated_cost, 60.0);
    assert_eq!(estimate.currency, "USD");
    assert!(estimate.is_international);
}

#[tokio::test]
async fn test_stored_rule_takes_precedence_over_table() {
    let in_code = CountryCode::parse("IN").unwrap();
    let store = MemoryStore::with_rules(vec![RateRule {
        rule_id: "in-light".into(),
        from_country: in_code.clone(),
        to_country: in_code,
        weight_min_kg: 0.0,
        weight_max_kg: 5.0,
        base_rate: 80.0,
        per_kg_rate: 40.0,
        remote_area_multiplier: 1.5,
        currency: "INR".into(),
        is_active: true,
    }])
    .await;
    let service = ShippingService::new(store, &ShippingConfig::default(), None, None);

    let estimate = service
        .estimate(&address("IN", "Mumbai"), &address("IN", "Chennai"), 2.0)
        .await
        .unwrap();
    assert_eq!(estimate.estimated_cost, 160.0);

    let remote = service
        .estimate(&address("IN", "Mumbai"), &address("IN", "Srinagar"), 2.0)
        .await
        .unwrap();
    assert_eq!(remote.estimated_cost, 240.0);

    // Outside the rule's bracket the table applies again.
    let heavy = service
        .estimate(&address("IN", "Mumbai"), &address("IN", "Chennai"), 8.0)
        .await
        .unwrap();
    assert_eq!(heavy.estimated_cost, 500.0);
}

#[tokio::test]
async fn test_live_quote_is_used_when_available() {
    let provider = StaticProvider::quoting(api_estimate(18.5, "USPS"));
    let service = ShippingService::new(
        MemoryStore::new(),
        &ShippingConfig::default(),
        Some(provider.clone() as Arc<dyn RateProvider>),
        None,
    );

    let estimate = service
        .estimate(&address("IN", "Mumbai"), &address("IN", "Leh"), 1.0)
        .await
        .unwrap();

    assert_eq!(estimate.estimation_method, EstimationMethod::Api);
    assert_eq!(estimate.estimated_cost, 18.5);
    assert_eq!(estimate.carrier.as_deref(), Some("USPS"));
    assert!(estimate.is_remote_area);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_unavailable_provider_falls_back_without_retry() {
    let provider = StaticProvider::unavailable(UnavailableReason::Timeout);
    let service = ShippingService::new(
        MemoryStore::new(),
        &ShippingConfig::default(),
        Some(provider.clone() as Arc<dyn RateProvider>),
        None,
    );

    let estimate = service
        .estimate(&address("IN", "Mumbai"), &address("IN", "Delhi"), 2.0)
        .await
        .unwrap();

    assert_eq!(estimate.estimation_method, EstimationMethod::RuleBased);
    assert_eq!(estimate.estimated_cost, 200.0);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_carrier_http_error_falls_back_to_rules() {
    let server = MockServer::start();
    let rates_mock = server.mock(|when, then| {
        when.method(POST).path("/shipments");
        then.status(500).body("upstream exploded");
    });

    let mut config = ShippingConfig::default();
    config.carrier.api_url = server.url("");
    config.carrier.api_key = Some("shippo_test_key".to_string());

    let service = ShippingService::from_config(MemoryStore::new(), &config).unwrap();
    let estimate = service
        .estimate(&address("IN", "Pune"), &address("US", "Austin"), 3.0)
        .await
        .unwrap();

    rates_mock.assert();
    assert_eq!(estimate.estimation_method, EstimationMethod::RuleBased);
    assert_eq!(estimate.estimated_cost, 50.0);
}

#[tokio::test]
async fn test_invalid_input_rejected_before_provider() {
    let provider = StaticProvider::quoting(api_estimate(10.0, "USPS"));
    let service = ShippingService::new(
        MemoryStore::new(),
        &ShippingConfig::default(),
        Some(provider.clone() as Arc<dyn RateProvider>),
        None,
    );
    let from = address("IN", "Mumbai");

    for weight in [0.0, -1.0, f64::NAN] {
        let result = service.estimate(&from, &address("IN", "Delhi"), weight).await;
        assert!(
            matches!(result, Err(ShippingError::ValidationError { .. })),
            "weight {} should be rejected",
            weight
        );
    }

    let mut no_city = address("IN", "Delhi");
    no_city.city = "  ".to_string();
    let result = service.estimate(&from, &no_city, 1.0).await;
    assert!(matches!(result, Err(ShippingError::ValidationError { .. })));

    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_estimates_are_well_formed_across_routes() {
    let service = rules_only();
    let routes = [
        ("IN", "IN", "Delhi"),
        ("IN", "GB", "London"),
        ("JP", "DE", "Berlin"),
        ("JP", "JP", "Okinawa"),
        ("US", "US", "Denver"),
        ("FR", "IN", "Leh"),
    ];

    for (from, to, city) in routes {
        for weight in [0.1, 1.0, 7.5, 30.0] {
            let estimate = service
                .estimate(&address(from, "Origin"), &address(to, city), weight)
                .await
                .unwrap();
            assert!(estimate.estimated_cost >= 0.0);
            assert!(estimate.delivery_days_min <= estimate.delivery_days_max);
            assert_eq!(estimate.is_international, from != to);
            let cents = estimate.estimated_cost * 100.0;
            assert!((cents - cents.round()).abs() < 1e-6);
        }
    }
}
