use crate::domain::model::{Address, CountryCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub base_rate: f64,
    pub per_kg_rate: f64,
    pub currency: String,
}

impl RateSchedule {
    pub fn new(base_rate: f64, per_kg_rate: f64, currency: &str) -> Self {
        Self {
            base_rate,
            per_kg_rate,
            currency: currency.to_string(),
        }
    }
}

/// International pricing for shipments from any of `origins` to any of `destinations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternationalTier {
    pub origins: Vec<CountryCode>,
    pub destinations: Vec<CountryCode>,
    #[serde(flatten)]
    pub schedule: RateSchedule,
}

impl InternationalTier {
    fn covers(&self, from: &CountryCode, to: &CountryCode) -> bool {
        self.origins.contains(from) && self.destinations.contains(to)
    }
}

/// Built-in pricing knowledge used when no persisted rule applies. Pure lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    pub domestic: BTreeMap<CountryCode, RateSchedule>,
    pub domestic_default: RateSchedule,
    pub international_tiers: Vec<InternationalTier>,
    pub rest_of_world: RateSchedule,
    pub remote_multiplier: f64,
    pub remote_areas: BTreeMap<CountryCode, Vec<String>>,
}

fn codes(raw: &[&str]) -> Vec<CountryCode> {
    raw.iter()
        .filter_map(|c| CountryCode::parse(c).ok())
        .collect()
}

fn keyed<V>(entries: Vec<(&str, V)>) -> BTreeMap<CountryCode, V> {
    entries
        .into_iter()
        .filter_map(|(c, v)| CountryCode::parse(c).ok().map(|c| (c, v)))
        .collect()
}

fn names(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            domestic: keyed(vec![
                ("IN", RateSchedule::new(100.0, 50.0, "INR")),
                ("JP", RateSchedule::new(500.0, 200.0, "JPY")),
            ]),
            domestic_default: RateSchedule::new(5.0, 2.0, "USD"),
            international_tiers: vec![
                InternationalTier {
                    origins: codes(&["IN", "JP"]),
                    destinations: codes(&["US", "GB", "AU", "CA"]),
                    schedule: RateSchedule::new(20.0, 10.0, "USD"),
                },
                InternationalTier {
                    origins: codes(&["IN", "JP"]),
                    destinations: codes(&["DE", "FR"]),
                    schedule: RateSchedule::new(25.0, 12.0, "USD"),
                },
            ],
            rest_of_world: RateSchedule::new(30.0, 15.0, "USD"),
            remote_multiplier: 1.3,
            remote_areas: keyed(vec![
                ("IN", names(&["Leh", "Ladakh", "Andaman", "Nicobar", "Srinagar"])),
                ("JP", names(&["Okinawa", "Hokkaido"])),
            ]),
        }
    }
}

impl RateTable {
    /// Default schedule for a country pair. Always resolves: the generic
    /// domestic schedule and the rest-of-world schedule are catch-alls.
    pub fn schedule_for(&self, from: &CountryCode, to: &CountryCode) -> &RateSchedule {
        if from == to {
            return self.domestic.get(from).unwrap_or(&self.domestic_default);
        }

        self.international_tiers
            .iter()
            .find(|tier| tier.covers(from, to))
            .map(|tier| &tier.schedule)
            .unwrap_or(&self.rest_of_world)
    }

    /// Case-insensitive substring match of the destination city against the
    /// country's configured remote localities.
    pub fn is_remote(&self, address: &Address) -> bool {
        let Some(localities) = self.remote_areas.get(&address.country) else {
            return false;
        };
        let city = address.city.to_lowercase();
        localities
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .any(|l| city.contains(&l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(raw: &str) -> CountryCode {
        CountryCode::parse(raw).unwrap()
    }

    fn address_in(country: &str, city: &str) -> Address {
        Address {
            name: "Receiver".into(),
            street1: "1 Main St".into(),
            street2: None,
            city: city.into(),
            state: None,
            postal_code: "000000".into(),
            country: cc(country),
            phone: None,
            email: None,
        }
    }

    #[test]
    fn test_domestic_country_specific_schedules() {
        let table = RateTable::default();
        assert_eq!(
            table.schedule_for(&cc("IN"), &cc("IN")),
            &RateSchedule::new(100.0, 50.0, "INR")
        );
        assert_eq!(
            table.schedule_for(&cc("JP"), &cc("JP")),
            &RateSchedule::new(500.0, 200.0, "JPY")
        );
        assert_eq!(
            table.schedule_for(&cc("US"), &cc("US")),
            &RateSchedule::new(5.0, 2.0, "USD")
        );
    }

    #[test]
    fn test_international_tiers() {
        let table = RateTable::default();
        assert_eq!(table.schedule_for(&cc("IN"), &cc("US")).base_rate, 20.0);
        assert_eq!(table.schedule_for(&cc("JP"), &cc("GB")).per_kg_rate, 10.0);
        assert_eq!(table.schedule_for(&cc("IN"), &cc("FR")).base_rate, 25.0);
        // Outside every tier falls through to rest of world.
        assert_eq!(table.schedule_for(&cc("US"), &cc("IN")).base_rate, 30.0);
        assert_eq!(table.schedule_for(&cc("IN"), &cc("BR")).per_kg_rate, 15.0);
    }

    #[test]
    fn test_remote_area_matching() {
        let table = RateTable::default();
        assert!(table.is_remote(&address_in("IN", "Leh")));
        assert!(table.is_remote(&address_in("IN", "leh town")));
        assert!(table.is_remote(&address_in("JP", "Naha, OKINAWA")));
        assert!(!table.is_remote(&address_in("IN", "Mumbai")));
        // Remote list is scoped per country.
        assert!(!table.is_remote(&address_in("US", "Leh")));
    }
}
