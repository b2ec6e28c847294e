use crate::domain::model::{CountryCode, OrderStatus, RateRule, Shipment, TrackingEvent};
use crate::domain::ports::ShippingStore;
use crate::utils::error::{Result, ShippingError};
use fs4::fs_std::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

const RATE_RULES: &str = "rate_rules.json";
const SHIPMENTS: &str = "shipments.json";
const TRACKING_EVENTS: &str = "tracking_events.json";
const SEEN_EVENTS: &str = "seen_events.json";
const ORDERS: &str = "orders.json";
const LOCK_FILE: &str = ".store.lock";

/// Durable store keeping one JSON document per collection under `base_path`.
///
/// Every operation holds an exclusive advisory lock on `base_path/.store.lock`,
/// so separate instances and processes sharing a directory serialise their
/// read-modify-write cycles. Writes go through a uniquely named temp file and
/// a rename, so readers never see a torn document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_path: PathBuf,
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of one store operation. Dropping the file releases
/// the advisory lock.
struct StoreGuard<'a> {
    _local: MutexGuard<'a, ()>,
    _file: File,
}

fn blocking_failed(e: tokio::task::JoinError) -> ShippingError {
    ShippingError::StoreError {
        message: format!("blocking store task failed: {}", e),
    }
}

impl JsonFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn exclusive(&self) -> Result<StoreGuard<'_>> {
        let local = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.base_path).await?;

        let lock_path = self.base_path.join(LOCK_FILE);
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            FileExt::lock_exclusive(&file)?;
            Ok(file)
        })
        .await
        .map_err(blocking_failed)??;

        Ok(StoreGuard {
            _local: local,
            _file: file,
        })
    }

    async fn load<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let full_path = self.base_path.join(name);
        match tokio::fs::read(&full_path).await {
            Ok(data) if data.is_empty() => Ok(T::default()),
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(ShippingError::IoError(e)),
        }
    }

    async fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let base_path = self.base_path.clone();
        let full_path = self.base_path.join(name);
        let data = serde_json::to_vec_pretty(value)?;
        let written = data.len();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&base_path)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&full_path).map_err(|e| ShippingError::IoError(e.error))?;
            Ok(())
        })
        .await
        .map_err(blocking_failed)??;

        tracing::debug!("Wrote {} ({} bytes)", self.base_path.join(name).display(), written);
        Ok(())
    }
}

impl ShippingStore for JsonFileStore {
    async fn matching_rate_rules(
        &self,
        from: &CountryCode,
        to: &CountryCode,
        weight_kg: f64,
    ) -> Result<Vec<RateRule>> {
        let _guard = self.exclusive().await?;
        let rules: Vec<RateRule> = self.load(RATE_RULES).await?;
        Ok(rules
            .into_iter()
            .filter(|r| r.matches(from, to, weight_kg))
            .collect())
    }

    async fn put_rate_rule(&self, rule: RateRule) -> Result<()> {
        let _guard = self.exclusive().await?;
        let mut rules: Vec<RateRule> = self.load(RATE_RULES).await?;
        rules.retain(|r| r.rule_id != rule.rule_id);
        rules.push(rule);
        self.save(RATE_RULES, &rules).await
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<()> {
        let _guard = self.exclusive().await?;
        let mut shipments: BTreeMap<String, Shipment> = self.load(SHIPMENTS).await?;
        if shipments.contains_key(&shipment.shipment_id) {
            return Err(ShippingError::ShipmentConflict {
                shipment_id: shipment.shipment_id.clone(),
            });
        }
        shipments.insert(shipment.shipment_id.clone(), shipment.clone());
        self.save(SHIPMENTS, &shipments).await
    }

    async fn get_shipment(&self, shipment_id: &str) -> Result<Option<Shipment>> {
        let _guard = self.exclusive().await?;
        let mut shipments: BTreeMap<String, Shipment> = self.load(SHIPMENTS).await?;
        Ok(shipments.remove(shipment_id))
    }

    async fn find_shipment_by_tracking(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let _guard = self.exclusive().await?;
        let shipments: BTreeMap<String, Shipment> = self.load(SHIPMENTS).await?;
        Ok(shipments
            .into_values()
            .find(|s| s.tracking_number.as_deref() == Some(tracking_number)))
    }

    async fn update_shipment<F, R>(&self, shipment_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Shipment) -> R + Send,
        R: Send,
    {
        let _guard = self.exclusive().await?;
        let mut shipments: BTreeMap<String, Shipment> = self.load(SHIPMENTS).await?;
        let shipment =
            shipments
                .get_mut(shipment_id)
                .ok_or_else(|| ShippingError::ShipmentNotFound {
                    shipment_id: shipment_id.to_string(),
                })?;
        let result = f(shipment);
        self.save(SHIPMENTS, &shipments).await?;
        Ok(result)
    }

    async fn append_tracking_event(&self, event: &TrackingEvent) -> Result<()> {
        let _guard = self.exclusive().await?;
        let mut events: Vec<TrackingEvent> = self.load(TRACKING_EVENTS).await?;
        events.push(event.clone());
        self.save(TRACKING_EVENTS, &events).await
    }

    async fn tracking_events(&self, shipment_id: &str) -> Result<Vec<TrackingEvent>> {
        let _guard = self.exclusive().await?;
        let events: Vec<TrackingEvent> = self.load(TRACKING_EVENTS).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.shipment_id == shipment_id)
            .collect())
    }

    async fn mark_event_seen(&self, key: &str) -> Result<bool> {
        let _guard = self.exclusive().await?;
        let mut seen: BTreeSet<String> = self.load(SEEN_EVENTS).await?;
        if !seen.insert(key.to_string()) {
            return Ok(false);
        }
        self.save(SEEN_EVENTS, &seen).await?;
        Ok(true)
    }

    async fn forget_event(&self, key: &str) -> Result<()> {
        let _guard = self.exclusive().await?;
        let mut seen: BTreeSet<String> = self.load(SEEN_EVENTS).await?;
        if seen.remove(key) {
            self.save(SEEN_EVENTS, &seen).await?;
        }
        Ok(())
    }

    async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        let _guard = self.exclusive().await?;
        let mut orders: BTreeMap<String, OrderStatus> = self.load(ORDERS).await?;
        orders.insert(order_id.to_string(), status);
        self.save(ORDERS, &orders).await
    }

    async fn order_status(&self, order_id: &str) -> Result<Option<OrderStatus>> {
        let _guard = self.exclusive().await?;
        let orders: BTreeMap<String, OrderStatus> = self.load(ORDERS).await?;
        Ok(orders.get(order_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(id: &str) -> RateRule {
        RateRule {
            rule_id: id.into(),
            from_country: CountryCode::parse("IN").unwrap(),
            to_country: CountryCode::parse("IN").unwrap(),
            weight_min_kg: 0.0,
            weight_max_kg: 5.0,
            base_rate: 80.0,
            per_kg_rate: 40.0,
            remote_area_multiplier: 1.2,
            currency: "INR".into(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_missing_files_read_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        assert!(store.get_shipment("ship_x").await.unwrap().is_none());
        assert!(store.tracking_events("ship_x").await.unwrap().is_empty());
        assert!(store.order_status("order_x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rules_persist_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let in_code = CountryCode::parse("IN").unwrap();

        JsonFileStore::new(temp_dir.path())
            .put_rate_rule(rule("in-small"))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(temp_dir.path());
        let rules = reopened
            .matching_rate_rules(&in_code, &in_code, 2.0)
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_id, "in-small");
        assert!(reopened
            .matching_rate_rules(&in_code, &in_code, 9.0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_seen_events_are_durable() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        assert!(store.mark_event_seen("vendor:1").await.unwrap());
        assert!(!store.mark_event_seen("vendor:1").await.unwrap());

        let reopened = JsonFileStore::new(temp_dir.path());
        assert!(!reopened.mark_event_seen("vendor:1").await.unwrap());

        reopened.forget_event("vendor:1").await.unwrap();
        assert!(store.mark_event_seen("vendor:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_shipment_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let result = store.update_shipment("ship_missing", |s| s.status).await;
        assert!(matches!(
            result,
            Err(ShippingError::ShipmentNotFound { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_instances_do_not_lose_writes() {
        let temp_dir = TempDir::new().unwrap();
        let mut handles = Vec::new();

        for i in 0..40 {
            let store = JsonFileStore::new(temp_dir.path());
            handles.push(tokio::spawn(async move {
                store.mark_event_seen(&format!("vendor:evt-{}", i)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        let reopened = JsonFileStore::new(temp_dir.path());
        for i in 0..40 {
            assert!(
                !reopened
                    .mark_event_seen(&format!("vendor:evt-{}", i))
                    .await
                    .unwrap(),
                "key {} was lost",
                i
            );
        }

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp") || name.starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "stray temp files: {:?}", leftovers);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_from_many_instances_is_claimed_once() {
        let temp_dir = TempDir::new().unwrap();
        let mut handles = Vec::new();

        for _ in 0..16 {
            let store = JsonFileStore::new(temp_dir.path());
            handles.push(tokio::spawn(async move {
                store.mark_event_seen("vendor:evt-shared").await
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }
}
