use crate::core::estimator::{DayWindow, DeliveryWindows};
use crate::core::rate_table::{RateSchedule, RateTable};
use crate::domain::model::CourierConfig;
use crate::utils::error::{Result, ShippingError};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingConfig {
    pub default_courier: String,
    pub carrier: CarrierConfig,
    pub labels: LabelConfig,
    pub rates: RateTable,
    pub delivery_windows: DeliveryWindows,
    pub couriers: Vec<CourierConfig>,
    pub storage: StorageConfig,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            default_courier: "India Post".to_string(),
            carrier: CarrierConfig::default(),
            labels: LabelConfig::default(),
            rates: RateTable::default(),
            delivery_windows: DeliveryWindows::default(),
            couriers: Vec::new(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub parcel: ParcelConfig,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.goshippo.com/v1".to_string(),
            api_key: None,
            timeout_seconds: 10,
            parcel: ParcelConfig::default(),
        }
    }
}

impl CarrierConfig {
    /// A key left as an unresolved `${VAR}` placeholder counts as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.starts_with("${"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Parcel dimensions sent with live rate requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelConfig {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            length_cm: 10.0,
            width_cm: 10.0,
            height_cm: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub enabled: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: String,
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            data_dir: "./data".to_string(),
            timeout_seconds: 5,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ShippingConfig {
    /// Loads and parses a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShippingError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShippingError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR}` placeholders; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShippingError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("carrier.api_url", &self.carrier.api_url)?;
        validate_range("carrier.timeout_seconds", self.carrier.timeout_seconds, 1, 300)?;
        validate_positive_number("storage.timeout_seconds", self.storage.timeout_seconds, 1)?;
        if self.storage.backend == StorageBackend::Json {
            validate_path("storage.data_dir", &self.storage.data_dir)?;
        }

        if self.default_courier.trim().is_empty() {
            return Err(ShippingError::ConfigValidationError {
                field: "default_courier".to_string(),
                message: "must name a carrier".to_string(),
            });
        }

        check_window("delivery_windows.international", self.delivery_windows.international)?;
        check_window("delivery_windows.remote", self.delivery_windows.remote)?;
        check_window("delivery_windows.domestic", self.delivery_windows.domestic)?;

        if !(self.rates.remote_multiplier >= 1.0) {
            return Err(ShippingError::InvalidConfigValueError {
                field: "rates.remote_multiplier".to_string(),
                value: self.rates.remote_multiplier.to_string(),
                reason: "Remote multiplier must be at least 1.0".to_string(),
            });
        }

        check_schedule("rates.domestic_default", &self.rates.domestic_default)?;
        check_schedule("rates.rest_of_world", &self.rates.rest_of_world)?;
        for (country, schedule) in &self.rates.domestic {
            check_schedule(&format!("rates.domestic.{}", country), schedule)?;
        }
        for (i, tier) in self.rates.international_tiers.iter().enumerate() {
            check_schedule(&format!("rates.international_tiers[{}]", i), &tier.schedule)?;
        }

        Ok(())
    }
}

fn check_window(field: &str, window: DayWindow) -> Result<()> {
    if window.min > window.max {
        return Err(ShippingError::InvalidConfigValueError {
            field: field.to_string(),
            value: format!("{}..{}", window.min, window.max),
            reason: "min days must not exceed max days".to_string(),
        });
    }
    Ok(())
}

fn check_schedule(field: &str, schedule: &RateSchedule) -> Result<()> {
    if !(schedule.base_rate >= 0.0 && schedule.per_kg_rate >= 0.0) {
        return Err(ShippingError::InvalidConfigValueError {
            field: field.to_string(),
            value: format!("{}+{}/kg", schedule.base_rate, schedule.per_kg_rate),
            reason: "Rates must be non-negative".to_string(),
        });
    }
    if schedule.currency.trim().is_empty() {
        return Err(ShippingError::ConfigValidationError {
            field: field.to_string(),
            message: "currency is required".to_string(),
        });
    }
    Ok(())
}

impl Validate for ShippingConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
