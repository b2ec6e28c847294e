use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShippingError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error ({field}): {message}")]
    ValidationError { field: String, message: String },

    #[error("Shipment not found: {shipment_id}")]
    ShipmentNotFound { shipment_id: String },

    #[error("Shipment already exists: {shipment_id}")]
    ShipmentConflict { shipment_id: String },

    #[error("Invalid shipment status transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Store operation timed out: {operation}")]
    StoreTimeout { operation: String },

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("Label issuance failed: {message}")]
    LabelError { message: String },
}

impl ShippingError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ShippingError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Errors caused by caller input. These are surfaced as-is and never retried.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ShippingError::ValidationError { .. }
                | ShippingError::ShipmentNotFound { .. }
                | ShippingError::InvalidStateTransition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ShippingError>;
