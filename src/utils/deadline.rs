use crate::utils::error::{Result, ShippingError};
use std::future::Future;
use std::time::Duration;

/// Runs a store call under `limit`, mapping expiry to `StoreTimeout`.
pub async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Store operation '{}' exceeded {:?}", operation, limit);
            Err(ShippingError::StoreTimeout {
                operation: operation.to_string(),
            })
        }
    }
}
