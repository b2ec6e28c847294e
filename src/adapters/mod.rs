// Adapters layer: concrete implementations of the domain ports (storage backends, carrier HTTP client).

pub mod http;
pub mod storage;
