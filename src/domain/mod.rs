// Domain layer: value types, the status vocabulary and the ports implemented by adapters.

pub mod model;
pub mod ports;
pub mod status;
