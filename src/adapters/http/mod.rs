pub mod shippo;

pub use shippo::ShippoClient;
