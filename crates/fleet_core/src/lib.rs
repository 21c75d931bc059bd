pub mod bus;
pub mod clock;
pub mod directory;
pub mod engine;
pub mod events;
pub mod factory;
pub mod geo;
pub mod ids;
pub mod pricing;
pub mod shipment;
pub mod stream;
pub mod systems;
pub mod telemetry;
pub mod test_helpers;
pub mod users;
pub mod vehicle;
