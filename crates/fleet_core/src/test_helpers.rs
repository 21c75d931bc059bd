//! Shared test fixtures: well-known routes, a scripted directory, and a
//! deterministic engine.

use std::time::Duration;

use crate::clock::Clock;
use crate::directory::{InMemoryDirectory, RetryPolicy};
use crate::engine::{EngineConfig, LogisticsEngine};
use crate::factory::{ShipmentRequest, Urgency};
use crate::geo::Location;
use crate::users::{Role, User};

/// Fixed wall-clock start for deterministic timestamps.
pub const TEST_NOW_MS: u64 = 1_700_000_000_000;

pub fn nyc() -> Location {
    Location::new(40.7128, -74.0060).with_city("New York")
}

pub fn la() -> Location {
    Location::new(34.0522, -118.2437).with_city("Los Angeles")
}

/// Directory with one customer, one driver, and one admin.
pub fn test_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_user(User::new("cust-1", "Ada", Role::Customer))
        .with_user(User::new("drv-1", "Lin", Role::Driver))
        .with_user(User::new("admin-1", "Sam", Role::Admin))
}

/// A NYC -> LA request from the default test customer.
pub fn request(weight_kg: f64, urgency: Urgency) -> ShipmentRequest {
    ShipmentRequest {
        customer_id: "cust-1".to_string(),
        weight_kg,
        origin: nyc(),
        destination: la(),
        urgency,
    }
}

/// Engine with a manual clock, seeded ids, and millisecond retry delays.
pub fn test_engine() -> LogisticsEngine {
    LogisticsEngine::new(
        Box::new(test_directory()),
        EngineConfig::default()
            .with_clock(Clock::manual(TEST_NOW_MS))
            .with_id_seed(7)
            .with_retry(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            }),
    )
}
