//! Pricing for shipments.
//!
//! Cost functions are pure and selected by a variant tag rather than a class
//! hierarchy: every strategy computes
//! `base = weight_kg * rate_per_kg + distance_km * rate_per_km`, applies the
//! shipment-type multiplier, then adds the insurance surcharge when insured.

use serde::{Deserialize, Serialize};

/// Ground rate per kilogram in currency units.
pub const GROUND_RATE_PER_KG: f64 = 0.50;
/// Ground rate per kilometer in currency units.
pub const GROUND_RATE_PER_KM: f64 = 0.10;
/// Air rate per kilogram; higher than ground, reflecting the fuel/speed trade-off.
pub const AIR_RATE_PER_KG: f64 = 1.50;
/// Air rate per kilometer.
pub const AIR_RATE_PER_KM: f64 = 0.30;
/// Express shipments pay 1.5x the base.
pub const EXPRESS_MULTIPLIER: f64 = 1.5;
/// Insured shipments pay 2% of the declared insurance value on top.
pub const INSURANCE_RATE: f64 = 0.02;

/// Service tier of a shipment; settable only before processing starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentType {
    Standard,
    Express,
}

impl ShipmentType {
    pub fn multiplier(self) -> f64 {
        match self {
            ShipmentType::Standard => 1.0,
            ShipmentType::Express => EXPRESS_MULTIPLIER,
        }
    }
}

/// Cost strategy variant. Air serves drones, ground serves trucks and ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingStrategy {
    Ground,
    Air,
}

/// Per-variant rate table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateCard {
    pub per_kg: f64,
    pub per_km: f64,
}

impl PricingStrategy {
    pub fn rates(self) -> RateCard {
        match self {
            PricingStrategy::Ground => RateCard {
                per_kg: GROUND_RATE_PER_KG,
                per_km: GROUND_RATE_PER_KM,
            },
            PricingStrategy::Air => RateCard {
                per_kg: AIR_RATE_PER_KG,
                per_km: AIR_RATE_PER_KM,
            },
        }
    }
}

/// Calculate the cost of moving `weight_kg` over `distance_km`.
///
/// `insurance_value` is the declared value for insured shipments; `None`
/// means uninsured.
pub fn quote(
    strategy: PricingStrategy,
    weight_kg: f64,
    distance_km: f64,
    shipment_type: ShipmentType,
    insurance_value: Option<f64>,
) -> f64 {
    let rates = strategy.rates();
    let base = weight_kg * rates.per_kg + distance_km * rates.per_km;
    let mut cost = base * shipment_type.multiplier();
    if let Some(value) = insurance_value {
        cost += value * INSURANCE_RATE;
    }
    cost
}
