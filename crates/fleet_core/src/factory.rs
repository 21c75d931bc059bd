//! Shipment factory: request validation and vehicle variant selection.
//!
//! Selection is a pure function over (weight, distance, urgency): light,
//! urgent, short-range cargo flies by drone with air pricing; everything else
//! goes by truck with ground pricing. Ships are never auto-selected; bulk
//! capacity enters the fleet only through the dedicated provisioning flow.
//! Construction itself lives in the engine, which owns the world.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::StoreError;
use crate::geo::{distance_km, Location};
use crate::pricing::ShipmentType;
use crate::shipment::ShipmentError;
use crate::vehicle::VehicleKind;

/// Drones take at most this much weight.
pub const DRONE_MAX_WEIGHT_KG: f64 = 50.0;
/// Routes longer than this go by truck even when urgent.
pub const DRONE_RANGE_KM: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Standard,
    High,
}

impl Urgency {
    /// High urgency maps to the express service tier at creation.
    pub fn shipment_type(self) -> ShipmentType {
        match self {
            Urgency::Standard => ShipmentType::Standard,
            Urgency::High => ShipmentType::Express,
        }
    }
}

/// An incoming shipment request, as the creation interface accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub customer_id: String,
    pub weight_kg: f64,
    pub origin: Location,
    pub destination: Location,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    #[error("weight must be positive, got {0}")]
    InvalidWeight(f64),
    #[error("origin and destination must carry finite in-range coordinates")]
    InvalidCoordinates,
    #[error("origin and destination are the same point")]
    SameOriginDestination,
    #[error("customer {0} may not create shipments")]
    NotPermitted(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Shipment(#[from] ShipmentError),
}

/// Reject malformed requests before any state is touched.
pub fn validate_request(request: &ShipmentRequest) -> Result<(), FactoryError> {
    if !(request.weight_kg.is_finite() && request.weight_kg > 0.0) {
        return Err(FactoryError::InvalidWeight(request.weight_kg));
    }
    if !request.origin.has_valid_coordinates() || !request.destination.has_valid_coordinates() {
        return Err(FactoryError::InvalidCoordinates);
    }
    if request.origin.same_point(&request.destination) {
        return Err(FactoryError::SameOriginDestination);
    }
    Ok(())
}

/// Pick the vehicle variant for a validated request.
pub fn select_vehicle_kind(weight_kg: f64, distance_km: f64, urgency: Urgency) -> VehicleKind {
    if weight_kg <= DRONE_MAX_WEIGHT_KG && urgency == Urgency::High && distance_km <= DRONE_RANGE_KM
    {
        VehicleKind::Drone
    } else {
        VehicleKind::Truck
    }
}

/// Convenience over [select_vehicle_kind] taking the request's route.
pub fn select_for_request(request: &ShipmentRequest) -> VehicleKind {
    select_vehicle_kind(
        request.weight_kg,
        distance_km(&request.origin, &request.destination),
        request.urgency,
    )
}
