//! Conversions between the wire contract and the engine's domain types.

use fleet_core::factory::{ShipmentRequest, Urgency};
use fleet_core::geo::Location;
use fleet_dispatch_core::contract::{NormalizedJobRequest, WireLocation};

pub fn to_core_location(wire: &WireLocation) -> Location {
    Location {
        lat: wire.lat,
        lng: wire.lng,
        address: wire.address.clone(),
        city: wire.city.clone(),
        country: wire.country.clone(),
    }
}

/// Normalized urgency strings are exactly "standard" or "high".
pub fn to_core_urgency(urgency: &str) -> Urgency {
    if urgency == "high" {
        Urgency::High
    } else {
        Urgency::Standard
    }
}

pub fn to_core_request(request: &NormalizedJobRequest) -> ShipmentRequest {
    ShipmentRequest {
        customer_id: request.customer_id.clone(),
        weight_kg: request.weight,
        origin: to_core_location(&request.origin),
        destination: to_core_location(&request.destination),
        urgency: to_core_urgency(&request.urgency),
    }
}
