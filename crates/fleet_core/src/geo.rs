//! Planar geometry for shipment routes.
//!
//! Distances are straight-line Euclidean in (lat, lng) degrees, scaled to
//! kilometers by a flat conversion factor. This is deliberately not geodesic:
//! simulation step sizes and pricing both consume the planar value, and
//! changing it would change both outputs.

use serde::{Deserialize, Serialize};

/// Flat degrees-to-kilometers conversion used for pricing distances.
pub const KM_PER_DEGREE: f64 = 111.0;

/// A geographic point with optional postal context.
///
/// Once attached to a shipment a location is never mutated in place; callers
/// always receive clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            address: None,
            city: None,
            country: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Both coordinates are finite and within the usual lat/lng ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Coordinate equality, ignoring postal context.
    pub fn same_point(&self, other: &Location) -> bool {
        self.lat == other.lat && self.lng == other.lng
    }
}

/// Straight-line distance between two points in degrees.
pub fn distance_degrees(a: &Location, b: &Location) -> f64 {
    let dlat = b.lat - a.lat;
    let dlng = b.lng - a.lng;
    (dlat * dlat + dlng * dlng).sqrt()
}

/// Straight-line distance scaled to kilometers via [KM_PER_DEGREE].
pub fn distance_km(a: &Location, b: &Location) -> f64 {
    distance_degrees(a, b) * KM_PER_DEGREE
}

/// Move `from` toward `to` by `fraction` of the remaining vector.
///
/// A fraction at or above 1.0 snaps to the target. Postal context is taken
/// from the target so an arrived vehicle reports the destination address.
pub fn step_toward(from: &Location, to: &Location, fraction: f64) -> Location {
    if fraction >= 1.0 {
        return to.clone();
    }
    Location::new(
        from.lat + (to.lat - from.lat) * fraction,
        from.lng + (to.lng - from.lng) * fraction,
    )
}
