//! Vehicles: tagged variants with a per-variant parameter table.
//!
//! Drone/Truck/Ship share one component type; capacity, speed, and fuel
//! behavior come from [VariantSpec] rather than per-variant dispatch. A
//! vehicle carries at most one shipment: `current_shipment` is set exactly
//! while the status is Assigned or InTransit.

use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};

use crate::geo::Location;
use crate::pricing::PricingStrategy;

/// Fuel never drops below this percentage.
pub const FUEL_FLOOR_PCT: f64 = 10.0;
/// Fuel burned on a regular movement step.
pub const MOVE_FUEL_BURN_PCT: f64 = 2.0;
/// Fuel burned on the final approach and arrival.
pub const ARRIVAL_FUEL_BURN_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleKind {
    Drone,
    Truck,
    Ship,
}

/// Per-variant defaults used when provisioning a new vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantSpec {
    pub capacity_kg: f64,
    pub speed_deg_per_tick: f64,
    pub full_fuel_pct: f64,
}

impl VehicleKind {
    pub fn spec(self) -> VariantSpec {
        match self {
            VehicleKind::Drone => VariantSpec {
                capacity_kg: 50.0,
                speed_deg_per_tick: 0.5,
                full_fuel_pct: 100.0,
            },
            VehicleKind::Truck => VariantSpec {
                capacity_kg: 2_000.0,
                speed_deg_per_tick: 0.3,
                full_fuel_pct: 100.0,
            },
            VehicleKind::Ship => VariantSpec {
                capacity_kg: 50_000.0,
                speed_deg_per_tick: 0.2,
                full_fuel_pct: 100.0,
            },
        }
    }

    /// The cost strategy matching this variant.
    pub fn pricing_strategy(self) -> PricingStrategy {
        match self {
            VehicleKind::Drone => PricingStrategy::Air,
            VehicleKind::Truck | VehicleKind::Ship => PricingStrategy::Ground,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Idle,
    Assigned,
    InTransit,
    Maintenance,
}

#[derive(Debug, Clone, Component)]
pub struct Vehicle {
    pub id: VehicleId,
    pub license_id: String,
    pub kind: VehicleKind,
    pub capacity_kg: f64,
    pub fuel_pct: f64,
    pub status: VehicleStatus,
    pub position: Option<Location>,
    pub current_shipment: Option<Entity>,
}

impl Vehicle {
    /// A fresh idle vehicle with the variant's default capacity and full fuel.
    pub fn provision(
        id: VehicleId,
        license_id: impl Into<String>,
        kind: VehicleKind,
        position: Option<Location>,
    ) -> Self {
        let spec = kind.spec();
        Self {
            id,
            license_id: license_id.into(),
            kind,
            capacity_kg: spec.capacity_kg,
            fuel_pct: spec.full_fuel_pct,
            status: VehicleStatus::Idle,
            position,
            current_shipment: None,
        }
    }

    pub fn can_carry(&self, weight_kg: f64) -> bool {
        self.capacity_kg >= weight_kg
    }

    /// Bind this vehicle to a shipment and mark it Assigned.
    pub fn assign(&mut self, shipment: Entity) {
        self.current_shipment = Some(shipment);
        self.status = VehicleStatus::Assigned;
    }

    pub fn begin_transit(&mut self) {
        self.status = VehicleStatus::InTransit;
    }

    /// Arrival: snap to the destination, go idle, release the shipment.
    pub fn complete_delivery(&mut self, destination: Location) {
        self.position = Some(destination);
        self.status = VehicleStatus::Idle;
        self.current_shipment = None;
        self.burn_fuel(ARRIVAL_FUEL_BURN_PCT);
    }

    /// Cancellation path: release the shipment without moving.
    pub fn release(&mut self) {
        self.status = VehicleStatus::Idle;
        self.current_shipment = None;
    }

    pub fn burn_fuel(&mut self, amount_pct: f64) {
        self.fuel_pct = (self.fuel_pct - amount_pct).max(FUEL_FLOOR_PCT);
    }

    /// `current_shipment` must be set exactly while Assigned or InTransit.
    pub fn link_is_consistent(&self) -> bool {
        let active = matches!(
            self.status,
            VehicleStatus::Assigned | VehicleStatus::InTransit
        );
        active == self.current_shipment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::World;

    fn spawn_marker(world: &mut World) -> Entity {
        world.spawn(()).id()
    }

    #[test]
    fn variant_table_orders_capacity_and_speed() {
        let drone = VehicleKind::Drone.spec();
        let truck = VehicleKind::Truck.spec();
        let ship = VehicleKind::Ship.spec();
        assert!(drone.capacity_kg < truck.capacity_kg);
        assert!(truck.capacity_kg < ship.capacity_kg);
        assert!(drone.speed_deg_per_tick > truck.speed_deg_per_tick);
        assert!(truck.speed_deg_per_tick > ship.speed_deg_per_tick);
    }

    #[test]
    fn drones_price_as_air_everything_else_as_ground() {
        assert_eq!(VehicleKind::Drone.pricing_strategy(), PricingStrategy::Air);
        assert_eq!(VehicleKind::Truck.pricing_strategy(), PricingStrategy::Ground);
        assert_eq!(VehicleKind::Ship.pricing_strategy(), PricingStrategy::Ground);
    }

    #[test]
    fn assignment_keeps_link_consistent() {
        let mut world = World::new();
        let shipment = spawn_marker(&mut world);
        let mut vehicle = Vehicle::provision(VehicleId(1), "LIC-000001", VehicleKind::Truck, None);
        assert!(vehicle.link_is_consistent());

        vehicle.assign(shipment);
        assert_eq!(vehicle.status, VehicleStatus::Assigned);
        assert!(vehicle.link_is_consistent());

        vehicle.begin_transit();
        assert_eq!(vehicle.status, VehicleStatus::InTransit);
        assert!(vehicle.link_is_consistent());

        vehicle.complete_delivery(Location::new(1.0, 1.0));
        assert_eq!(vehicle.status, VehicleStatus::Idle);
        assert_eq!(vehicle.current_shipment, None);
        assert!(vehicle.link_is_consistent());
    }

    #[test]
    fn fuel_never_drops_below_the_floor() {
        let mut vehicle = Vehicle::provision(VehicleId(2), "LIC-000002", VehicleKind::Drone, None);
        for _ in 0..100 {
            vehicle.burn_fuel(MOVE_FUEL_BURN_PCT);
        }
        assert_eq!(vehicle.fuel_pct, FUEL_FLOOR_PCT);
    }
}
