//! Fleet tick: advances every in-transit vehicle toward its shipment's
//! destination.
//!
//! Each tick is externally triggered and processes vehicles independently: a
//! vehicle whose state is inconsistent produces a failure entry in the report
//! and never blocks the rest. Vehicles within [ARRIVAL_THRESHOLD_DEG] of the
//! destination snap to it, deliver, and go idle; everyone else moves along
//! the straight line by `speed / distance` of the remaining vector.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut, Resource};
use serde::Serialize;

use crate::bus::EventBusResource;
use crate::clock::Clock;
use crate::events::{channels, RealtimeEvent, RealtimeEventKind};
use crate::geo::{distance_degrees, step_toward, Location};
use crate::shipment::{Shipment, ShipmentId, ShipmentStatus};
use crate::telemetry::{stats_event, DeliveredShipmentRecord, FleetCounts, FleetTelemetry};
use crate::vehicle::{Vehicle, VehicleId, VehicleStatus, MOVE_FUEL_BURN_PCT};

/// Vehicles closer than this (in degrees) snap to the destination.
pub const ARRIVAL_THRESHOLD_DEG: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TickAction {
    Moved,
    Delivered,
}

/// One per-vehicle outcome in a tick report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickUpdate {
    pub vehicle_id: VehicleId,
    pub shipment_id: ShipmentId,
    pub action: TickAction,
    pub position: Location,
    pub fuel_pct: f64,
    pub remaining_degrees: f64,
}

/// A vehicle that could not be processed; the rest of the tick continues.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickFailure {
    pub vehicle_id: VehicleId,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Resource)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub vehicles_updated: usize,
    pub updates: Vec<TickUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TickFailure>,
}

pub fn fleet_tick_system(
    clock: Res<Clock>,
    bus: Res<EventBusResource>,
    mut report: ResMut<TickReport>,
    mut telemetry: ResMut<FleetTelemetry>,
    mut vehicles: Query<(Entity, &mut Vehicle)>,
    mut shipments: Query<&mut Shipment>,
) {
    let now = clock.now_ms();
    report.vehicles_updated = 0;
    report.updates.clear();
    report.failures.clear();

    let in_transit: Vec<(Entity, VehicleId, Option<Entity>)> = vehicles
        .iter()
        .filter(|(_, vehicle)| vehicle.status == VehicleStatus::InTransit)
        .map(|(entity, vehicle)| (entity, vehicle.id, vehicle.current_shipment))
        .collect();

    for (vehicle_entity, vehicle_id, shipment_link) in in_transit {
        match advance_vehicle(
            vehicle_entity,
            shipment_link,
            now,
            &mut vehicles,
            &mut shipments,
            &mut telemetry,
        ) {
            Ok(update) => {
                let (kind, channel) = match update.action {
                    TickAction::Delivered => {
                        (RealtimeEventKind::ShipmentUpdate, channels::SHIPMENTS)
                    }
                    TickAction::Moved => (RealtimeEventKind::VehicleUpdate, channels::VEHICLES),
                };
                let data =
                    serde_json::to_value(&update).expect("tick update should serialize");
                bus.0.broadcast(channel, &RealtimeEvent::new(kind, data, now));
                report.updates.push(update);
                report.vehicles_updated += 1;
            }
            Err(error) => report.failures.push(TickFailure { vehicle_id, error }),
        }
    }

    let mut counts = FleetCounts::default();
    for (_, vehicle) in vehicles.iter() {
        counts.add_vehicle(vehicle.status);
    }
    for shipment in shipments.iter() {
        counts.add_shipment(shipment.status);
    }
    bus.0.broadcast(channels::STATS, &stats_event(&counts, now));
}

fn advance_vehicle(
    vehicle_entity: Entity,
    shipment_link: Option<Entity>,
    now: u64,
    vehicles: &mut Query<(Entity, &mut Vehicle)>,
    shipments: &mut Query<&mut Shipment>,
    telemetry: &mut FleetTelemetry,
) -> Result<TickUpdate, String> {
    let shipment_entity =
        shipment_link.ok_or_else(|| "in-transit vehicle has no bound shipment".to_string())?;

    let (position, speed, vehicle_id) = {
        let (_, vehicle) = vehicles
            .get(vehicle_entity)
            .map_err(|_| "vehicle disappeared mid-tick".to_string())?;
        let position = vehicle
            .position
            .clone()
            .ok_or_else(|| "in-transit vehicle has no position".to_string())?;
        (position, vehicle.kind.spec().speed_deg_per_tick, vehicle.id)
    };

    let (destination, shipment_id, created_at) = {
        let shipment = shipments
            .get(shipment_entity)
            .map_err(|_| "bound shipment is missing".to_string())?;
        if shipment.status != ShipmentStatus::InTransit {
            return Err(format!(
                "bound shipment {} is not in transit",
                shipment.tracking_id
            ));
        }
        (
            shipment.destination.clone(),
            shipment.id,
            shipment.created_at,
        )
    };

    let remaining = distance_degrees(&position, &destination);
    if remaining < ARRIVAL_THRESHOLD_DEG {
        {
            let mut shipment = shipments
                .get_mut(shipment_entity)
                .map_err(|_| "bound shipment is missing".to_string())?;
            shipment
                .update_status(ShipmentStatus::Delivered, Some(destination.clone()), now)
                .map_err(|error| error.to_string())?;
        }
        telemetry.delivered.push(DeliveredShipmentRecord {
            shipment_id,
            vehicle_id,
            created_at,
            delivered_at: now,
        });
        let fuel_pct = {
            let (_, mut vehicle) = vehicles
                .get_mut(vehicle_entity)
                .map_err(|_| "vehicle disappeared mid-tick".to_string())?;
            vehicle.complete_delivery(destination.clone());
            vehicle.fuel_pct
        };
        return Ok(TickUpdate {
            vehicle_id,
            shipment_id,
            action: TickAction::Delivered,
            position: destination,
            fuel_pct,
            remaining_degrees: 0.0,
        });
    }

    let next = step_toward(&position, &destination, speed / remaining);
    let fuel_pct = {
        let (_, mut vehicle) = vehicles
            .get_mut(vehicle_entity)
            .map_err(|_| "vehicle disappeared mid-tick".to_string())?;
        vehicle.position = Some(next.clone());
        vehicle.burn_fuel(MOVE_FUEL_BURN_PCT);
        vehicle.fuel_pct
    };
    let remaining_degrees = distance_degrees(&next, &destination);
    Ok(TickUpdate {
        vehicle_id,
        shipment_id,
        action: TickAction::Moved,
        position: next,
        fuel_pct,
        remaining_degrees,
    })
}
