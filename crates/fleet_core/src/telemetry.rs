//! Fleet telemetry: status counts and delivered-shipment records.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::events::{RealtimeEvent, RealtimeEventKind};
use crate::shipment::{ShipmentId, ShipmentStatus};
use crate::vehicle::{VehicleId, VehicleStatus};

/// One delivered shipment, recorded when the vehicle reaches the destination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredShipmentRecord {
    pub shipment_id: ShipmentId,
    pub vehicle_id: VehicleId,
    pub created_at: u64,
    pub delivered_at: u64,
}

impl DeliveredShipmentRecord {
    /// Time from creation to delivery.
    pub fn delivery_time_ms(&self) -> u64 {
        self.delivered_at.saturating_sub(self.created_at)
    }
}

/// Collects delivery records across ticks.
#[derive(Debug, Default, Resource)]
pub struct FleetTelemetry {
    pub delivered: Vec<DeliveredShipmentRecord>,
}

/// Aggregated status counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetCounts {
    pub shipments_pending: usize,
    pub shipments_assigned: usize,
    pub shipments_in_transit: usize,
    pub shipments_delivered: usize,
    pub shipments_cancelled: usize,
    pub vehicles_idle: usize,
    pub vehicles_assigned: usize,
    pub vehicles_in_transit: usize,
    pub vehicles_maintenance: usize,
}

impl FleetCounts {
    pub fn add_shipment(&mut self, status: ShipmentStatus) {
        match status {
            ShipmentStatus::Pending => self.shipments_pending += 1,
            ShipmentStatus::Assigned => self.shipments_assigned += 1,
            ShipmentStatus::InTransit => self.shipments_in_transit += 1,
            ShipmentStatus::Delivered => self.shipments_delivered += 1,
            ShipmentStatus::Cancelled => self.shipments_cancelled += 1,
        }
    }

    pub fn add_vehicle(&mut self, status: VehicleStatus) {
        match status {
            VehicleStatus::Idle => self.vehicles_idle += 1,
            VehicleStatus::Assigned => self.vehicles_assigned += 1,
            VehicleStatus::InTransit => self.vehicles_in_transit += 1,
            VehicleStatus::Maintenance => self.vehicles_maintenance += 1,
        }
    }
}

/// The `stats_update` event carrying the current counts.
pub fn stats_event(counts: &FleetCounts, now_ms: u64) -> RealtimeEvent {
    RealtimeEvent::new(
        RealtimeEventKind::StatsUpdate,
        serde_json::to_value(counts).expect("fleet counts should serialize"),
        now_ms,
    )
}
