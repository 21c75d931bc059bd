//! The logistics engine: an explicitly constructed context owning the ECS
//! world.
//!
//! Every external operation goes through this object: shipment creation,
//! dispatch, cancellation, entity operations, lookups, and the simulation
//! trigger. Exclusive world access serializes all mutation of a given
//! shipment or vehicle; the event bus handle can be cloned out for the
//! transport layer's subscribers. There is no process-wide singleton: build
//! one engine at startup and drop it at shutdown.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Resource, Schedule, World};
use serde::Serialize;
use thiserror::Error;

use crate::bus::{EventBus, EventBusResource};
use crate::clock::Clock;
use crate::directory::{with_retry, CustomerDirectory, CustomerDirectoryResource, RetryPolicy};
use crate::events::{channels, RealtimeEvent, RealtimeEventKind};
use crate::factory::{
    select_vehicle_kind, validate_request, FactoryError, ShipmentRequest, Urgency,
};
use crate::geo::{distance_km, Location};
use crate::ids::IdGenerator;
use crate::pricing::ShipmentType;
use crate::shipment::{Shipment, ShipmentError, ShipmentId, ShipmentStatus};
use crate::systems::fleet_tick::{fleet_tick_system, TickReport};
use crate::telemetry::{FleetCounts, FleetTelemetry};
use crate::users::User;
use crate::vehicle::{Vehicle, VehicleId, VehicleKind, VehicleStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("shipment {0:?} not found")]
    ShipmentNotFound(ShipmentId),
    #[error("vehicle {0:?} not found")]
    VehicleNotFound(VehicleId),
    #[error("vehicle {0:?} has an active shipment")]
    VehicleBusy(VehicleId),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    Shipment(#[from] ShipmentError),
}

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub clock: Clock,
    pub id_seed: Option<u64>,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock: Clock::default(),
            id_seed: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_seed(mut self, seed: u64) -> Self {
        self.id_seed = Some(seed);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Id lookups for API-facing operations.
#[derive(Default, Resource)]
struct FleetIndex {
    shipments: HashMap<ShipmentId, Entity>,
    tracking: HashMap<String, ShipmentId>,
    vehicles: HashMap<VehicleId, Entity>,
}

/// The stub returned by the asynchronous creation path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingShipment {
    #[serde(rename = "id")]
    pub shipment_id: ShipmentId,
    pub tracking_id: String,
    pub status: ShipmentStatus,
}

/// The fully processed creation result: vehicle bound, cost calculated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShipment {
    #[serde(rename = "id")]
    pub shipment_id: ShipmentId,
    pub tracking_id: String,
    pub status: ShipmentStatus,
    pub vehicle_id: VehicleId,
    pub vehicle_kind: VehicleKind,
    pub cost: f64,
}

pub struct LogisticsEngine {
    world: World,
    schedule: Schedule,
}

impl LogisticsEngine {
    pub fn new(directory: Box<dyn CustomerDirectory>, config: EngineConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(config.clock);
        world.insert_resource(config.retry);
        world.insert_resource(IdGenerator::new(config.id_seed));
        world.insert_resource(EventBusResource::default());
        world.insert_resource(TickReport::default());
        world.insert_resource(FleetTelemetry::default());
        world.insert_resource(FleetIndex::default());
        world.insert_resource(CustomerDirectoryResource(directory));

        let mut schedule = Schedule::default();
        schedule.add_systems(fleet_tick_system);

        Self { world, schedule }
    }

    /// A handle the transport layer uses to attach subscribers.
    pub fn bus(&self) -> EventBus {
        self.world.resource::<EventBusResource>().0.clone()
    }

    pub fn now_ms(&self) -> u64 {
        self.world.resource::<Clock>().now_ms()
    }

    /// Advance a manual clock (tests and scripted scenarios).
    pub fn advance_clock(&mut self, ms: u64) {
        self.world.resource_mut::<Clock>().advance(ms);
    }

    // ── Creation ───────────────────────────────────────────────────

    /// Synchronous path: validate, create the pending shipment, then
    /// immediately bind a vehicle and price it.
    pub fn create_shipment(
        &mut self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, EngineError> {
        let pending = self.create_pending_shipment(request)?;
        self.process_pending_shipment(pending.shipment_id)
    }

    /// First half of the asynchronous path: a PENDING stub with no vehicle.
    /// Broadcasts `new_shipment`.
    pub fn create_pending_shipment(
        &mut self,
        request: &ShipmentRequest,
    ) -> Result<PendingShipment, EngineError> {
        validate_request(request).map_err(EngineError::Factory)?;
        self.resolve_customer(&request.customer_id)?;

        let now = self.now_ms();
        let (id, tracking_id) = {
            let mut ids = self.world.resource_mut::<IdGenerator>();
            (ids.next_shipment_id(), ids.tracking_id())
        };
        let shipment = Shipment::new(
            id,
            tracking_id.clone(),
            request.weight_kg,
            request.origin.clone(),
            request.destination.clone(),
            request.urgency.shipment_type(),
            now,
        );
        let entity = self.world.spawn(shipment).id();
        {
            let mut index = self.world.resource_mut::<FleetIndex>();
            index.shipments.insert(id, entity);
            index.tracking.insert(tracking_id.clone(), id);
        }

        let stub = PendingShipment {
            shipment_id: id,
            tracking_id,
            status: ShipmentStatus::Pending,
        };
        self.broadcast(
            channels::SHIPMENTS,
            RealtimeEventKind::NewShipment,
            serde_json::to_value(&stub).expect("pending shipment should serialize"),
        );
        Ok(stub)
    }

    /// Second half of the asynchronous path (and the tail of the sync path):
    /// select a variant, bind a vehicle, calculate the cost. Broadcasts
    /// `assignment_update`. Both creation paths converge here, so the final
    /// invariants are identical.
    pub fn process_pending_shipment(
        &mut self,
        id: ShipmentId,
    ) -> Result<CreatedShipment, EngineError> {
        let shipment_entity = self.shipment_entity(id)?;
        let now = self.now_ms();
        let (weight_kg, origin, destination, shipment_type, tracking_id) = {
            let shipment = self
                .world
                .get::<Shipment>(shipment_entity)
                .ok_or(EngineError::ShipmentNotFound(id))?;
            (
                shipment.weight_kg,
                shipment.origin.clone(),
                shipment.destination.clone(),
                shipment.shipment_type,
                shipment.tracking_id.clone(),
            )
        };

        let urgency = match shipment_type {
            ShipmentType::Express => Urgency::High,
            ShipmentType::Standard => Urgency::Standard,
        };
        let kind = select_vehicle_kind(weight_kg, distance_km(&origin, &destination), urgency);

        let (vehicle_id, license_id) = {
            let mut ids = self.world.resource_mut::<IdGenerator>();
            (ids.next_vehicle_id(), ids.license_id())
        };
        let vehicle = Vehicle::provision(vehicle_id, license_id, kind, Some(origin.clone()));
        let capacity_kg = vehicle.capacity_kg;
        let vehicle_entity = self.world.spawn(vehicle).id();

        let assigned = {
            let mut shipment = self
                .world
                .get_mut::<Shipment>(shipment_entity)
                .ok_or(EngineError::ShipmentNotFound(id))?;
            shipment.assign_vehicle(vehicle_entity, vehicle_id, capacity_kg, now)
        };
        if let Err(error) = assigned {
            // The freshly provisioned vehicle never entered service.
            self.world.despawn(vehicle_entity);
            return Err(error.into());
        }

        {
            let mut vehicle = self
                .world
                .get_mut::<Vehicle>(vehicle_entity)
                .ok_or(EngineError::VehicleNotFound(vehicle_id))?;
            vehicle.assign(shipment_entity);
        }
        let cost = {
            let mut shipment = self
                .world
                .get_mut::<Shipment>(shipment_entity)
                .ok_or(EngineError::ShipmentNotFound(id))?;
            shipment.calculate_cost(kind.pricing_strategy())
        };
        self.world
            .resource_mut::<FleetIndex>()
            .vehicles
            .insert(vehicle_id, vehicle_entity);

        let created = CreatedShipment {
            shipment_id: id,
            tracking_id,
            status: ShipmentStatus::Assigned,
            vehicle_id,
            vehicle_kind: kind,
            cost,
        };
        self.broadcast(
            channels::SHIPMENTS,
            RealtimeEventKind::AssignmentUpdate,
            serde_json::to_value(&created).expect("created shipment should serialize"),
        );
        Ok(created)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// ASSIGNED -> IN_TRANSIT; the bound vehicle departs.
    pub fn dispatch_shipment(&mut self, id: ShipmentId) -> Result<(), EngineError> {
        let shipment_entity = self.shipment_entity(id)?;
        let now = self.now_ms();
        let (vehicle_entity, origin) = {
            let shipment = self
                .world
                .get::<Shipment>(shipment_entity)
                .ok_or(EngineError::ShipmentNotFound(id))?;
            (shipment.assigned_vehicle, shipment.origin.clone())
        };
        {
            let mut shipment = self
                .world
                .get_mut::<Shipment>(shipment_entity)
                .ok_or(EngineError::ShipmentNotFound(id))?;
            shipment.update_status(ShipmentStatus::InTransit, Some(origin), now)?;
        }
        if let Some(vehicle_entity) = vehicle_entity {
            if let Some(mut vehicle) = self.world.get_mut::<Vehicle>(vehicle_entity) {
                vehicle.begin_transit();
            }
        }
        self.broadcast_shipment_update(id);
        Ok(())
    }

    /// Cancel from any non-terminal state; a bound vehicle returns to idle.
    pub fn cancel_shipment(&mut self, id: ShipmentId) -> Result<(), EngineError> {
        let shipment_entity = self.shipment_entity(id)?;
        let location = self.current_location(id)?;
        let now = self.now_ms();
        let vehicle_entity = {
            let mut shipment = self
                .world
                .get_mut::<Shipment>(shipment_entity)
                .ok_or(EngineError::ShipmentNotFound(id))?;
            shipment.update_status(ShipmentStatus::Cancelled, Some(location), now)?;
            shipment.assigned_vehicle
        };
        if let Some(vehicle_entity) = vehicle_entity {
            if let Some(mut vehicle) = self.world.get_mut::<Vehicle>(vehicle_entity) {
                vehicle.release();
            }
        }
        self.broadcast_shipment_update(id);
        Ok(())
    }

    /// One simulation tick over every in-transit vehicle.
    pub fn run_fleet_tick(&mut self) -> TickReport {
        self.schedule.run(&mut self.world);
        self.world.resource::<TickReport>().clone()
    }

    // ── Entity operations ──────────────────────────────────────────

    pub fn add_note(&mut self, id: ShipmentId, text: &str) -> Result<(), EngineError> {
        self.with_shipment(id, |shipment, now| shipment.add_note(text, now))
    }

    pub fn add_insurance(&mut self, id: ShipmentId, value: f64) -> Result<(), EngineError> {
        self.with_shipment(id, |shipment, now| shipment.add_insurance(value, now))
    }

    /// Record a payment; returns the generated `TXN-` transaction id.
    pub fn process_payment(&mut self, id: ShipmentId, amount: f64) -> Result<String, EngineError> {
        let transaction_id = self
            .world
            .resource_mut::<IdGenerator>()
            .transaction_id();
        let recorded = transaction_id.clone();
        self.with_shipment(id, move |shipment, now| {
            shipment.process_payment(amount, recorded, now)
        })?;
        Ok(transaction_id)
    }

    /// Refund against a prior payment; returns the generated `REF-` id.
    pub fn refund_payment(
        &mut self,
        id: ShipmentId,
        transaction_id: &str,
        amount: f64,
    ) -> Result<String, EngineError> {
        let refund_id = self.world.resource_mut::<IdGenerator>().refund_id();
        let recorded = refund_id.clone();
        self.with_shipment(id, move |shipment, now| {
            shipment.refund(transaction_id, amount, recorded, now)
        })?;
        Ok(refund_id)
    }

    pub fn record_signature(&mut self, id: ShipmentId, name: &str) -> Result<(), EngineError> {
        self.with_shipment(id, |shipment, now| shipment.record_signature(name, now))
    }

    pub fn set_shipment_type(
        &mut self,
        id: ShipmentId,
        shipment_type: ShipmentType,
    ) -> Result<(), EngineError> {
        self.with_shipment(id, |shipment, now| {
            shipment.set_shipment_type(shipment_type, now)
        })
    }

    pub fn set_estimated_delivery(&mut self, id: ShipmentId, time: u64) -> Result<(), EngineError> {
        self.with_shipment(id, |shipment, now| {
            shipment.set_estimated_delivery(time, now)
        })
    }

    // ── Vehicles ───────────────────────────────────────────────────

    /// The dedicated provisioning flow; the only way a Ship joins the fleet.
    pub fn provision_vehicle(
        &mut self,
        requester: &User,
        kind: VehicleKind,
        position: Option<Location>,
    ) -> Result<VehicleId, EngineError> {
        if !requester.can_provision_vehicles() {
            return Err(EngineError::Factory(FactoryError::NotPermitted(
                requester.id.clone(),
            )));
        }
        let (vehicle_id, license_id) = {
            let mut ids = self.world.resource_mut::<IdGenerator>();
            (ids.next_vehicle_id(), ids.license_id())
        };
        let vehicle = Vehicle::provision(vehicle_id, license_id, kind, position);
        let data = serde_json::json!({
            "vehicleId": vehicle.id,
            "kind": vehicle.kind,
            "status": vehicle.status,
        });
        let entity = self.world.spawn(vehicle).id();
        self.world
            .resource_mut::<FleetIndex>()
            .vehicles
            .insert(vehicle_id, entity);
        self.broadcast(channels::VEHICLES, RealtimeEventKind::VehicleUpdate, data);
        Ok(vehicle_id)
    }

    /// Take an idle vehicle out of service.
    pub fn set_vehicle_maintenance(&mut self, id: VehicleId) -> Result<(), EngineError> {
        let entity = self.vehicle_entity(id)?;
        let mut vehicle = self
            .world
            .get_mut::<Vehicle>(entity)
            .ok_or(EngineError::VehicleNotFound(id))?;
        if vehicle.current_shipment.is_some() {
            return Err(EngineError::VehicleBusy(id));
        }
        vehicle.status = VehicleStatus::Maintenance;
        Ok(())
    }

    pub fn return_vehicle_to_service(&mut self, id: VehicleId) -> Result<(), EngineError> {
        let entity = self.vehicle_entity(id)?;
        let mut vehicle = self
            .world
            .get_mut::<Vehicle>(entity)
            .ok_or(EngineError::VehicleNotFound(id))?;
        vehicle.status = VehicleStatus::Idle;
        Ok(())
    }

    // ── Lookups ────────────────────────────────────────────────────

    /// Snapshot of a shipment; callers receive a defensive copy.
    pub fn shipment(&self, id: ShipmentId) -> Option<Shipment> {
        let entity = *self.world.resource::<FleetIndex>().shipments.get(&id)?;
        self.world.get::<Shipment>(entity).cloned()
    }

    pub fn shipment_by_tracking(&self, tracking_id: &str) -> Option<Shipment> {
        let id = *self.world.resource::<FleetIndex>().tracking.get(tracking_id)?;
        self.shipment(id)
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<Vehicle> {
        let entity = *self.world.resource::<FleetIndex>().vehicles.get(&id)?;
        self.world.get::<Vehicle>(entity).cloned()
    }

    /// Derived location: origin while pending, destination once delivered,
    /// otherwise the vehicle's live position (falling back to the last
    /// tracking snapshot).
    pub fn current_location(&self, id: ShipmentId) -> Result<Location, EngineError> {
        let entity = self.shipment_entity(id)?;
        let shipment = self
            .world
            .get::<Shipment>(entity)
            .ok_or(EngineError::ShipmentNotFound(id))?;
        let location = match shipment.status {
            ShipmentStatus::Pending => shipment.origin.clone(),
            ShipmentStatus::Delivered => shipment.destination.clone(),
            _ => shipment
                .assigned_vehicle
                .and_then(|entity| self.world.get::<Vehicle>(entity))
                .and_then(|vehicle| vehicle.position.clone())
                .or_else(|| {
                    shipment
                        .tracking_history()
                        .iter()
                        .rev()
                        .find_map(|entry| entry.location.clone())
                })
                .unwrap_or_else(|| shipment.origin.clone()),
        };
        Ok(location)
    }

    /// Current status counts across the whole fleet.
    pub fn counts(&mut self) -> FleetCounts {
        let mut counts = FleetCounts::default();
        let mut shipments = self.world.query::<&Shipment>();
        for shipment in shipments.iter(&self.world) {
            counts.add_shipment(shipment.status);
        }
        let mut vehicles = self.world.query::<&Vehicle>();
        for vehicle in vehicles.iter(&self.world) {
            counts.add_vehicle(vehicle.status);
        }
        counts
    }

    pub fn telemetry(&self) -> &FleetTelemetry {
        self.world.resource::<FleetTelemetry>()
    }

    // ── Internals ──────────────────────────────────────────────────

    fn resolve_customer(&self, customer_id: &str) -> Result<User, EngineError> {
        let retry = *self.world.resource::<RetryPolicy>();
        let directory = self.world.resource::<CustomerDirectoryResource>();
        let user = with_retry(&retry, || directory.0.resolve(customer_id))
            .map_err(FactoryError::Store)?;
        if !user.can_create_shipments() {
            return Err(EngineError::Factory(FactoryError::NotPermitted(
                customer_id.to_string(),
            )));
        }
        Ok(user)
    }

    fn shipment_entity(&self, id: ShipmentId) -> Result<Entity, EngineError> {
        self.world
            .resource::<FleetIndex>()
            .shipments
            .get(&id)
            .copied()
            .ok_or(EngineError::ShipmentNotFound(id))
    }

    fn vehicle_entity(&self, id: VehicleId) -> Result<Entity, EngineError> {
        self.world
            .resource::<FleetIndex>()
            .vehicles
            .get(&id)
            .copied()
            .ok_or(EngineError::VehicleNotFound(id))
    }

    fn with_shipment<T, F>(&mut self, id: ShipmentId, op: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Shipment, u64) -> Result<T, ShipmentError>,
    {
        let entity = self.shipment_entity(id)?;
        let now = self.now_ms();
        let mut shipment = self
            .world
            .get_mut::<Shipment>(entity)
            .ok_or(EngineError::ShipmentNotFound(id))?;
        op(&mut shipment, now).map_err(EngineError::from)
    }

    fn broadcast_shipment_update(&self, id: ShipmentId) {
        if let Some(shipment) = self.shipment(id) {
            self.broadcast(
                channels::SHIPMENTS,
                RealtimeEventKind::ShipmentUpdate,
                serde_json::json!({
                    "id": shipment.id,
                    "trackingId": shipment.tracking_id,
                    "status": shipment.status,
                }),
            );
        }
    }

    fn broadcast(&self, channel: &str, kind: RealtimeEventKind, data: serde_json::Value) {
        let now = self.now_ms();
        let bus = self.world.resource::<EventBusResource>().0.clone();
        bus.broadcast(channel, &RealtimeEvent::new(kind, data, now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StoreError;
    use crate::test_helpers::{la, nyc, request, test_engine, TEST_NOW_MS};
    use crate::users::{Role, User};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn standard_cross_country_request_is_assigned_and_priced() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");

        assert_eq!(created.status, ShipmentStatus::Assigned);
        assert_eq!(created.vehicle_kind, VehicleKind::Truck);
        assert!(created.cost > 0.0);
        assert!(created.tracking_id.starts_with("TRK-"));

        let shipment = engine.shipment(created.shipment_id).expect("lookup");
        assert_eq!(shipment.status, ShipmentStatus::Assigned);
        assert!(shipment.tracking_history().len() >= 1);
        assert_eq!(shipment.assigned_vehicle_id, Some(created.vehicle_id));

        let vehicle = engine.vehicle(created.vehicle_id).expect("vehicle lookup");
        assert_eq!(vehicle.status, VehicleStatus::Assigned);
        assert!(vehicle.link_is_consistent());
    }

    #[test]
    fn light_urgent_short_hop_flies_by_drone() {
        let mut engine = test_engine();
        let mut req = request(20.0, Urgency::High);
        req.destination = Location::new(40.9, -74.1);
        let created = engine.create_shipment(&req).expect("creation");
        assert_eq!(created.vehicle_kind, VehicleKind::Drone);
    }

    #[test]
    fn unknown_customers_are_rejected_before_any_state_exists() {
        let mut engine = test_engine();
        let mut req = request(25.0, Urgency::Standard);
        req.customer_id = "cust-404".to_string();
        let error = engine.create_shipment(&req).expect_err("unknown customer");
        assert_eq!(
            error,
            EngineError::Factory(FactoryError::Store(StoreError::CustomerNotFound(
                "cust-404".to_string()
            )))
        );
        assert!(engine.shipment(ShipmentId(1)).is_none());
    }

    #[test]
    fn drivers_may_not_create_shipments() {
        let mut engine = test_engine();
        let mut req = request(25.0, Urgency::Standard);
        req.customer_id = "drv-1".to_string();
        let error = engine.create_shipment(&req).expect_err("driver request");
        assert!(matches!(
            error,
            EngineError::Factory(FactoryError::NotPermitted(_))
        ));
    }

    #[test]
    fn transient_directory_failures_are_retried_to_success() {
        struct FlakyDirectory {
            calls: AtomicU32,
        }
        impl CustomerDirectory for FlakyDirectory {
            fn resolve(&self, customer_id: &str) -> Result<User, StoreError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Connection("reset".into()))
                } else {
                    Ok(User::new(customer_id, "Ada", Role::Customer))
                }
            }
        }

        let mut engine = LogisticsEngine::new(
            Box::new(FlakyDirectory {
                calls: AtomicU32::new(0),
            }),
            EngineConfig::default()
                .with_clock(Clock::manual(TEST_NOW_MS))
                .with_id_seed(7)
                .with_retry(RetryPolicy {
                    max_attempts: 3,
                    base_delay: std::time::Duration::from_millis(1),
                }),
        );
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("third attempt succeeds");
        assert_eq!(created.status, ShipmentStatus::Assigned);
    }

    #[test]
    fn async_stub_stays_pending_until_processed() {
        let mut engine = test_engine();
        let stub = engine
            .create_pending_shipment(&request(25.0, Urgency::Standard))
            .expect("stub");
        assert_eq!(stub.status, ShipmentStatus::Pending);

        let shipment = engine.shipment(stub.shipment_id).expect("lookup");
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert_eq!(shipment.assigned_vehicle_id, None);

        let created = engine
            .process_pending_shipment(stub.shipment_id)
            .expect("finalize");
        assert_eq!(created.status, ShipmentStatus::Assigned);
        assert!(created.cost > 0.0);
    }

    #[test]
    fn insurance_added_while_pending_is_priced_in_at_processing() {
        let mut engine = test_engine();
        let plain = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("uninsured");

        let stub = engine
            .create_pending_shipment(&request(25.0, Urgency::Standard))
            .expect("stub");
        engine
            .add_insurance(stub.shipment_id, 1000.0)
            .expect("insure while pending");
        let insured = engine
            .process_pending_shipment(stub.shipment_id)
            .expect("finalize");

        assert!((insured.cost - plain.cost - 20.0).abs() < 1e-9);
    }

    #[test]
    fn insurance_is_rejected_once_a_vehicle_is_bound() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        assert_eq!(
            engine.add_insurance(created.shipment_id, 500.0),
            Err(EngineError::Shipment(ShipmentError::AlreadyInTransit))
        );
    }

    #[test]
    fn payments_and_refunds_flow_through_generated_ids() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");

        let txn = engine
            .process_payment(created.shipment_id, 120.0)
            .expect("payment");
        assert!(txn.starts_with("TXN-"));

        let refund = engine
            .refund_payment(created.shipment_id, &txn, 50.0)
            .expect("refund");
        assert!(refund.starts_with("REF-"));

        let shipment = engine.shipment(created.shipment_id).expect("lookup");
        assert_eq!(shipment.net_balance(&txn), Some(70.0));
    }

    #[test]
    fn dispatch_moves_shipment_and_vehicle_into_transit() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        engine
            .dispatch_shipment(created.shipment_id)
            .expect("dispatch");

        let shipment = engine.shipment(created.shipment_id).expect("lookup");
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
        let vehicle = engine.vehicle(created.vehicle_id).expect("vehicle");
        assert_eq!(vehicle.status, VehicleStatus::InTransit);
    }

    #[test]
    fn cancelling_releases_the_vehicle() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        engine.cancel_shipment(created.shipment_id).expect("cancel");

        let shipment = engine.shipment(created.shipment_id).expect("lookup");
        assert_eq!(shipment.status, ShipmentStatus::Cancelled);
        let vehicle = engine.vehicle(created.vehicle_id).expect("vehicle");
        assert_eq!(vehicle.status, VehicleStatus::Idle);
        assert_eq!(vehicle.current_shipment, None);

        // Terminal: nothing further is accepted.
        assert!(engine.dispatch_shipment(created.shipment_id).is_err());
    }

    #[test]
    fn current_location_follows_the_lifecycle() {
        let mut engine = test_engine();
        let stub = engine
            .create_pending_shipment(&request(25.0, Urgency::Standard))
            .expect("stub");
        let at_creation = engine.current_location(stub.shipment_id).expect("location");
        assert!(at_creation.same_point(&nyc()));

        engine
            .process_pending_shipment(stub.shipment_id)
            .expect("finalize");
        engine.dispatch_shipment(stub.shipment_id).expect("dispatch");
        for _ in 0..3 {
            engine.run_fleet_tick();
        }
        let in_transit = engine.current_location(stub.shipment_id).expect("location");
        assert!(!in_transit.same_point(&nyc()));
        assert!(!in_transit.same_point(&la()));
    }

    #[test]
    fn lookup_by_tracking_id_matches_lookup_by_id() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        let by_tracking = engine
            .shipment_by_tracking(&created.tracking_id)
            .expect("tracking lookup");
        assert_eq!(by_tracking.id, created.shipment_id);
    }

    #[test]
    fn creation_broadcasts_new_shipment_then_assignment_update() {
        let mut engine = test_engine();
        let kinds = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = kinds.clone();
        let _sub = engine.bus().subscribe(channels::ALL, move |event| {
            seen.lock().expect("kinds lock").push(event.kind);
            Ok(())
        });

        engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        assert_eq!(
            *kinds.lock().expect("kinds lock"),
            vec![
                RealtimeEventKind::NewShipment,
                RealtimeEventKind::AssignmentUpdate
            ]
        );
    }

    #[test]
    fn provisioning_is_admin_only_and_supports_ships() {
        let mut engine = test_engine();
        let admin = User::new("admin-1", "Sam", Role::Admin);
        let customer = User::new("cust-1", "Ada", Role::Customer);

        let error = engine
            .provision_vehicle(&customer, VehicleKind::Ship, None)
            .expect_err("customers cannot provision");
        assert!(matches!(
            error,
            EngineError::Factory(FactoryError::NotPermitted(_))
        ));

        let id = engine
            .provision_vehicle(&admin, VehicleKind::Ship, Some(nyc()))
            .expect("admin provisions a ship");
        let ship = engine.vehicle(id).expect("ship lookup");
        assert_eq!(ship.kind, VehicleKind::Ship);
        assert_eq!(ship.status, VehicleStatus::Idle);
        assert_eq!(ship.capacity_kg, VehicleKind::Ship.spec().capacity_kg);
    }

    #[test]
    fn maintenance_requires_an_idle_vehicle() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        assert_eq!(
            engine.set_vehicle_maintenance(created.vehicle_id),
            Err(EngineError::VehicleBusy(created.vehicle_id))
        );

        engine.cancel_shipment(created.shipment_id).expect("cancel");
        engine
            .set_vehicle_maintenance(created.vehicle_id)
            .expect("idle vehicle enters maintenance");
        assert_eq!(
            engine.vehicle(created.vehicle_id).expect("vehicle").status,
            VehicleStatus::Maintenance
        );
        engine
            .return_vehicle_to_service(created.vehicle_id)
            .expect("back to service");
    }

    #[test]
    fn counts_reflect_the_fleet() {
        let mut engine = test_engine();
        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        engine
            .create_pending_shipment(&request(10.0, Urgency::Standard))
            .expect("stub");
        engine
            .dispatch_shipment(created.shipment_id)
            .expect("dispatch");

        let counts = engine.counts();
        assert_eq!(counts.shipments_pending, 1);
        assert_eq!(counts.shipments_in_transit, 1);
        assert_eq!(counts.vehicles_in_transit, 1);
    }

    #[test]
    fn subscriber_failures_never_break_engine_operations() {
        let mut engine = test_engine();
        let _dead = engine
            .bus()
            .subscribe(channels::ALL, |_event| Err(crate::bus::SubscriberGone));
        let healthy = Arc::new(AtomicUsize::new(0));
        let count = healthy.clone();
        let _alive = engine.bus().subscribe(channels::ALL, move |_event| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation proceeds despite the dead subscriber");
        assert_eq!(healthy.load(Ordering::SeqCst), 2);
        assert_eq!(engine.bus().subscriber_count(), 1);
    }
}
