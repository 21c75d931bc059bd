pub mod fleet_tick;

#[cfg(test)]
mod end_to_end_tests {
    use crate::events::channels;
    use crate::events::RealtimeEventKind;
    use crate::factory::Urgency;
    use crate::geo::Location;
    use crate::shipment::ShipmentStatus;
    use crate::systems::fleet_tick::TickAction;
    use crate::test_helpers::{request, test_engine};
    use crate::vehicle::{VehicleStatus, FUEL_FLOOR_PCT};
    use std::sync::{Arc, Mutex};

    #[test]
    fn a_shipment_travels_the_full_lifecycle_to_delivery() {
        let mut engine = test_engine();
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let seen = kinds.clone();
        let _sub = engine.bus().subscribe(channels::ALL, move |event| {
            seen.lock().expect("kinds lock").push(event.kind);
            Ok(())
        });

        let created = engine
            .create_shipment(&request(25.0, Urgency::Standard))
            .expect("creation");
        engine
            .dispatch_shipment(created.shipment_id)
            .expect("dispatch");

        let mut delivered_at_tick = None;
        for tick in 0..200 {
            engine.advance_clock(1_000);
            let report = engine.run_fleet_tick();
            if report
                .updates
                .iter()
                .any(|update| update.action == TickAction::Delivered)
            {
                delivered_at_tick = Some(tick);
                break;
            }
        }
        let delivered_at_tick = delivered_at_tick.expect("the truck eventually arrives");
        // NYC -> LA is ~44.7 degrees at truck speed 0.3/tick.
        assert!(delivered_at_tick > 100);

        let shipment = engine.shipment(created.shipment_id).expect("lookup");
        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert!(shipment.actual_delivery.is_some());
        assert_eq!(shipment.tracking_history().len(), 4);
        let mut last = 0;
        for entry in shipment.tracking_history() {
            assert!(entry.timestamp >= last, "history must be chronological");
            last = entry.timestamp;
        }

        let vehicle = engine.vehicle(created.vehicle_id).expect("vehicle");
        assert_eq!(vehicle.status, VehicleStatus::Idle);
        assert!(vehicle.fuel_pct >= FUEL_FLOOR_PCT);

        engine
            .record_signature(created.shipment_id, "R. Cartwright")
            .expect("signature after delivery");

        assert_eq!(engine.telemetry().delivered.len(), 1);

        let kinds = kinds.lock().expect("kinds lock");
        assert_eq!(kinds[0], RealtimeEventKind::NewShipment);
        assert_eq!(kinds[1], RealtimeEventKind::AssignmentUpdate);
        assert!(kinds.contains(&RealtimeEventKind::VehicleUpdate));
        assert!(kinds.contains(&RealtimeEventKind::StatsUpdate));
    }

    #[test]
    fn concurrent_shipments_progress_independently() {
        let mut engine = test_engine();

        // A short-hop urgent parcel by drone and a cross-country truck load.
        let mut drone_req = request(10.0, Urgency::High);
        drone_req.destination = Location::new(40.9, -74.1);
        let drone = engine.create_shipment(&drone_req).expect("drone shipment");
        let truck = engine
            .create_shipment(&request(400.0, Urgency::Standard))
            .expect("truck shipment");

        engine.dispatch_shipment(drone.shipment_id).expect("drone out");
        engine.dispatch_shipment(truck.shipment_id).expect("truck out");

        engine.advance_clock(1_000);
        let report = engine.run_fleet_tick();
        assert_eq!(report.vehicles_updated, 2);

        // The drone's route is under the arrival threshold: one tick delivers.
        let drone_shipment = engine.shipment(drone.shipment_id).expect("drone lookup");
        assert_eq!(drone_shipment.status, ShipmentStatus::Delivered);
        let truck_shipment = engine.shipment(truck.shipment_id).expect("truck lookup");
        assert_eq!(truck_shipment.status, ShipmentStatus::InTransit);

        // Cancelling the truck mid-transit frees its vehicle; later ticks
        // have nothing left to move.
        engine.cancel_shipment(truck.shipment_id).expect("cancel");
        let vehicle = engine.vehicle(truck.vehicle_id).expect("vehicle");
        assert_eq!(vehicle.status, VehicleStatus::Idle);

        engine.advance_clock(1_000);
        let report = engine.run_fleet_tick();
        assert_eq!(report.vehicles_updated, 0);
    }
}
