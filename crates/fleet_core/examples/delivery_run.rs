//! Run a small scripted scenario: create a handful of shipments, dispatch
//! them, and tick the fleet until everything is delivered, printing each
//! tick report as JSON.
//!
//! Usage: `cargo run -p fleet_core --example delivery_run`

use fleet_core::engine::LogisticsEngine;
use fleet_core::events::channels;
use fleet_core::factory::Urgency;
use fleet_core::geo::Location;
use fleet_core::stream::sse_frame;
use fleet_core::test_helpers::{request, test_engine};

fn main() {
    let mut engine: LogisticsEngine = test_engine();

    // Mirror what a live subscriber connection would see.
    let _subscription = engine.bus().subscribe(channels::ALL, |event| {
        print!("{}", sse_frame(event));
        Ok(())
    });

    let mut shipments = Vec::new();
    let routes = [
        Location::new(41.8781, -87.6298),
        Location::new(39.9526, -75.1652),
        Location::new(40.9, -74.1),
    ];
    for (index, destination) in routes.into_iter().enumerate() {
        let mut req = request(20.0 + index as f64 * 150.0, Urgency::Standard);
        req.destination = destination;
        let created = engine.create_shipment(&req).expect("creation failed");
        engine
            .dispatch_shipment(created.shipment_id)
            .expect("dispatch failed");
        shipments.push(created.shipment_id);
    }

    for tick in 0..100 {
        engine.advance_clock(1_000);
        let report = engine.run_fleet_tick();
        if report.vehicles_updated == 0 {
            println!("fleet idle after {tick} ticks");
            break;
        }
        println!(
            "tick {tick}: {}",
            serde_json::to_string(&report).expect("report serializes")
        );
    }

    for id in shipments {
        let shipment = engine.shipment(id).expect("shipment lookup");
        println!(
            "{} -> {:?} (cost {:.2})",
            shipment.tracking_id, shipment.status, shipment.cost
        );
    }
}
