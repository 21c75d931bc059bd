//! Identifier generation for shipments, vehicles, and ledger entries.
//!
//! Numeric ids are sequential per engine; the public-facing codes
//! (`TRK-`, `TXN-`, `REF-`, `LIC-`) carry random digit suffixes from a
//! seedable RNG so tests stay reproducible.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::shipment::ShipmentId;
use crate::vehicle::VehicleId;

#[derive(Resource)]
pub struct IdGenerator {
    rng: StdRng,
    next_shipment: u64,
    next_vehicle: u64,
}

impl IdGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            next_shipment: 1,
            next_vehicle: 1,
        }
    }

    pub fn next_shipment_id(&mut self) -> ShipmentId {
        let id = ShipmentId(self.next_shipment);
        self.next_shipment += 1;
        id
    }

    pub fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_vehicle);
        self.next_vehicle += 1;
        id
    }

    pub fn tracking_id(&mut self) -> String {
        format!("TRK-{:09}", self.rng.gen_range(0..1_000_000_000u64))
    }

    pub fn transaction_id(&mut self) -> String {
        format!("TXN-{:09}", self.rng.gen_range(0..1_000_000_000u64))
    }

    pub fn refund_id(&mut self) -> String {
        format!("REF-{:09}", self.rng.gen_range(0..1_000_000_000u64))
    }

    pub fn license_id(&mut self) -> String {
        format!("LIC-{:06}", self.rng.gen_range(0..1_000_000u64))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_are_sequential() {
        let mut ids = IdGenerator::new(Some(1));
        assert_eq!(ids.next_shipment_id(), ShipmentId(1));
        assert_eq!(ids.next_shipment_id(), ShipmentId(2));
        assert_eq!(ids.next_vehicle_id(), VehicleId(1));
    }

    #[test]
    fn codes_carry_the_expected_prefixes() {
        let mut ids = IdGenerator::new(Some(1));
        let tracking = ids.tracking_id();
        assert!(tracking.starts_with("TRK-"));
        assert_eq!(tracking.len(), "TRK-".len() + 9);
        assert!(tracking["TRK-".len()..].chars().all(|c| c.is_ascii_digit()));
        assert!(ids.transaction_id().starts_with("TXN-"));
        assert!(ids.refund_id().starts_with("REF-"));
        assert!(ids.license_id().starts_with("LIC-"));
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let mut a = IdGenerator::new(Some(7));
        let mut b = IdGenerator::new(Some(7));
        assert_eq!(a.tracking_id(), b.tracking_id());
        assert_eq!(a.transaction_id(), b.transaction_id());
    }
}
