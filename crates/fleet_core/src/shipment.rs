//! Shipments: the lifecycle state machine, tracking history, and payment
//! ledger.
//!
//! Status moves only along `PENDING -> ASSIGNED -> IN_TRANSIT -> DELIVERED`,
//! with cancellation permitted from any non-terminal state. Every successful
//! transition appends exactly one tracking-history entry; the history is
//! seeded at creation and never shrinks. All operations validate before
//! mutating, so a failed call leaves the shipment untouched.

use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{distance_km, Location};
use crate::pricing::{quote, PricingStrategy, ShipmentType};
use crate::vehicle::VehicleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    /// Direct successors in the lifecycle graph; no skipping.
    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Pending, Cancelled)
                | (Assigned, InTransit)
                | (Assigned, Cancelled)
                | (InTransit, Delivered)
                | (InTransit, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }

    fn transition_description(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "Shipment created",
            ShipmentStatus::Assigned => "Vehicle assigned",
            ShipmentStatus::InTransit => "Departed origin",
            ShipmentStatus::Delivered => "Delivered to destination",
            ShipmentStatus::Cancelled => "Shipment cancelled",
        }
    }
}

/// One audit-log entry; appended per successful status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub timestamp: u64,
    pub status: ShipmentStatus,
    pub location: Option<Location>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Refund,
}

/// A ledger entry. Payments are positive; refunds are negative and reference
/// the transaction they reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub transaction_id: String,
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_of: Option<String>,
    pub timestamp: u64,
}

/// A timestamped free-form note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShipmentError {
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },
    #[error("vehicle capacity {capacity_kg} kg is below shipment weight {weight_kg} kg")]
    CapacityExceeded { capacity_kg: f64, weight_kg: f64 },
    #[error("shipment already has a vehicle assigned")]
    VehicleAlreadyAssigned,
    #[error("insurance value must not be negative")]
    NegativeValue,
    #[error("insurance can only be changed while the shipment is pending")]
    AlreadyInTransit,
    #[error("note text must not be empty")]
    EmptyNote,
    #[error("payment amount must be positive")]
    NonPositiveAmount,
    #[error("no payment found for transaction {0}")]
    PaymentNotFound(String),
    #[error("refund exceeds the remaining balance of transaction {transaction_id}")]
    RefundExceedsOriginal { transaction_id: String },
    #[error("signature requires a delivered shipment")]
    NotYetDelivered,
    #[error("shipment type is locked once processing has started")]
    ProcessingStarted,
    #[error("estimated delivery time must be in the future")]
    TimeInPast,
}

#[derive(Debug, Clone, Component)]
pub struct Shipment {
    pub id: ShipmentId,
    pub tracking_id: String,
    pub weight_kg: f64,
    pub origin: Location,
    pub destination: Location,
    pub status: ShipmentStatus,
    pub shipment_type: ShipmentType,
    pub cost: f64,
    pub insured: bool,
    pub insurance_value: f64,
    notes: Vec<Note>,
    tracking_history: Vec<TrackingEntry>,
    payments: Vec<PaymentRecord>,
    pub assigned_vehicle: Option<Entity>,
    pub assigned_vehicle_id: Option<VehicleId>,
    pub estimated_delivery: Option<u64>,
    pub actual_delivery: Option<u64>,
    pub signature: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Shipment {
    /// A new pending shipment. The tracking history is seeded with the
    /// creation entry so it is never empty.
    pub fn new(
        id: ShipmentId,
        tracking_id: impl Into<String>,
        weight_kg: f64,
        origin: Location,
        destination: Location,
        shipment_type: ShipmentType,
        now: u64,
    ) -> Self {
        let seed = TrackingEntry {
            timestamp: now,
            status: ShipmentStatus::Pending,
            location: Some(origin.clone()),
            description: ShipmentStatus::Pending.transition_description().to_string(),
        };
        Self {
            id,
            tracking_id: tracking_id.into(),
            weight_kg,
            origin,
            destination,
            status: ShipmentStatus::Pending,
            shipment_type,
            cost: 0.0,
            insured: false,
            insurance_value: 0.0,
            notes: Vec::new(),
            tracking_history: vec![seed],
            payments: Vec::new(),
            assigned_vehicle: None,
            assigned_vehicle_id: None,
            estimated_delivery: None,
            actual_delivery: None,
            signature: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the lifecycle. `location` is the position snapshot recorded in
    /// the tracking history; delivery also stamps `actual_delivery`.
    pub fn update_status(
        &mut self,
        next: ShipmentStatus,
        location: Option<Location>,
        now: u64,
    ) -> Result<(), ShipmentError> {
        if !self.status.can_transition_to(next) {
            return Err(ShipmentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next == ShipmentStatus::Delivered {
            self.actual_delivery = Some(now);
        }
        self.tracking_history.push(TrackingEntry {
            timestamp: now,
            status: next,
            location,
            description: next.transition_description().to_string(),
        });
        self.updated_at = now;
        Ok(())
    }

    /// Bind a vehicle and move to Assigned. The capacity check happens before
    /// any mutation, and a vehicle can be bound exactly once.
    pub fn assign_vehicle(
        &mut self,
        vehicle: Entity,
        vehicle_id: VehicleId,
        capacity_kg: f64,
        now: u64,
    ) -> Result<(), ShipmentError> {
        if capacity_kg < self.weight_kg {
            return Err(ShipmentError::CapacityExceeded {
                capacity_kg,
                weight_kg: self.weight_kg,
            });
        }
        if self.assigned_vehicle.is_some() {
            return Err(ShipmentError::VehicleAlreadyAssigned);
        }
        if !self.status.can_transition_to(ShipmentStatus::Assigned) {
            return Err(ShipmentError::InvalidTransition {
                from: self.status,
                to: ShipmentStatus::Assigned,
            });
        }
        self.assigned_vehicle = Some(vehicle);
        self.assigned_vehicle_id = Some(vehicle_id);
        let origin = self.origin.clone();
        self.update_status(ShipmentStatus::Assigned, Some(origin), now)
    }

    pub fn add_insurance(&mut self, value: f64, now: u64) -> Result<(), ShipmentError> {
        if value < 0.0 {
            return Err(ShipmentError::NegativeValue);
        }
        if self.status != ShipmentStatus::Pending {
            return Err(ShipmentError::AlreadyInTransit);
        }
        self.insured = true;
        self.insurance_value = value;
        self.updated_at = now;
        Ok(())
    }

    pub fn add_note(&mut self, text: &str, now: u64) -> Result<(), ShipmentError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ShipmentError::EmptyNote);
        }
        self.notes.push(Note {
            timestamp: now,
            text: trimmed.to_string(),
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn tracking_history(&self) -> &[TrackingEntry] {
        &self.tracking_history
    }

    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    /// Recompute and store the cost under the given strategy.
    pub fn calculate_cost(&mut self, strategy: PricingStrategy) -> f64 {
        let distance = distance_km(&self.origin, &self.destination);
        self.cost = quote(
            strategy,
            self.weight_kg,
            distance,
            self.shipment_type,
            self.insured.then_some(self.insurance_value),
        );
        self.cost
    }

    /// Record a completed payment under the supplied transaction id.
    pub fn process_payment(
        &mut self,
        amount: f64,
        transaction_id: String,
        now: u64,
    ) -> Result<(), ShipmentError> {
        if amount <= 0.0 {
            return Err(ShipmentError::NonPositiveAmount);
        }
        self.payments.push(PaymentRecord {
            transaction_id,
            amount,
            status: PaymentStatus::Completed,
            refund_of: None,
            timestamp: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Net remaining balance of a payment: its amount minus issued refunds.
    pub fn net_balance(&self, transaction_id: &str) -> Option<f64> {
        let payment = self.payments.iter().find(|record| {
            record.status == PaymentStatus::Completed && record.transaction_id == transaction_id
        })?;
        let refunded: f64 = self
            .payments
            .iter()
            .filter(|record| record.refund_of.as_deref() == Some(transaction_id))
            .map(|record| record.amount)
            .sum();
        Some(payment.amount + refunded)
    }

    /// Refund part or all of a prior payment. The refund is recorded as a
    /// negative ledger entry and can never drive the net balance below zero.
    pub fn refund(
        &mut self,
        transaction_id: &str,
        amount: f64,
        refund_id: String,
        now: u64,
    ) -> Result<(), ShipmentError> {
        if amount <= 0.0 {
            return Err(ShipmentError::NonPositiveAmount);
        }
        let remaining = self
            .net_balance(transaction_id)
            .ok_or_else(|| ShipmentError::PaymentNotFound(transaction_id.to_string()))?;
        if amount > remaining {
            return Err(ShipmentError::RefundExceedsOriginal {
                transaction_id: transaction_id.to_string(),
            });
        }
        self.payments.push(PaymentRecord {
            transaction_id: refund_id,
            amount: -amount,
            status: PaymentStatus::Refund,
            refund_of: Some(transaction_id.to_string()),
            timestamp: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn record_signature(&mut self, name: &str, now: u64) -> Result<(), ShipmentError> {
        if self.status != ShipmentStatus::Delivered {
            return Err(ShipmentError::NotYetDelivered);
        }
        self.signature = Some(name.trim().to_string());
        self.updated_at = now;
        Ok(())
    }

    pub fn set_shipment_type(
        &mut self,
        shipment_type: ShipmentType,
        now: u64,
    ) -> Result<(), ShipmentError> {
        if self.status != ShipmentStatus::Pending {
            return Err(ShipmentError::ProcessingStarted);
        }
        self.shipment_type = shipment_type;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_estimated_delivery(&mut self, time: u64, now: u64) -> Result<(), ShipmentError> {
        if time <= now {
            return Err(ShipmentError::TimeInPast);
        }
        self.estimated_delivery = Some(time);
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::World;
    use ShipmentStatus::*;

    const NOW: u64 = 1_700_000_000_000;

    fn shipment() -> Shipment {
        Shipment::new(
            ShipmentId(1),
            "TRK-123456789",
            25.0,
            Location::new(40.7128, -74.0060),
            Location::new(34.0522, -118.2437),
            ShipmentType::Standard,
            NOW,
        )
    }

    fn marker(world: &mut World) -> Entity {
        world.spawn(()).id()
    }

    #[test]
    fn creation_seeds_exactly_one_history_entry() {
        let shipment = shipment();
        assert_eq!(shipment.status, Pending);
        assert_eq!(shipment.tracking_history().len(), 1);
        assert_eq!(shipment.tracking_history()[0].status, Pending);
        assert!(shipment.tracking_history()[0]
            .location
            .as_ref()
            .expect("seed entry carries the origin")
            .same_point(&shipment.origin));
    }

    #[test]
    fn every_successful_transition_appends_one_entry() {
        let mut world = World::new();
        let vehicle = marker(&mut world);
        let mut shipment = shipment();

        shipment
            .assign_vehicle(vehicle, VehicleId(9), 100.0, NOW + 1)
            .expect("assignment");
        assert_eq!(shipment.tracking_history().len(), 2);

        shipment
            .update_status(InTransit, None, NOW + 2)
            .expect("dispatch");
        assert_eq!(shipment.tracking_history().len(), 3);

        shipment
            .update_status(Delivered, Some(shipment.destination.clone()), NOW + 3)
            .expect("delivery");
        assert_eq!(shipment.tracking_history().len(), 4);
        assert_eq!(shipment.actual_delivery, Some(NOW + 3));
    }

    #[test]
    fn disallowed_transitions_fail_and_leave_state_unchanged() {
        let all = [Pending, Assigned, InTransit, Delivered, Cancelled];
        for from in all {
            for to in all {
                if from.can_transition_to(to) {
                    continue;
                }
                let mut shipment = shipment();
                shipment.status = from;
                let history_len = shipment.tracking_history().len();
                let error = shipment
                    .update_status(to, None, NOW + 1)
                    .expect_err("transition should be rejected");
                assert_eq!(error, ShipmentError::InvalidTransition { from, to });
                assert_eq!(shipment.status, from);
                assert_eq!(shipment.tracking_history().len(), history_len);
            }
        }
    }

    #[test]
    fn terminal_states_accept_no_further_updates() {
        for terminal in [Delivered, Cancelled] {
            assert!(terminal.is_terminal());
            let mut shipment = shipment();
            shipment.status = terminal;
            for next in [Pending, Assigned, InTransit, Delivered, Cancelled] {
                assert!(shipment.update_status(next, None, NOW + 1).is_err());
            }
        }
    }

    #[test]
    fn capacity_check_runs_before_any_mutation() {
        let mut world = World::new();
        let vehicle = marker(&mut world);
        let mut shipment = shipment();
        let error = shipment
            .assign_vehicle(vehicle, VehicleId(9), 10.0, NOW + 1)
            .expect_err("capacity too small");
        assert!(matches!(error, ShipmentError::CapacityExceeded { .. }));
        assert_eq!(shipment.assigned_vehicle, None);
        assert_eq!(shipment.assigned_vehicle_id, None);
        assert_eq!(shipment.status, Pending);
        assert_eq!(shipment.tracking_history().len(), 1);
    }

    #[test]
    fn a_vehicle_is_bound_exactly_once() {
        let mut world = World::new();
        let first = marker(&mut world);
        let second = marker(&mut world);
        let mut shipment = shipment();
        shipment
            .assign_vehicle(first, VehicleId(1), 100.0, NOW + 1)
            .expect("first assignment");
        let error = shipment
            .assign_vehicle(second, VehicleId(2), 100.0, NOW + 2)
            .expect_err("second assignment must fail");
        assert_eq!(error, ShipmentError::VehicleAlreadyAssigned);
        assert_eq!(shipment.assigned_vehicle, Some(first));
    }

    #[test]
    fn insurance_is_pending_only_and_non_negative() {
        let mut shipment = shipment();
        assert_eq!(
            shipment.add_insurance(-1.0, NOW + 1),
            Err(ShipmentError::NegativeValue)
        );
        shipment.add_insurance(1000.0, NOW + 1).expect("insure");
        assert!(shipment.insured);
        assert_eq!(shipment.insurance_value, 1000.0);

        let mut world = World::new();
        let vehicle = marker(&mut world);
        shipment
            .assign_vehicle(vehicle, VehicleId(1), 100.0, NOW + 2)
            .expect("assignment");
        assert_eq!(
            shipment.add_insurance(500.0, NOW + 3),
            Err(ShipmentError::AlreadyInTransit)
        );
    }

    #[test]
    fn insured_cost_adds_two_percent_of_value() {
        let mut uninsured = shipment();
        let mut insured = shipment();
        insured.add_insurance(1000.0, NOW + 1).expect("insure");
        let base = uninsured.calculate_cost(PricingStrategy::Ground);
        let with_insurance = insured.calculate_cost(PricingStrategy::Ground);
        assert!(base > 0.0);
        assert!((with_insurance - base - 20.0).abs() < 1e-9);
        assert_eq!(insured.cost, with_insurance);
    }

    #[test]
    fn blank_notes_are_rejected() {
        let mut shipment = shipment();
        assert_eq!(
            shipment.add_note("   ", NOW + 1),
            Err(ShipmentError::EmptyNote)
        );
        shipment
            .add_note("  handle with care  ", NOW + 1)
            .expect("note");
        assert_eq!(shipment.notes().len(), 1);
        assert_eq!(shipment.notes()[0].text, "handle with care");
        assert_eq!(shipment.notes()[0].timestamp, NOW + 1);
    }

    #[test]
    fn payments_must_be_positive() {
        let mut shipment = shipment();
        assert_eq!(
            shipment.process_payment(0.0, "TXN-1".into(), NOW + 1),
            Err(ShipmentError::NonPositiveAmount)
        );
        assert_eq!(
            shipment.process_payment(-5.0, "TXN-1".into(), NOW + 1),
            Err(ShipmentError::NonPositiveAmount)
        );
        shipment
            .process_payment(120.0, "TXN-1".into(), NOW + 1)
            .expect("payment");
        assert_eq!(shipment.payments().len(), 1);
        assert_eq!(shipment.net_balance("TXN-1"), Some(120.0));
    }

    #[test]
    fn refunds_never_drive_the_net_balance_negative() {
        let mut shipment = shipment();
        shipment
            .process_payment(100.0, "TXN-1".into(), NOW + 1)
            .expect("payment");

        shipment
            .refund("TXN-1", 60.0, "REF-1".into(), NOW + 2)
            .expect("first refund");
        assert_eq!(shipment.net_balance("TXN-1"), Some(40.0));

        let error = shipment
            .refund("TXN-1", 50.0, "REF-2".into(), NOW + 3)
            .expect_err("over-refund");
        assert!(matches!(error, ShipmentError::RefundExceedsOriginal { .. }));

        shipment
            .refund("TXN-1", 40.0, "REF-2".into(), NOW + 3)
            .expect("exact remainder");
        assert_eq!(shipment.net_balance("TXN-1"), Some(0.0));
        assert!(shipment
            .refund("TXN-1", 0.01, "REF-3".into(), NOW + 4)
            .is_err());
    }

    #[test]
    fn refund_requires_a_known_transaction() {
        let mut shipment = shipment();
        let error = shipment
            .refund("TXN-missing", 10.0, "REF-1".into(), NOW + 1)
            .expect_err("unknown transaction");
        assert_eq!(
            error,
            ShipmentError::PaymentNotFound("TXN-missing".to_string())
        );
    }

    #[test]
    fn signature_requires_delivery() {
        let mut shipment = shipment();
        assert_eq!(
            shipment.record_signature("R. Cartwright", NOW + 1),
            Err(ShipmentError::NotYetDelivered)
        );
        shipment.status = Delivered;
        shipment
            .record_signature("R. Cartwright", NOW + 2)
            .expect("signature");
        assert_eq!(shipment.signature.as_deref(), Some("R. Cartwright"));
    }

    #[test]
    fn shipment_type_locks_after_pending() {
        let mut shipment = shipment();
        shipment
            .set_shipment_type(ShipmentType::Express, NOW + 1)
            .expect("retype while pending");
        assert_eq!(shipment.shipment_type, ShipmentType::Express);

        let mut world = World::new();
        let vehicle = marker(&mut world);
        shipment
            .assign_vehicle(vehicle, VehicleId(1), 100.0, NOW + 2)
            .expect("assignment");
        assert_eq!(
            shipment.set_shipment_type(ShipmentType::Standard, NOW + 3),
            Err(ShipmentError::ProcessingStarted)
        );
    }

    #[test]
    fn estimated_delivery_must_be_in_the_future() {
        let mut shipment = shipment();
        assert_eq!(
            shipment.set_estimated_delivery(NOW, NOW),
            Err(ShipmentError::TimeInPast)
        );
        shipment
            .set_estimated_delivery(NOW + 60_000, NOW)
            .expect("future time");
        assert_eq!(shipment.estimated_delivery, Some(NOW + 60_000));
    }
}
