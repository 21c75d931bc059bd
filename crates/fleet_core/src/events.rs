//! Realtime events pushed to live subscribers.
//!
//! Events are ephemeral wire values, never persisted; `ping` and `connected`
//! exist only to keep long-lived subscriber connections alive and carry no
//! domain state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Channel names used by the engine's broadcasts.
pub mod channels {
    /// Reserved channel that receives every broadcast.
    pub const ALL: &str = "all";
    pub const SHIPMENTS: &str = "shipments";
    pub const VEHICLES: &str = "vehicles";
    pub const STATS: &str = "stats";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeEventKind {
    ShipmentUpdate,
    VehicleUpdate,
    NewShipment,
    AssignmentUpdate,
    StatsUpdate,
    Ping,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: RealtimeEventKind,
    pub data: Value,
    pub timestamp: u64,
}

impl RealtimeEvent {
    pub fn new(kind: RealtimeEventKind, data: Value, timestamp: u64) -> Self {
        Self {
            kind,
            data,
            timestamp,
        }
    }

    pub fn ping(timestamp: u64) -> Self {
        Self::new(RealtimeEventKind::Ping, Value::Null, timestamp)
    }

    pub fn connected(channel: &str, timestamp: u64) -> Self {
        Self::new(
            RealtimeEventKind::Connected,
            json!({ "channel": channel }),
            timestamp,
        )
    }
}
