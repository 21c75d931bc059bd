//! Time source for the engine.
//!
//! All timestamps are unix milliseconds. The system variant reads the wall
//! clock; the manual variant is advanced explicitly, which keeps simulation
//! and handler tests deterministic.

use bevy_ecs::prelude::Resource;

#[derive(Debug, Clone, Resource)]
pub enum Clock {
    System,
    Manual { now_ms: u64 },
}

impl Clock {
    pub fn manual(start_ms: u64) -> Self {
        Clock::Manual { now_ms: start_ms }
    }

    pub fn now_ms(&self) -> u64 {
        match self {
            Clock::System => chrono::Utc::now().timestamp_millis() as u64,
            Clock::Manual { now_ms } => *now_ms,
        }
    }

    /// Advance a manual clock; a no-op on the system clock.
    pub fn advance(&mut self, ms: u64) {
        if let Clock::Manual { now_ms } = self {
            *now_ms += ms;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}
