//! Server-push framing for the live event stream.
//!
//! The transport layer owns the connection; this module only shapes what goes
//! over it: one `data: <json>` frame per event, a `connected` greeting when a
//! subscriber attaches, and a keep-alive `ping` on a fixed interval driven by
//! the caller's clock.

use crate::events::RealtimeEvent;

/// Keep-alive cadence for long-lived subscriber connections.
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 15_000;

/// Encode one event as a server-sent-event frame.
pub fn sse_frame(event: &RealtimeEvent) -> String {
    let body = serde_json::to_string(event).expect("realtime event should serialize");
    format!("data: {body}\n\n")
}

/// The greeting frame sent when a subscriber attaches to `channel`.
pub fn connected_frame(channel: &str, now_ms: u64) -> String {
    sse_frame(&RealtimeEvent::connected(channel, now_ms))
}

/// Fixed-interval keep-alive schedule. The transport polls it from its own
/// timer loop; cancellation is just dropping the schedule with the
/// subscription.
#[derive(Debug, Clone)]
pub struct KeepAlive {
    interval_ms: u64,
    last_sent_ms: u64,
}

impl KeepAlive {
    pub fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: now_ms,
        }
    }

    /// A ping event when the interval has elapsed, `None` otherwise.
    pub fn poll(&mut self, now_ms: u64) -> Option<RealtimeEvent> {
        if now_ms.saturating_sub(self.last_sent_ms) < self.interval_ms {
            return None;
        }
        self.last_sent_ms = now_ms;
        Some(RealtimeEvent::ping(now_ms))
    }
}
