//! The job dispatch facade: asynchronous when the environment supports it,
//! synchronous inline processing otherwise.
//!
//! Availability is a capability check: an executor must be wired in and a
//! reachable worker callback URL must be configured. When unavailable the
//! fallback runs the whole creation synchronously through the engine, and
//! both paths end on the same final shipment invariants.

use fleet_core::engine::{CreatedShipment, LogisticsEngine};
use fleet_dispatch_core::contract::{normalize_request, ShipmentJobRequest};
use serde::Serialize;

use crate::adapters::invoke::WorkerInvoker;
use crate::adapters::job_store::JobStore;
use crate::convert::to_core_request;
use crate::handlers::enqueue::{handle_enqueue, EnqueueError, JobAccepted};

/// Environment variable naming the worker callback URL.
pub const CALLBACK_URL_ENV: &str = "FLEET_WORKER_CALLBACK_URL";

pub fn callback_url_from_env() -> Option<String> {
    std::env::var(CALLBACK_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Either an accepted asynchronous job or a synchronously completed shipment.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateShipmentResponse {
    Accepted(JobAccepted),
    Completed(CreatedShipment),
}

pub struct JobDispatch {
    invoker: Option<Box<dyn WorkerInvoker>>,
    callback_url: Option<String>,
    store: JobStore,
}

impl JobDispatch {
    pub fn new(store: JobStore) -> Self {
        Self {
            invoker: None,
            callback_url: None,
            store,
        }
    }

    pub fn with_invoker(mut self, invoker: Box<dyn WorkerInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// The execution environment supports asynchronous processing.
    pub fn is_available(&self) -> bool {
        self.invoker.is_some() && self.callback_url.is_some()
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Create a shipment via the async path when available, synchronously
    /// otherwise. Dispatch unavailability is never a user-visible error.
    pub fn create_shipment(
        &self,
        engine: &mut LogisticsEngine,
        request: ShipmentJobRequest,
    ) -> Result<CreateShipmentResponse, EnqueueError> {
        if let (Some(invoker), Some(_)) = (&self.invoker, &self.callback_url) {
            return handle_enqueue(request, engine, &self.store, invoker.as_ref())
                .map(CreateShipmentResponse::Accepted);
        }

        let normalized = normalize_request(request)
            .map_err(|error| EnqueueError::Validation(error.message().to_string()))?;
        let created = engine.create_shipment(&to_core_request(&normalized))?;
        Ok(CreateShipmentResponse::Completed(created))
    }

    /// Housekeeping sweep over terminal job records.
    pub fn sweep_expired(&self, now: u64) -> usize {
        self.store.sweep_expired(now)
    }
}
