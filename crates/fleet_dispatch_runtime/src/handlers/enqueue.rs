//! Enqueue handler: validate, create the pending shipment, record the job,
//! hand off to the asynchronous executor.
//!
//! Validation happens before any state exists. When the handoff itself fails
//! the job is recorded as failed and the error surfaces to the caller; the
//! PENDING shipment stub deliberately stays PENDING; the caller owns the
//! decision to retry or fall back to synchronous processing.

use rand::Rng;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use fleet_core::engine::{EngineError, LogisticsEngine, PendingShipment};
use fleet_dispatch_core::contract::{
    normalize_request, request_fingerprint, JobData, JobPayload, ShipmentJobRequest,
    JOB_SCHEMA_VERSION, JOB_TYPE_PROCESS_SHIPMENT,
};

use crate::adapters::invoke::WorkerInvoker;
use crate::adapters::job_store::JobStore;
use crate::convert::to_core_request;

/// The accepted/pending response of the asynchronous creation path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: String,
    pub shipment: PendingShipment,
    pub status: String,
    pub schema_version: String,
}

#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("job {job_id} handoff failed: {message}")]
    Dispatch {
        job_id: String,
        shipment: PendingShipment,
        message: String,
    },
}

pub fn new_job_id() -> String {
    format!(
        "JOB-{:012}",
        rand::thread_rng().gen_range(0..1_000_000_000_000u64)
    )
}

pub fn handle_enqueue(
    request: ShipmentJobRequest,
    engine: &mut LogisticsEngine,
    store: &JobStore,
    invoker: &dyn WorkerInvoker,
) -> Result<JobAccepted, EnqueueError> {
    let normalized = normalize_request(request)
        .map_err(|error| EnqueueError::Validation(error.message().to_string()))?;

    let stub = engine.create_pending_shipment(&to_core_request(&normalized))?;
    let now = engine.now_ms();

    let job_id = new_job_id();
    let payload = JobPayload {
        job_id: job_id.clone(),
        job_type: JOB_TYPE_PROCESS_SHIPMENT.to_string(),
        data: JobData {
            shipment_id: stub.shipment_id.0,
            customer_id: normalized.customer_id.clone(),
            weight: normalized.weight,
            origin: normalized.origin.clone(),
            destination: normalized.destination.clone(),
            urgency: normalized.urgency.clone(),
        },
        schema_version: JOB_SCHEMA_VERSION.to_string(),
    };
    store.insert_queued(payload.clone(), now);

    let bytes = serde_json::to_vec(&payload).expect("job payload should serialize");
    if let Err(message) = invoker.invoke_worker_async(&bytes) {
        let _ = store.fail(&job_id, &message, now);
        log_dispatch_error(
            "job_handoff_failed",
            json!({
                "job_id": job_id,
                "shipment_id": stub.shipment_id,
                "error": message,
            }),
        );
        return Err(EnqueueError::Dispatch {
            job_id,
            shipment: stub,
            message,
        });
    }

    log_dispatch_info(
        "job_queued",
        json!({
            "job_id": job_id,
            "shipment_id": stub.shipment_id,
            "tracking_id": stub.tracking_id,
            "request_fingerprint": request_fingerprint(&normalized),
        }),
    );
    Ok(JobAccepted {
        job_id,
        shipment: stub,
        status: "queued".to_string(),
        schema_version: JOB_SCHEMA_VERSION.to_string(),
    })
}

fn log_dispatch_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "enqueue_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_dispatch_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "enqueue_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
