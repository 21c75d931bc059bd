//! Worker handler: processes `process-shipment` jobs against the engine.
//!
//! The worker finalizes the PENDING stub through the same factory and
//! state-machine path the synchronous route uses, so both creation paths end
//! on identical shipment invariants. Job status walks
//! `queued -> processing -> completed | failed`.

use serde::Serialize;
use serde_json::json;

use fleet_core::engine::LogisticsEngine;
use fleet_core::shipment::ShipmentId;
use fleet_dispatch_core::contract::{JobPayload, JobStatus, JOB_TYPE_PROCESS_SHIPMENT};

use crate::adapters::job_store::JobStore;

/// What the worker reports back after handling one payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub shipment_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

pub fn parse_job_payload(bytes: &[u8]) -> Result<JobPayload, String> {
    serde_json::from_slice(bytes).map_err(|error| format!("malformed job payload: {error}"))
}

pub fn handle_job_payload(
    payload: &JobPayload,
    engine: &mut LogisticsEngine,
    store: &JobStore,
) -> Result<WorkerOutcome, String> {
    if payload.job_type != JOB_TYPE_PROCESS_SHIPMENT {
        return Err(format!("unsupported job type '{}'", payload.job_type));
    }

    store.mark_processing(&payload.job_id, engine.now_ms())?;
    log_worker_info(
        "job_started",
        json!({
            "job_id": payload.job_id,
            "shipment_id": payload.data.shipment_id,
        }),
    );

    match engine.process_pending_shipment(ShipmentId(payload.data.shipment_id)) {
        Ok(created) => {
            let result = json!({
                "shipmentId": created.shipment_id,
                "trackingId": created.tracking_id,
                "status": created.status,
                "vehicleId": created.vehicle_id,
                "cost": created.cost,
            });
            store.complete(&payload.job_id, result, engine.now_ms())?;
            log_worker_info(
                "job_completed",
                json!({
                    "job_id": payload.job_id,
                    "shipment_id": payload.data.shipment_id,
                    "cost": created.cost,
                }),
            );
            Ok(WorkerOutcome {
                job_id: payload.job_id.clone(),
                status: JobStatus::Completed,
                shipment_id: payload.data.shipment_id,
                cost: Some(created.cost),
            })
        }
        Err(error) => {
            let message = error.to_string();
            store.fail(&payload.job_id, &message, engine.now_ms())?;
            log_worker_error(
                "job_failed",
                json!({
                    "job_id": payload.job_id,
                    "shipment_id": payload.data.shipment_id,
                    "error": message,
                }),
            );
            Ok(WorkerOutcome {
                job_id: payload.job_id.clone(),
                status: JobStatus::Failed,
                shipment_id: payload.data.shipment_id,
                cost: None,
            })
        }
    }
}

fn log_worker_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "worker_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_worker_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "worker_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
