//! Wire contract for asynchronous shipment processing.
//!
//! This crate is dependency-light on purpose: any execution environment that
//! can speak JSON can embed it. Requests are normalized and validated here,
//! before any state exists anywhere; the fingerprint gives dispatchers a
//! stable idempotency key for a normalized request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const JOB_SCHEMA_VERSION: &str = "v1";
pub const JOB_TYPE_PROCESS_SHIPMENT: &str = "process-shipment";
/// Terminal job records are kept for housekeeping this long.
pub const TERMINAL_JOB_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// A geographic point as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl WireLocation {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            address: None,
            city: None,
            country: None,
        }
    }
}

fn default_urgency() -> String {
    "standard".to_string()
}

/// An incoming creation request, exactly as the interface accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentJobRequest {
    pub customer_id: String,
    pub weight: f64,
    pub origin: WireLocation,
    pub destination: WireLocation,
    #[serde(default = "default_urgency")]
    pub urgency: String,
}

/// A request that passed validation; urgency is lowercased and known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedJobRequest {
    pub customer_id: String,
    pub weight: f64,
    pub origin: WireLocation,
    pub destination: WireLocation,
    pub urgency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

fn coordinates_are_valid(location: &WireLocation) -> bool {
    location.lat.is_finite()
        && location.lng.is_finite()
        && (-90.0..=90.0).contains(&location.lat)
        && (-180.0..=180.0).contains(&location.lng)
}

/// Reject malformed requests before anything is recorded.
pub fn normalize_request(
    request: ShipmentJobRequest,
) -> Result<NormalizedJobRequest, ValidationError> {
    let customer_id = request.customer_id.trim().to_string();
    if customer_id.is_empty() {
        return Err(ValidationError::new("customer_id cannot be empty"));
    }

    if !(request.weight.is_finite() && request.weight > 0.0) {
        return Err(ValidationError::new("weight must be a positive number"));
    }

    if !coordinates_are_valid(&request.origin) {
        return Err(ValidationError::new(
            "origin must carry finite in-range coordinates",
        ));
    }
    if !coordinates_are_valid(&request.destination) {
        return Err(ValidationError::new(
            "destination must carry finite in-range coordinates",
        ));
    }
    if request.origin.lat == request.destination.lat
        && request.origin.lng == request.destination.lng
    {
        return Err(ValidationError::new(
            "origin and destination cannot be the same point",
        ));
    }

    let urgency = request.urgency.trim().to_lowercase();
    if urgency != "standard" && urgency != "high" {
        return Err(ValidationError::new(format!(
            "urgency must be 'standard' or 'high', got '{urgency}'"
        )));
    }

    Ok(NormalizedJobRequest {
        customer_id,
        weight: request.weight,
        origin: request.origin,
        destination: request.destination,
        urgency,
    })
}

/// The payload handed to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub data: JobData,
    pub schema_version: String,
}

/// Everything the worker needs to finalize a pending shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    pub shipment_id: u64,
    pub customer_id: String,
    pub weight: f64,
    pub origin: WireLocation,
    pub destination: WireLocation,
    pub urgency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One job's stored state. `expires_at` is stamped when the job reaches a
/// terminal status; expiry is housekeeping, not correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub payload: JobPayload,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// Stable idempotency key over a normalized request.
pub fn request_fingerprint(request: &NormalizedJobRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(request));
    format!("{:x}", hasher.finalize())
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}
