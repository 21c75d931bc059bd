//! In-memory job status storage.
//!
//! Jobs move `queued -> processing -> completed | failed` (a queued job may
//! fail directly when the handoff itself fails). Terminal records receive an
//! `expires_at` stamp and are removed by [JobStore::sweep_expired], a
//! housekeeping policy, not a correctness requirement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use fleet_dispatch_core::contract::{JobPayload, JobRecord, JobStatus, TERMINAL_JOB_TTL_MS};

#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<Mutex<HashMap<String, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, JobRecord>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert_queued(&self, payload: JobPayload, now: u64) -> JobRecord {
        let record = JobRecord {
            job_id: payload.job_id.clone(),
            status: JobStatus::Queued,
            payload,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
            expires_at: None,
        };
        self.lock().insert(record.job_id.clone(), record.clone());
        record
    }

    pub fn mark_processing(&self, job_id: &str, now: u64) -> Result<(), String> {
        let mut jobs = self.lock();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| format!("unknown job {job_id}"))?;
        if record.status != JobStatus::Queued {
            return Err(format!("job {job_id} is not queued"));
        }
        record.status = JobStatus::Processing;
        record.updated_at = now;
        Ok(())
    }

    pub fn complete(&self, job_id: &str, result: Value, now: u64) -> Result<(), String> {
        let mut jobs = self.lock();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| format!("unknown job {job_id}"))?;
        if record.status != JobStatus::Processing {
            return Err(format!("job {job_id} is not processing"));
        }
        record.status = JobStatus::Completed;
        record.result = Some(result);
        record.updated_at = now;
        record.expires_at = Some(now + TERMINAL_JOB_TTL_MS);
        Ok(())
    }

    pub fn fail(&self, job_id: &str, error: &str, now: u64) -> Result<(), String> {
        let mut jobs = self.lock();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| format!("unknown job {job_id}"))?;
        if record.status.is_terminal() {
            return Err(format!("job {job_id} already reached a terminal status"));
        }
        record.status = JobStatus::Failed;
        record.error = Some(error.to_string());
        record.updated_at = now;
        record.expires_at = Some(now + TERMINAL_JOB_TTL_MS);
        Ok(())
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.lock().get(job_id).cloned()
    }

    /// Drop terminal records whose TTL has elapsed; returns how many.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, record| match record.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
