//! Customer directory: the seam toward the excluded persistence layer.
//!
//! The engine resolves customer ids through a trait object so tests can
//! script lookups and inject connection failures. Connection-class failures
//! are retried with bounded linear backoff; every other failure propagates
//! immediately.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use bevy_ecs::prelude::Resource;
use thiserror::Error;

use crate::users::User;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("connection failure: {0}")]
    Connection(String),
    #[error("customer {0} not found")]
    CustomerNotFound(String),
    #[error("storage failure: {0}")]
    Other(String),
}

impl StoreError {
    /// Only connection-class failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

pub trait CustomerDirectory: Send + Sync {
    fn resolve(&self, customer_id: &str) -> Result<User, StoreError>;
}

#[derive(Resource)]
pub struct CustomerDirectoryResource(pub Box<dyn CustomerDirectory>);

/// Directory backed by a fixed user table.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, User>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }
}

impl CustomerDirectory for InMemoryDirectory {
    fn resolve(&self, customer_id: &str) -> Result<User, StoreError> {
        self.users
            .get(customer_id)
            .cloned()
            .ok_or_else(|| StoreError::CustomerNotFound(customer_id.to_string()))
    }
}

/// Bounded retry: `max_attempts` tries total, sleeping `base_delay * attempt`
/// between them.
#[derive(Debug, Clone, Copy, Resource)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(25),
        }
    }
}

pub fn with_retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                thread::sleep(policy.base_delay * attempt);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
