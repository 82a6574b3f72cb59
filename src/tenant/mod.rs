// Tenant context propagation
//
// The tenant id for the request being handled is kept in task-local storage
// for async code and in a thread-local slot for blocking work, so handlers and
// repositories can read it without it being threaded through every call.

pub mod context;

pub use context::{clear, current, enter, establish, establish_or, scope, spawn_blocking, TenantGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tenant used when a request carries no tenant header
pub const DEFAULT_TENANT_ID: i32 = 1;

/// Identifier of one logical tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i32);

impl TenantId {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        TenantId(DEFAULT_TENANT_ID)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TenantId {
    fn from(id: i32) -> Self {
        TenantId(id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenantError {
    #[error("Malformed tenant id: '{0}'")]
    MalformedTenantId(String),

    #[error("No tenant context established for the current task")]
    NotEstablished,
}
