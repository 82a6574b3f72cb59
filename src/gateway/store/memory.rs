use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{RouteStore, StoreError};
use crate::gateway::RouteDefinition;

/// In-process store; contents are lost on restart
#[derive(Debug, Default)]
pub struct MemoryRouteStore {
    definitions: Mutex<Vec<RouteDefinition>>,
    fail_writes: AtomicBool,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: Vec<RouteDefinition>) -> Self {
        Self {
            definitions: Mutex::new(definitions),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail, to exercise persistence-failure paths
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Vec<RouteDefinition> {
        self.definitions.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Vec<RouteDefinition>, StoreError> {
        self.definitions
            .lock()
            .map(|d| d.clone())
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    async fn save(&self, definitions: &[RouteDefinition]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejected the write".to_string()));
        }
        let mut stored = self
            .definitions
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        *stored = definitions.to_vec();
        Ok(())
    }
}
