// Durable storage for route definitions

mod file;
mod memory;
mod postgres;

pub use file::FileRouteStore;
pub use memory::MemoryRouteStore;
pub use postgres::PgRouteStore;

use async_trait::async_trait;
use thiserror::Error;

use super::RouteDefinition;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Where the registry loads its startup set and persists replacements
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn load(&self) -> Result<Vec<RouteDefinition>, StoreError>;

    /// Persist `definitions` as the complete set, replacing what was stored
    async fn save(&self, definitions: &[RouteDefinition]) -> Result<(), StoreError>;
}
