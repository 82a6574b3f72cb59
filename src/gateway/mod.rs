// Dynamic route registry for the API gateway
//
// Route definitions live in an atomically swapped snapshot. Administrators
// replace the whole set at once; the dispatch table listens for refresh
// notifications and recompiles its matchers from the new snapshot.

pub mod definition;
pub mod dispatch;
pub mod pattern;
pub mod registry;
pub mod store;

pub use definition::{validate_all, FilterDefinition, PredicateDefinition, RouteDefinition};
pub use dispatch::{spawn_refresh_listener, DispatchTable, RequestInfo, RouteMatch, RouteTable};
pub use registry::{RouteRegistry, RouteRegistryRefreshed, RouteSnapshot};
pub use store::{FileRouteStore, MemoryRouteStore, PgRouteStore, RouteStore, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Duplicate routeId: {0}")]
    DuplicateRouteId(String),

    #[error("Invalid route definition '{route_id}': {reason}")]
    InvalidRouteDefinition { route_id: String, reason: String },

    #[error("Failed to persist route definitions: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("Route not found: {0}")]
    NotFound(String),

    #[error("Route refresh notification not delivered: {0}")]
    NotificationDeliveryFailure(String),
}
