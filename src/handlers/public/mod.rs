// handlers/public/mod.rs - unauthenticated endpoints

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::middleware::CurrentTenant;
use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "hix-admin",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant admin API with a dynamic gateway route registry",
            "endpoints": {
                "health": "/health (public)",
                "route": "/route, /route/match (protected)",
                "menu": "/menu, /menu/tree, /menu/tree/:role_id, /menu/:id (protected)",
                "role": "/role/:role_id/menus (protected)",
            }
        }
    }))
}

/// GET /health - registry and dispatch versions for the request tenant
pub async fn health(State(state): State<AppState>, CurrentTenant(tenant): CurrentTenant) -> impl IntoResponse {
    let snapshot = state.routes.snapshot();
    let dispatch_version = state.dispatch.version();

    Json(json!({
        "success": true,
        "data": {
            "status": if dispatch_version == snapshot.version { "ok" } else { "refreshing" },
            "timestamp": chrono::Utc::now(),
            "tenant": tenant,
            "routes": {
                "version": snapshot.version,
                "count": snapshot.len(),
                "dispatch_version": dispatch_version,
            }
        }
    }))
}
