// handlers/protected/route.rs - gateway route administration
//
// GET /route          current definitions (meta.version = registry version)
// PUT /route          replace the whole ordered set
// GET /route/match    preview which route the dispatch table picks

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;

use super::audit;
use crate::error::ApiError;
use crate::gateway::{RequestInfo, RouteDefinition, RouteMatch, RouteRegistryRefreshed};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /route
pub async fn list(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Vec<RouteDefinition>> {
    let snapshot = state.routes.snapshot();
    Ok(ApiResponse::success(snapshot.definitions.clone()).meta("version", snapshot.version))
}

/// PUT /route
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<Vec<RouteDefinition>>, JsonRejection>,
) -> ApiResult<RouteRegistryRefreshed> {
    let Json(definitions) = body.map_err(|rejection| ApiError::InvalidRouteDefinition {
        route_id: String::new(),
        reason: rejection.body_text(),
    })?;

    let count = definitions.len();
    let refreshed = state.routes.replace_all(definitions).await?;

    audit(
        &state,
        &user,
        "route.replace_all",
        &format!("replaced gateway routes: {} definitions, version {}", count, refreshed.version),
    );

    Ok(ApiResponse::success(refreshed))
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub path: String,
    pub method: Option<String>,
    pub host: Option<String>,
}

/// GET /route/match?path=&method=&host=
pub async fn preview(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<MatchQuery>,
) -> ApiResult<RouteMatch> {
    let method = query.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
    let mut request = RequestInfo::new(method, query.path.clone());
    if let Some(host) = query.host {
        request = request.with_host(host);
    }

    state
        .dispatch
        .route(&request)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found(format!("No route matches {}", query.path)))
}
