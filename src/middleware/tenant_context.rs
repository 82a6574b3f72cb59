use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::{self, TenantId};

/// Establishes the tenant for the whole request.
///
/// Reads the configured tenant header, falls back to the default tenant when
/// it is absent, and rejects malformed values. Everything downstream (other
/// middleware, handlers, repositories) runs inside the tenant scope, which is
/// released when the response future completes or is dropped.
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let tenant_config = &state.config.tenant;

    let raw = request
        .headers()
        .get(tenant_config.header_name.as_str())
        .map(|value| value.to_str().map_err(|_| String::from_utf8_lossy(value.as_bytes()).into_owned()));

    let tenant = match raw {
        Some(Err(raw)) => Err(tenant::TenantError::MalformedTenantId(raw)),
        Some(Ok(value)) => tenant::establish_or(Some(value), TenantId(tenant_config.default_tenant_id)),
        None => tenant::establish_or(None, TenantId(tenant_config.default_tenant_id)),
    }
    .map_err(|e| {
        tracing::debug!("Rejecting request with bad tenant header: {}", e);
        let api_error: ApiError = e.into();
        (
            StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::BAD_REQUEST),
            Json(api_error.to_json()),
        )
    })?;

    tracing::debug!(tenant = %tenant, path = %request.uri().path(), "Tenant context established");
    request.extensions_mut().insert(tenant);

    Ok(tenant::scope(tenant, next.run(request)).await)
}

/// Tenant established for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentTenant(pub TenantId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(tenant) = parts.extensions.get::<TenantId>() {
            return Ok(CurrentTenant(*tenant));
        }
        Ok(CurrentTenant(tenant::current()?))
    }
}
