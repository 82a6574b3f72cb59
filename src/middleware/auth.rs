use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::{self, TenantId};

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
    pub user_id: i64,
    pub tenant_id: TenantId,
    pub roles: Vec<i32>,
    pub permissions: Vec<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            user_id: claims.user_id,
            tenant_id: claims.tenant_id,
            roles: claims.roles,
            permissions: claims.permissions,
        }
    }
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Fail with 403 unless the user holds `permission`
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("Missing permission '{}'", permission)))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
///
/// Must run inside the tenant context: a token issued for a different tenant
/// than the one the request carries is refused.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let reject = |api_error: ApiError| {
        (
            StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
            Json(api_error.to_json()),
        )
    };

    // Extract JWT from Authorization header
    let token = extract_jwt_from_headers(&headers).map_err(|msg| reject(ApiError::unauthorized(msg)))?;

    // Validate and decode JWT
    let claims = state.jwt.validate(&token).map_err(|e| reject(e.into()))?;

    let request_tenant = tenant::current().map_err(|e| reject(e.into()))?;
    if claims.tenant_id != request_tenant {
        tracing::warn!(
            user = %claims.sub,
            token_tenant = %claims.tenant_id,
            request_tenant = %request_tenant,
            "Token tenant does not match request tenant"
        );
        return Err(reject(ApiError::forbidden("Token was not issued for this tenant")));
    }

    // Convert claims to AuthUser and inject into request
    let auth_user = AuthUser::from(claims);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
