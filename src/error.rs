// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::gateway::RouteError;
use crate::menu::MenuError;
use crate::tenant::TenantError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    MalformedTenantId(String),
    DuplicateRouteId(String),
    InvalidRouteDefinition {
        route_id: String,
        reason: String,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),
    PersistenceFailure(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::MalformedTenantId(_) => 400,
            ApiError::DuplicateRouteId(_) => 400,
            ApiError::InvalidRouteDefinition { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::PersistenceFailure(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::MalformedTenantId(raw) => format!("Tenant id '{}' is not an integer", raw),
            ApiError::DuplicateRouteId(id) => format!("Duplicate routeId '{}'", id),
            ApiError::InvalidRouteDefinition { route_id, reason } => {
                format!("Invalid route definition '{}': {}", route_id, reason)
            }
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::PersistenceFailure(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::MalformedTenantId(_) => "MALFORMED_TENANT_ID",
            ApiError::DuplicateRouteId(_) => "DUPLICATE_ROUTE_ID",
            ApiError::InvalidRouteDefinition { .. } => "INVALID_ROUTE_DEFINITION",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError {
                field_errors: Some(field_errors),
                ..
            } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::DuplicateRouteId(route_id) | ApiError::InvalidRouteDefinition { route_id, .. } => {
                response["route_id"] = json!(route_id);
            }
            _ => {}
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::MalformedTenantId(raw) => ApiError::MalformedTenantId(raw),
            TenantError::NotEstablished => {
                tracing::error!("Handler ran outside a tenant context");
                ApiError::internal_server_error("Tenant context missing")
            }
        }
    }
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::DuplicateRouteId(id) => ApiError::DuplicateRouteId(id),
            RouteError::InvalidRouteDefinition { route_id, reason } => {
                ApiError::InvalidRouteDefinition { route_id, reason }
            }
            RouteError::PersistenceFailure(e) => {
                // Storage details stay in the logs
                tracing::error!("Route persistence error: {}", e);
                ApiError::PersistenceFailure("Failed to persist route definitions".to_string())
            }
            RouteError::NotFound(id) => ApiError::not_found(format!("Route '{}' not found", id)),
            RouteError::NotificationDeliveryFailure(msg) => {
                tracing::warn!("Route notification error surfaced to API: {}", msg);
                ApiError::internal_server_error("Route refresh notification failed")
            }
        }
    }
}

impl From<MenuError> for ApiError {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::NotFound(id) => ApiError::not_found(format!("Menu {} not found", id)),
            MenuError::HasChildren(id) => ApiError::conflict(format!("Menu {} has child menus and cannot be deleted", id)),
            MenuError::AlreadyExists(id) => ApiError::conflict(format!("Menu {} already exists", id)),
            MenuError::Validation { field, message } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field, message);
                ApiError::validation_error("Invalid menu", Some(field_errors))
            }
            MenuError::Tenant(e) => e.into(),
            MenuError::Database(e) => {
                tracing::error!("Menu database error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database not configured")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidSecret => {
                tracing::error!("JWT secret not configured");
                ApiError::internal_server_error("Authentication is not configured")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
