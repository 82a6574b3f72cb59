// handlers/protected/mod.rs - endpoints behind jwt_auth_middleware

pub mod menu;
pub mod role;
pub mod route;

use crate::middleware::AuthUser;
use crate::state::AppState;

/// Record an administrative change on the audit target
pub(crate) fn audit(state: &AppState, user: &AuthUser, action: &str, detail: &str) {
    if !state.config.security.enable_audit_logging {
        return;
    }
    tracing::info!(
        target: "hix_admin::audit",
        tenant = %user.tenant_id,
        user = %user.username,
        user_id = user.user_id,
        action,
        "{}",
        detail
    );
}
