use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, tenant_context_middleware};
use crate::state::AppState;

/// Assemble the HTTP surface.
///
/// The tenant context layer wraps everything else, so body limits, tracing,
/// CORS, authentication and handlers all run with the tenant established.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .merge(route_routes(&state))
        .merge(menu_routes(&state))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router
        .layer(from_fn_with_state(state.clone(), tenant_context_middleware))
        .with_state(state)
}

fn route_routes(state: &AppState) -> Router<AppState> {
    use protected::route;

    Router::new()
        .route("/route", get(route::list).put(route::update))
        .route("/route/match", get(route::preview))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn menu_routes(state: &AppState) -> Router<AppState> {
    use protected::{menu, role};

    Router::new()
        .route("/menu", get(menu::user_menu).post(menu::create).put(menu::update))
        .route("/menu/tree", get(menu::tree))
        .route("/menu/tree/:role_id", get(menu::role_tree))
        .route("/menu/:id", get(menu::get).delete(menu::delete))
        .route("/role/:role_id/menus", put(role::assign_menus))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(origins)
}
