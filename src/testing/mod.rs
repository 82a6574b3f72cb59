// Test fixtures: an in-memory application state and token helper

use std::sync::Arc;

use crate::auth::Claims;
use crate::config::{AppConfig, RouteStoreKind};
use crate::gateway::{DispatchTable, MemoryRouteStore, RouteRegistry};
use crate::menu::{MemoryMenuRepository, MenuService};
use crate::state::AppState;
use crate::tenant::TenantId;

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.gateway.route_store = RouteStoreKind::Memory;
    config.database.menu_in_postgres = false;
    config.security.jwt_secret = "hix-test-secret".to_string();
    config
}

/// State backed by empty memory stores, registry at version 1
pub async fn memory_state() -> AppState {
    let config = test_config();
    let store = Arc::new(MemoryRouteStore::new());
    let routes = Arc::new(
        RouteRegistry::load(store, config.gateway.refresh_channel_capacity)
            .await
            .expect("empty memory store loads"),
    );
    let dispatch = Arc::new(DispatchTable::new(&routes.snapshot()));
    let menus = MenuService::new(Arc::new(MemoryMenuRepository::new()));
    AppState::new(config, routes, dispatch, menus)
}

/// Bearer token for `tenant` holding role 1 and `permissions`
pub fn token(state: &AppState, tenant: i32, permissions: &[&str]) -> String {
    let claims = Claims::new(
        "admin",
        1,
        TenantId(tenant),
        vec![1],
        permissions.iter().map(|p| p.to_string()).collect(),
        1,
    );
    state.jwt.generate(&claims).expect("test token")
}
