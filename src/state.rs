use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::gateway::{DispatchTable, RouteRegistry};
use crate::menu::MenuService;

/// Shared handles passed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub routes: Arc<RouteRegistry>,
    pub dispatch: Arc<DispatchTable>,
    pub menus: MenuService,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(config: AppConfig, routes: Arc<RouteRegistry>, dispatch: Arc<DispatchTable>, menus: MenuService) -> Self {
        let jwt = JwtKeys::from_config(&config.security);
        Self {
            config: Arc::new(config),
            routes,
            dispatch,
            menus,
            jwt,
        }
    }
}
