use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hix_admin::config::{self, AppConfig, RouteStoreKind};
use hix_admin::database::DatabaseManager;
use hix_admin::gateway::{
    spawn_refresh_listener, DispatchTable, FileRouteStore, MemoryRouteStore, PgRouteStore, RouteRegistry, RouteStore,
};
use hix_admin::menu::{MemoryMenuRepository, MenuRepository, MenuService, PgMenuRepository};
use hix_admin::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hix_admin=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    info!("Starting hix-admin in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set outside development");
    }

    let needs_database = config.gateway.route_store == RouteStoreKind::Postgres || config.database.menu_in_postgres;
    let database = if needs_database {
        Some(
            DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to the admin database")?,
        )
    } else {
        None
    };

    // Routes must be loaded before the listener accepts any traffic
    let store = route_store(&config, database.as_ref()).await?;
    let routes = Arc::new(
        RouteRegistry::load(store, config.gateway.refresh_channel_capacity)
            .await
            .context("failed to load gateway routes")?,
    );
    let dispatch = Arc::new(DispatchTable::new(&routes.snapshot()));

    let reconcile_every =
        (config.gateway.reconcile_interval_secs > 0).then(|| Duration::from_secs(config.gateway.reconcile_interval_secs));
    let refresh_listener = spawn_refresh_listener(routes.clone(), dispatch.clone(), reconcile_every);

    let menus = MenuService::new(menu_repository(&config, database.as_ref()).await?);
    let state = AppState::new(config.clone(), routes, dispatch, menus);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("hix-admin listening on http://{}", bind_addr);

    axum::serve(listener, hix_admin::app::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    refresh_listener.abort();
    if let Some(database) = database {
        database.close().await;
    }
    Ok(())
}

async fn route_store(config: &AppConfig, database: Option<&DatabaseManager>) -> anyhow::Result<Arc<dyn RouteStore>> {
    let store: Arc<dyn RouteStore> = match config.gateway.route_store {
        RouteStoreKind::Memory => {
            if hix_admin::is_production!() {
                warn!("Memory route store in production: route changes are lost on restart");
            }
            Arc::new(MemoryRouteStore::new())
        }
        RouteStoreKind::File => Arc::new(FileRouteStore::new(&config.gateway.route_file)),
        RouteStoreKind::Postgres => {
            let database = database.context("postgres route store needs a database connection")?;
            let store = PgRouteStore::new(database.pool().clone());
            store.ensure_schema().await.context("failed to prepare sys_route_conf")?;
            Arc::new(store)
        }
    };
    Ok(store)
}

async fn menu_repository(
    config: &AppConfig,
    database: Option<&DatabaseManager>,
) -> anyhow::Result<Arc<dyn MenuRepository>> {
    match database {
        Some(database) if config.database.menu_in_postgres => {
            let repo = PgMenuRepository::new(database.pool().clone());
            repo.ensure_schema().await.context("failed to prepare sys_menu")?;
            Ok(Arc::new(repo))
        }
        _ => Ok(Arc::new(MemoryMenuRepository::new())),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
