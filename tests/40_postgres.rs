// Postgres-backed stores. These run only when DATABASE_URL points at a
// disposable database; sys_route_conf is rewritten by the route test.

use anyhow::Result;

use hix_admin::config::AppConfig;
use hix_admin::database::DatabaseManager;
use hix_admin::gateway::{PgRouteStore, PredicateDefinition, RouteDefinition, RouteStore};
use hix_admin::menu::{Menu, MenuError, MenuRepository, PgMenuRepository};
use hix_admin::tenant::TenantId;

async fn connect() -> Result<Option<DatabaseManager>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return Ok(None);
    };
    let manager = DatabaseManager::connect_url(&url, &AppConfig::development().database).await?;
    Ok(Some(manager))
}

fn route(id: &str, order: i32) -> RouteDefinition {
    RouteDefinition::new(id, format!("http://{}:8080", id))
        .with_order(order)
        .with_predicate(PredicateDefinition::parse_shortcut(&format!("Path=/{}/**", id)))
}

#[tokio::test]
async fn route_store_keeps_list_position() -> Result<()> {
    let Some(db) = connect().await? else {
        return Ok(());
    };
    let store = PgRouteStore::new(db.pool().clone());
    store.ensure_schema().await?;

    // Neither routeId nor order agrees with list position
    let first = vec![route("zeta", 5), route("alpha", 1), route("mid", 3)];
    store.save(&first).await?;
    assert_eq!(store.load().await?, first);

    let second = vec![route("mid", 0), route("zeta", 9)];
    store.save(&second).await?;
    assert_eq!(store.load().await?, second);

    store.save(&[]).await?;
    assert!(store.load().await?.is_empty());

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn menu_repository_is_tenant_scoped() -> Result<()> {
    let Some(db) = connect().await? else {
        return Ok(());
    };
    let repo = PgMenuRepository::new(db.pool().clone());
    repo.ensure_schema().await?;

    let tenant = TenantId(100_000 + (std::process::id() % 1_000_000) as i32);
    let other = TenantId(tenant.get() + 1);

    let system = repo.insert(tenant, Menu::new(0, "System", -1).with_sort(2)).await?;
    let users = repo
        .insert(tenant, Menu::new(0, "Users", system.menu_id).with_sort(1))
        .await?;
    assert_ne!(system.menu_id, users.menu_id);
    assert_eq!(users.tenant_id, tenant);

    let names: Vec<String> = repo.list(tenant).await?.into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["Users", "System"]);
    assert!(repo.get(other, system.menu_id).await?.is_none());

    let renamed = repo.update(tenant, Menu::new(users.menu_id, "Accounts", system.menu_id)).await?;
    assert_eq!(renamed.name, "Accounts");
    assert!(renamed.update_time.is_some());

    repo.assign_role_menus(tenant, 1, &[system.menu_id, users.menu_id]).await?;
    assert_eq!(repo.find_by_role(tenant, 1).await?.len(), 2);
    assert!(repo.find_by_role(other, 1).await?.is_empty());

    repo.remove(tenant, users.menu_id).await?;
    let granted: Vec<i32> = repo.find_by_role(tenant, 1).await?.into_iter().map(|m| m.menu_id).collect();
    assert_eq!(granted, vec![system.menu_id]);
    assert!(matches!(repo.remove(tenant, users.menu_id).await, Err(MenuError::NotFound(_))));

    repo.remove(tenant, system.menu_id).await?;
    assert!(repo.list(tenant).await?.is_empty());

    db.close().await;
    Ok(())
}
