use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::{Menu, MenuError, MenuType};
use crate::tenant::TenantId;

/// Tenant-scoped menu storage. Every call names the tenant explicitly.
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn list(&self, tenant: TenantId) -> Result<Vec<Menu>, MenuError>;

    async fn get(&self, tenant: TenantId, menu_id: i32) -> Result<Option<Menu>, MenuError>;

    /// Insert `menu`; a `menu_id` of 0 gets a generated id
    async fn insert(&self, tenant: TenantId, menu: Menu) -> Result<Menu, MenuError>;

    async fn update(&self, tenant: TenantId, menu: Menu) -> Result<Menu, MenuError>;

    /// Remove the menu and its role associations
    async fn remove(&self, tenant: TenantId, menu_id: i32) -> Result<(), MenuError>;

    async fn find_by_role(&self, tenant: TenantId, role_id: i32) -> Result<Vec<Menu>, MenuError>;

    /// Replace the menu set granted to `role_id`
    async fn assign_role_menus(&self, tenant: TenantId, role_id: i32, menu_ids: &[i32]) -> Result<(), MenuError>;
}

fn by_sort(menus: &mut [Menu]) {
    menus.sort_by_key(|m| (m.sort, m.menu_id));
}

#[derive(Default)]
struct MemoryState {
    menus: BTreeMap<(TenantId, i32), Menu>,
    role_menus: HashMap<(TenantId, i32), BTreeSet<i32>>,
    next_id: i32,
}

/// In-process menu storage for development and tests
#[derive(Default)]
pub struct MemoryMenuRepository {
    state: RwLock<MemoryState>,
}

impl MemoryMenuRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MenuRepository for MemoryMenuRepository {
    async fn list(&self, tenant: TenantId) -> Result<Vec<Menu>, MenuError> {
        let state = self.state.read().await;
        let mut menus: Vec<Menu> = state
            .menus
            .iter()
            .filter(|((t, _), _)| *t == tenant)
            .map(|(_, m)| m.clone())
            .collect();
        by_sort(&mut menus);
        Ok(menus)
    }

    async fn get(&self, tenant: TenantId, menu_id: i32) -> Result<Option<Menu>, MenuError> {
        Ok(self.state.read().await.menus.get(&(tenant, menu_id)).cloned())
    }

    async fn insert(&self, tenant: TenantId, mut menu: Menu) -> Result<Menu, MenuError> {
        let mut state = self.state.write().await;
        if menu.menu_id == 0 {
            let max_id = state.menus.keys().map(|(_, id)| *id).max().unwrap_or(0);
            state.next_id = state.next_id.max(max_id) + 1;
            menu.menu_id = state.next_id;
        } else if state.menus.contains_key(&(tenant, menu.menu_id)) {
            return Err(MenuError::AlreadyExists(menu.menu_id));
        }
        menu.tenant_id = tenant;
        menu.create_time = Some(Utc::now());
        menu.update_time = None;
        state.menus.insert((tenant, menu.menu_id), menu.clone());
        Ok(menu)
    }

    async fn update(&self, tenant: TenantId, mut menu: Menu) -> Result<Menu, MenuError> {
        let mut state = self.state.write().await;
        let existing = state
            .menus
            .get_mut(&(tenant, menu.menu_id))
            .ok_or(MenuError::NotFound(menu.menu_id))?;
        menu.tenant_id = tenant;
        menu.create_time = existing.create_time;
        menu.update_time = Some(Utc::now());
        *existing = menu.clone();
        Ok(menu)
    }

    async fn remove(&self, tenant: TenantId, menu_id: i32) -> Result<(), MenuError> {
        let mut state = self.state.write().await;
        state.menus.remove(&(tenant, menu_id)).ok_or(MenuError::NotFound(menu_id))?;
        for ((t, _), ids) in state.role_menus.iter_mut() {
            if *t == tenant {
                ids.remove(&menu_id);
            }
        }
        Ok(())
    }

    async fn find_by_role(&self, tenant: TenantId, role_id: i32) -> Result<Vec<Menu>, MenuError> {
        let state = self.state.read().await;
        let Some(ids) = state.role_menus.get(&(tenant, role_id)) else {
            return Ok(Vec::new());
        };
        let mut menus: Vec<Menu> = ids
            .iter()
            .filter_map(|id| state.menus.get(&(tenant, *id)).cloned())
            .collect();
        by_sort(&mut menus);
        Ok(menus)
    }

    async fn assign_role_menus(&self, tenant: TenantId, role_id: i32, menu_ids: &[i32]) -> Result<(), MenuError> {
        let mut state = self.state.write().await;
        if let Some(missing) = menu_ids.iter().find(|id| !state.menus.contains_key(&(tenant, **id))) {
            return Err(MenuError::NotFound(*missing));
        }
        state
            .role_menus
            .insert((tenant, role_id), menu_ids.iter().copied().collect());
        Ok(())
    }
}

const CREATE_MENU_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sys_menu (
        menu_id     SERIAL,
        name        VARCHAR(64) NOT NULL,
        permission  VARCHAR(64),
        path        VARCHAR(128),
        parent_id   INTEGER NOT NULL DEFAULT -1,
        icon        VARCHAR(64),
        sort        INTEGER NOT NULL DEFAULT 0,
        keep_alive  BOOLEAN NOT NULL DEFAULT FALSE,
        type        CHAR(1) NOT NULL DEFAULT '0',
        tenant_id   INTEGER NOT NULL,
        create_time TIMESTAMPTZ NOT NULL DEFAULT now(),
        update_time TIMESTAMPTZ,
        PRIMARY KEY (tenant_id, menu_id)
    )
"#;

const CREATE_ROLE_MENU_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sys_role_menu (
        role_id   INTEGER NOT NULL,
        menu_id   INTEGER NOT NULL,
        tenant_id INTEGER NOT NULL,
        PRIMARY KEY (tenant_id, role_id, menu_id)
    )
"#;

const MENU_COLUMNS: &str = "m.menu_id, m.name, m.permission, m.path, m.parent_id, m.icon, m.sort, \
     m.keep_alive, m.type AS menu_type, m.tenant_id, m.create_time, m.update_time";

#[derive(sqlx::FromRow)]
struct MenuRow {
    menu_id: i32,
    name: String,
    permission: Option<String>,
    path: Option<String>,
    parent_id: i32,
    icon: Option<String>,
    sort: i32,
    keep_alive: bool,
    menu_type: String,
    tenant_id: i32,
    create_time: Option<DateTime<Utc>>,
    update_time: Option<DateTime<Utc>>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            menu_id: row.menu_id,
            name: row.name,
            permission: row.permission,
            path: row.path,
            parent_id: row.parent_id,
            icon: row.icon,
            sort: row.sort,
            keep_alive: row.keep_alive,
            menu_type: MenuType::from_code(&row.menu_type).unwrap_or_default(),
            tenant_id: TenantId(row.tenant_id),
            create_time: row.create_time,
            update_time: row.update_time,
        }
    }
}

/// Menus in `sys_menu` / `sys_role_menu`, filtered by `tenant_id`
#[derive(Clone)]
pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), MenuError> {
        sqlx::query(CREATE_MENU_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_ROLE_MENU_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    async fn list(&self, tenant: TenantId) -> Result<Vec<Menu>, MenuError> {
        let sql = format!(
            "SELECT {} FROM sys_menu m WHERE m.tenant_id = $1 ORDER BY m.sort, m.menu_id",
            MENU_COLUMNS
        );
        let rows: Vec<MenuRow> = sqlx::query_as(&sql).bind(tenant.get()).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Menu::from).collect())
    }

    async fn get(&self, tenant: TenantId, menu_id: i32) -> Result<Option<Menu>, MenuError> {
        let sql = format!(
            "SELECT {} FROM sys_menu m WHERE m.tenant_id = $1 AND m.menu_id = $2",
            MENU_COLUMNS
        );
        let row: Option<MenuRow> = sqlx::query_as(&sql)
            .bind(tenant.get())
            .bind(menu_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Menu::from))
    }

    async fn insert(&self, tenant: TenantId, menu: Menu) -> Result<Menu, MenuError> {
        if menu.menu_id != 0 && self.get(tenant, menu.menu_id).await?.is_some() {
            return Err(MenuError::AlreadyExists(menu.menu_id));
        }

        // menu_id = 0 falls back to the serial default
        let sql = format!(
            r#"INSERT INTO sys_menu AS m
                   (menu_id, name, permission, path, parent_id, icon, sort, keep_alive, type, tenant_id)
               VALUES (COALESCE(NULLIF($1, 0), nextval(pg_get_serial_sequence('sys_menu', 'menu_id'))),
                       $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING {}"#,
            MENU_COLUMNS
        );
        let row: MenuRow = sqlx::query_as(&sql)
            .bind(menu.menu_id)
            .bind(&menu.name)
            .bind(&menu.permission)
            .bind(&menu.path)
            .bind(menu.parent_id)
            .bind(&menu.icon)
            .bind(menu.sort)
            .bind(menu.keep_alive)
            .bind(menu.menu_type.as_code())
            .bind(tenant.get())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update(&self, tenant: TenantId, menu: Menu) -> Result<Menu, MenuError> {
        let sql = format!(
            r#"UPDATE sys_menu AS m
               SET name = $3, permission = $4, path = $5, parent_id = $6, icon = $7,
                   sort = $8, keep_alive = $9, type = $10, update_time = now()
               WHERE m.tenant_id = $1 AND m.menu_id = $2
               RETURNING {}"#,
            MENU_COLUMNS
        );
        let row: Option<MenuRow> = sqlx::query_as(&sql)
            .bind(tenant.get())
            .bind(menu.menu_id)
            .bind(&menu.name)
            .bind(&menu.permission)
            .bind(&menu.path)
            .bind(menu.parent_id)
            .bind(&menu.icon)
            .bind(menu.sort)
            .bind(menu.keep_alive)
            .bind(menu.menu_type.as_code())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Menu::from).ok_or(MenuError::NotFound(menu.menu_id))
    }

    async fn remove(&self, tenant: TenantId, menu_id: i32) -> Result<(), MenuError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM sys_menu WHERE tenant_id = $1 AND menu_id = $2")
            .bind(tenant.get())
            .bind(menu_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(MenuError::NotFound(menu_id));
        }

        sqlx::query("DELETE FROM sys_role_menu WHERE tenant_id = $1 AND menu_id = $2")
            .bind(tenant.get())
            .bind(menu_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_role(&self, tenant: TenantId, role_id: i32) -> Result<Vec<Menu>, MenuError> {
        let sql = format!(
            r#"SELECT {} FROM sys_menu m
               JOIN sys_role_menu rm ON rm.menu_id = m.menu_id AND rm.tenant_id = m.tenant_id
               WHERE m.tenant_id = $1 AND rm.role_id = $2
               ORDER BY m.sort, m.menu_id"#,
            MENU_COLUMNS
        );
        let rows: Vec<MenuRow> = sqlx::query_as(&sql)
            .bind(tenant.get())
            .bind(role_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Menu::from).collect())
    }

    async fn assign_role_menus(&self, tenant: TenantId, role_id: i32, menu_ids: &[i32]) -> Result<(), MenuError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sys_role_menu WHERE tenant_id = $1 AND role_id = $2")
            .bind(tenant.get())
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for menu_id in menu_ids {
            let exists: Option<i32> =
                sqlx::query_scalar("SELECT menu_id FROM sys_menu WHERE tenant_id = $1 AND menu_id = $2")
                    .bind(tenant.get())
                    .bind(menu_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(MenuError::NotFound(*menu_id));
            }

            sqlx::query(
                "INSERT INTO sys_role_menu (role_id, menu_id, tenant_id) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(role_id)
            .bind(menu_id)
            .bind(tenant.get())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
