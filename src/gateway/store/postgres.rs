use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{RouteStore, StoreError};
use crate::gateway::{FilterDefinition, PredicateDefinition, RouteDefinition};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sys_route_conf (
        id          BIGSERIAL PRIMARY KEY,
        route_id    VARCHAR(64) NOT NULL UNIQUE,
        route_name  VARCHAR(128),
        predicates  JSONB NOT NULL,
        filters     JSONB NOT NULL,
        uri         VARCHAR(256) NOT NULL,
        "order"     INTEGER NOT NULL DEFAULT 0,
        position    INTEGER NOT NULL,
        create_time TIMESTAMPTZ NOT NULL DEFAULT now(),
        update_time TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Route definitions in the `sys_route_conf` table
#[derive(Clone)]
pub struct PgRouteStore {
    pool: PgPool,
}

impl PgRouteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RouteStore for PgRouteStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self) -> Result<Vec<RouteDefinition>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT route_id, route_name, predicates, filters, uri, "order"
               FROM sys_route_conf
               ORDER BY position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<RouteDefinition, StoreError> {
                let Json(predicates): Json<Vec<PredicateDefinition>> = row.try_get("predicates")?;
                let Json(filters): Json<Vec<FilterDefinition>> = row.try_get("filters")?;
                Ok(RouteDefinition {
                    route_id: row.try_get("route_id")?,
                    route_name: row.try_get("route_name")?,
                    predicates,
                    filters,
                    uri: row.try_get("uri")?,
                    order: row.try_get("order")?,
                })
            })
            .collect()
    }

    async fn save(&self, definitions: &[RouteDefinition]) -> Result<(), StoreError> {
        // Replace the whole table in one transaction; a failure leaves the old rows
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sys_route_conf").execute(&mut *tx).await?;

        for (position, definition) in definitions.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO sys_route_conf
                       (route_id, route_name, predicates, filters, uri, "order", position)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            )
            .bind(&definition.route_id)
            .bind(&definition.route_name)
            .bind(Json(&definition.predicates))
            .bind(Json(&definition.filters))
            .bind(&definition.uri)
            .bind(definition.order)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Persisted {} route definitions to sys_route_conf", definitions.len());
        Ok(())
    }
}
