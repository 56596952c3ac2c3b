use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::Fabric;
use crate::error::Result;
use crate::pricing::FabricCatalog;

const COLUMNS: &str = "id, name, description, price_add, is_active, position, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewFabric {
    pub name: String,
    pub description: Option<String>,
    pub price_add: Decimal,
    pub is_active: bool,
    pub position: i32,
}

/// PATCH semantics: `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct FabricChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_add: Option<Decimal>,
    pub is_active: Option<bool>,
    pub position: Option<i32>,
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<Fabric>> {
    let sql = format!("SELECT {COLUMNS} FROM fabrics WHERE is_active ORDER BY position, name");
    Ok(sqlx::query_as::<_, Fabric>(&sql).fetch_all(pool).await?)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Fabric>> {
    let sql = format!("SELECT {COLUMNS} FROM fabrics ORDER BY position, name");
    Ok(sqlx::query_as::<_, Fabric>(&sql).fetch_all(pool).await?)
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Fabric>> {
    let sql = format!("SELECT {COLUMNS} FROM fabrics WHERE id = $1");
    Ok(sqlx::query_as::<_, Fabric>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn insert(pool: &PgPool, fabric: &NewFabric) -> Result<Fabric> {
    let sql = format!(
        "INSERT INTO fabrics (id, name, description, price_add, is_active, position, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) RETURNING {COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Fabric>(&sql)
        .bind(Uuid::now_v7())
        .bind(&fabric.name)
        .bind(&fabric.description)
        .bind(fabric.price_add)
        .bind(fabric.is_active)
        .bind(fabric.position)
        .fetch_one(pool)
        .await?)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: &FabricChanges) -> Result<Option<Fabric>> {
    let sql = format!(
        "UPDATE fabrics SET \
           name = COALESCE($2, name), \
           description = CASE WHEN $3 THEN $4 ELSE description END, \
           price_add = COALESCE($5, price_add), \
           is_active = COALESCE($6, is_active), \
           position = COALESCE($7, position), \
           updated_at = NOW() \
         WHERE id = $1 RETURNING {COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Fabric>(&sql)
        .bind(id)
        .bind(&changes.name)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.price_add)
        .bind(changes.is_active)
        .bind(changes.position)
        .fetch_optional(pool)
        .await?)
}

pub async fn count_products_using(pool: &PgPool, id: Uuid) -> Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE fabric_id = $1").bind(id).fetch_one(pool).await?)
}

/// Returns `false` when no row was deleted.
pub async fn delete(pool: &PgPool, id: Uuid) -> std::result::Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM fabrics WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl FabricCatalog for PgPool {
    async fn fabric(&self, id: Uuid) -> Result<Option<Fabric>> { find(self, id).await }
}
