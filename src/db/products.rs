use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Product, SuitConfiguration};
use crate::error::Result;

const COLUMNS: &str =
    "id, tailor_id, title, description, price, currency, is_active, model_id, fabric_id, configuration, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub tailor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub configuration: SuitConfiguration,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
    Ok(sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn insert(pool: &PgPool, product: &NewProduct) -> Result<Product> {
    let sql = format!(
        "INSERT INTO products (id, tailor_id, title, description, price, currency, is_active, model_id, fabric_id, configuration, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, NOW(), NOW()) RETURNING {COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(Uuid::now_v7())
        .bind(product.tailor_id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.currency)
        .bind(&product.configuration.model_id)
        .bind(product.configuration.fabric_id)
        .bind(Json(&product.configuration))
        .fetch_one(pool)
        .await?)
}

/// Changes the live product only. Cart snapshots are never touched.
pub async fn update(pool: &PgPool, id: Uuid, changes: &ProductChanges) -> Result<Option<Product>> {
    let sql = format!(
        "UPDATE products SET \
           title = COALESCE($2, title), \
           description = CASE WHEN $3 THEN $4 ELSE description END, \
           price = COALESCE($5, price), \
           is_active = COALESCE($6, is_active), \
           updated_at = NOW() \
         WHERE id = $1 RETURNING {COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(&changes.title)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.price)
        .bind(changes.is_active)
        .fetch_optional(pool)
        .await?)
}
