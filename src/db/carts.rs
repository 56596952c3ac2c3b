use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::value_objects::{Money, Notes, Quantity};
use crate::error::{MarketplaceError, Result};

const ITEM_COLUMNS: &str =
    "ci.id, ci.cart_id, ci.product_id, ci.product_title, ci.tailor_id, ci.measurement_session_id, ci.price_at_add, ci.currency, ci.quantity, ci.notes, ci.created_at";

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    product_title: String,
    tailor_id: Uuid,
    measurement_session_id: Option<Uuid>,
    price_at_add: Decimal,
    currency: String,
    quantity: i32,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl CartItemRow {
    fn into_domain(self) -> Result<CartItem> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| MarketplaceError::invalid("quantity", format!("stored quantity {} is out of range", self.quantity)))?;
        let notes = match self.notes {
            Some(n) => Notes::parse(n).map_err(|e| MarketplaceError::invalid("notes", e.to_string()))?,
            None => None,
        };
        Ok(CartItem {
            id: self.id,
            cart_id: self.cart_id,
            product_id: self.product_id,
            product_title: self.product_title,
            tailor_id: self.tailor_id,
            measurement_session_id: self.measurement_session_id,
            price_at_add: Money::new(self.price_at_add, &self.currency),
            quantity,
            notes,
            created_at: self.created_at,
        })
    }
}

/// A cart line together with the user owning its cart.
#[derive(Debug, Clone)]
pub struct OwnedCartItem {
    pub item: CartItem,
    pub owner_id: Uuid,
}

async fn load_items(pool: &PgPool, cart_id: Uuid) -> Result<Vec<CartItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_items ci WHERE ci.cart_id = $1 ORDER BY ci.created_at, ci.id");
    sqlx::query_as::<_, CartItemRow>(&sql)
        .bind(cart_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(CartItemRow::into_domain)
        .collect()
}

/// Never fails for a valid user: the insert is a no-op when the cart exists.
pub async fn get_or_create(pool: &PgPool, user_id: Uuid, currency: &str) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (id, user_id, currency, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(currency)
        .execute(pool)
        .await?;
    let row = sqlx::query_as::<_, CartRow>("SELECT id, user_id, currency, created_at, updated_at FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    let items = load_items(pool, row.id).await?;
    Ok(Cart::restore(row.id, row.user_id, &row.currency, items, row.created_at, row.updated_at))
}

pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Cart>> {
    let row = sqlx::query_as::<_, CartRow>("SELECT id, user_id, currency, created_at, updated_at FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let items = load_items(pool, row.id).await?;
            Ok(Some(Cart::restore(row.id, row.user_id, &row.currency, items, row.created_at, row.updated_at)))
        }
        None => Ok(None),
    }
}

pub async fn find_item(pool: &PgPool, item_id: Uuid) -> Result<Option<OwnedCartItem>> {
    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        item: CartItemRow,
        owner_id: Uuid,
    }
    let sql = format!("SELECT {ITEM_COLUMNS}, c.user_id AS owner_id FROM cart_items ci JOIN carts c ON c.id = ci.cart_id WHERE ci.id = $1");
    let row = sqlx::query_as::<_, Row>(&sql).bind(item_id).fetch_optional(pool).await?;
    row.map(|r| Ok(OwnedCartItem { item: r.item.into_domain()?, owner_id: r.owner_id })).transpose()
}

pub async fn find_item_id_by_product(pool: &PgPool, cart_id: Uuid, product_id: Uuid) -> Result<Option<Uuid>> {
    Ok(sqlx::query_scalar::<_, Uuid>("SELECT id FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?)
}

/// Raw sqlx error so the caller can tell a duplicate line from other failures.
pub async fn insert_item(pool: &PgPool, item: &CartItem) -> std::result::Result<(), sqlx::Error> {
    let quantity = i32::try_from(item.quantity.value()).unwrap_or(i32::MAX);
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, product_title, tailor_id, measurement_session_id, price_at_add, currency, quantity, notes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(item.id)
    .bind(item.cart_id)
    .bind(item.product_id)
    .bind(&item.product_title)
    .bind(item.tailor_id)
    .bind(item.measurement_session_id)
    .bind(item.price_at_add.amount())
    .bind(item.price_at_add.currency())
    .bind(quantity)
    .bind(item.notes.as_ref().map(Notes::as_str))
    .bind(item.created_at)
    .execute(pool)
    .await?;
    touch(pool, item.cart_id).await
}

/// Persists the mutable fields. `price_at_add` is never written after insert.
pub async fn update_item(pool: &PgPool, item: &CartItem) -> Result<()> {
    let quantity = i32::try_from(item.quantity.value()).unwrap_or(i32::MAX);
    sqlx::query("UPDATE cart_items SET quantity = $2, notes = $3, measurement_session_id = $4 WHERE id = $1")
        .bind(item.id)
        .bind(quantity)
        .bind(item.notes.as_ref().map(Notes::as_str))
        .bind(item.measurement_session_id)
        .execute(pool)
        .await?;
    Ok(touch(pool, item.cart_id).await?)
}

pub async fn delete_item(pool: &PgPool, cart_id: Uuid, item_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2").bind(item_id).bind(cart_id).execute(pool).await?;
    touch(pool, cart_id).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear(pool: &PgPool, cart_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(pool).await?;
    touch(pool, cart_id).await?;
    Ok(result.rows_affected())
}

async fn touch(pool: &PgPool, cart_id: Uuid) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1").bind(cart_id).execute(pool).await?;
    Ok(())
}
