use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::product::Product;
use crate::utils::errors::AppError;

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self, category: Option<&str>) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = TRUE AND ($1::text IS NULL OR LOWER(category) = LOWER($1))
            ORDER BY name
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn create(&self, new: NewProduct) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, name, sku, category, description, price, stock, image_url, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.sku)
        .bind(&new.category)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(&new.image_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Ya existe un producto con SKU '{}'", new.sku))
            }
            _ => e.into(),
        })
    }
}

/// Bloquear la fila del producto dentro de una transacción
pub async fn lock_product(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>, AppError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

/// Sumar (o restar, con `delta` negativo) unidades al stock
pub async fn adjust_stock(conn: &mut PgConnection, id: Uuid, delta: i32) -> Result<(), AppError> {
    sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await?;

    Ok(())
}
