use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::order::{
    order_subtotal, shipping_cost_for, Order, OrderItem, OrderStatus, ShippingAddress,
    StatusHistoryEntry,
};
use crate::repositories::product_repository::{adjust_stock, lock_product};
use crate::utils::errors::AppError;
use crate::utils::reference::{generate_reference, ORDER_PREFIX};

pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crear el pedido descontando stock en la misma transacción.
    /// `lines` llega agrupado por producto y ordenado por id,
    /// así los bloqueos de filas siempre se toman en el mismo orden.
    pub async fn create_with_stock(
        &self,
        customer_id: Uuid,
        lines: &[(Uuid, i32)],
        shipping_address: ShippingAddress,
        note: Option<String>,
    ) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut items = Vec::with_capacity(lines.len());

        for &(product_id, quantity) in lines {
            let product = lock_product(&mut *tx, product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", product_id)))?;

            if product.stock < quantity {
                return Err(AppError::BadRequest(format!(
                    "Stock insuficiente para '{}': disponibles {}, solicitados {}",
                    product.name, product.stock, quantity
                )));
            }

            adjust_stock(&mut *tx, product.id, -quantity).await?;

            items.push(OrderItem {
                product_id: product.id,
                line_total: product.price * Decimal::from(quantity),
                name: product.name,
                sku: product.sku,
                image_url: product.image_url,
                unit_price: product.price,
                quantity,
            });
        }

        let subtotal = order_subtotal(&items);
        let shipping_cost = shipping_cost_for(subtotal);
        let history = vec![StatusHistoryEntry::new(OrderStatus::Pending, note, Some(customer_id))];
        let now = Utc::now();

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, items, subtotal, shipping_cost, total,
                shipping_address, status, payment_status, status_history, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 'pending', $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(generate_reference(ORDER_PREFIX))
        .bind(customer_id)
        .bind(Json(&items))
        .bind(subtotal)
        .bind(shipping_cost)
        .bind(subtotal + shipping_cost)
        .bind(Json(&shipping_address))
        .bind(Json(&history))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    pub async fn list(
        &self,
        customer_id: Option<Uuid>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Cambiar el estado y añadir la entrada al historial.
    /// `None` si el pedido ya no está en `from`.
    pub async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        entry: StatusHistoryEntry,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $3,
                status_history = status_history || $4,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(entry.status)
        .bind(Json(vec![&entry]))
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Cancelar el pedido y devolver sus unidades al stock
    pub async fn cancel_and_restock(
        &self,
        order: &Order,
        entry: StatusHistoryEntry,
    ) -> Result<Option<Order>, AppError> {
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = 'cancelled',
                status_history = status_history || $3,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(order.status)
        .bind(Json(vec![&entry]))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(cancelled) = cancelled else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut lines: Vec<(Uuid, i32)> = cancelled
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        lines.sort_by_key(|(id, _)| *id);

        for (product_id, quantity) in lines {
            adjust_stock(&mut *tx, product_id, quantity).await?;
        }

        tx.commit().await?;

        info!("📦 Stock restaurado para el pedido {}", cancelled.order_number);

        Ok(Some(cancelled))
    }
}
