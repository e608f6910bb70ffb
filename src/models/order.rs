//! Modelo de Order
//!
//! Pedidos de la tienda de repuestos. Cada línea guarda una copia del
//! producto en el momento de la compra y el pedido mantiene un historial
//! de cambios de estado. `status` y `payment_status` evolucionan por
//! separado.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use uuid::Uuid;

/// Estado logístico del pedido - mapea al ENUM order_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

/// Estado de cobro del pedido - mapea al ENUM order_payment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "order_payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Línea del pedido con copia del producto
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Dirección de envío
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Entrada del historial de estados
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn new(status: OrderStatus, note: Option<String>, changed_by: Option<Uuid>) -> Self {
        Self {
            status,
            note,
            changed_by,
            changed_at: Utc::now(),
        }
    }
}

/// Order - mapea exactamente a la tabla orders
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub items: Json<Vec<OrderItem>>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub shipping_address: Json<ShippingAddress>,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub status_history: Json<Vec<StatusHistoryEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response de pedido para la API
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            customer_id: o.customer_id,
            items: o.items.0,
            subtotal: o.subtotal,
            shipping_cost: o.shipping_cost,
            total: o.total,
            shipping_address: o.shipping_address.0,
            status: o.status,
            payment_status: o.payment_status,
            status_history: o.status_history.0,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// Sumar las líneas de un pedido
pub fn order_subtotal(items: &[OrderItem]) -> Decimal {
    items.iter().map(|item| item.line_total).sum()
}

/// Envío gratis a partir de 100, tarifa plana de 15 por debajo
pub fn shipping_cost_for(subtotal: Decimal) -> Decimal {
    if subtotal >= Decimal::new(100, 0) {
        Decimal::ZERO
    } else {
        Decimal::new(15, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        assert_eq!(OrderStatus::parse("SHIPPED"), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse("lost-at-sea"), None);
    }

    #[test]
    fn test_order_subtotal() {
        let item = |price: i64, qty: i32| OrderItem {
            product_id: Uuid::new_v4(),
            name: "Impeller".into(),
            sku: "IMP-1".into(),
            image_url: None,
            unit_price: Decimal::new(price, 2),
            quantity: qty,
            line_total: Decimal::new(price, 2) * Decimal::from(qty),
        };
        let items = vec![item(2550, 2), item(999, 1)];
        assert_eq!(order_subtotal(&items), Decimal::new(6099, 2));
    }

    #[test]
    fn test_shipping_cost_threshold() {
        assert_eq!(shipping_cost_for(Decimal::new(9999, 2)), Decimal::new(15, 0));
        assert_eq!(shipping_cost_for(Decimal::new(100, 0)), Decimal::ZERO);
    }
}
