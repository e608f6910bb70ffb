use sqlx::PgPool;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::dto::order_dto::{CreateOrderRequest, OrderFilters, OrderLineRequest, UpdateOrderStatusRequest};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::order::{Order, OrderResponse, OrderStatus, ShippingAddress, StatusHistoryEntry};
use crate::repositories::order_repository::OrderRepository;
use crate::utils::errors::AppError;

const MAX_LINE_QUANTITY: i32 = 999;

pub fn parse_order_status(value: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::parse(value).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Estado de pedido inválido: '{}'. Valores permitidos: pending, confirmed, processing, shipped, delivered, cancelled",
            value
        ))
    })
}

/// Agrupar líneas por producto, ordenadas por id
fn merge_lines(items: &[OrderLineRequest]) -> Result<Vec<(Uuid, i32)>, AppError> {
    let too_many = |product_id: Uuid| {
        AppError::BadRequest(format!(
            "Máximo {} unidades por producto ({})",
            MAX_LINE_QUANTITY, product_id
        ))
    };

    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "Cantidad inválida para el producto {}",
                item.product_id
            )));
        }
        if item.quantity > MAX_LINE_QUANTITY {
            return Err(too_many(item.product_id));
        }

        let total = merged.entry(item.product_id).or_insert(0);
        *total = total
            .checked_add(item.quantity)
            .filter(|qty| *qty <= MAX_LINE_QUANTITY)
            .ok_or_else(|| too_many(item.product_id))?;
    }

    Ok(merged.into_iter().collect())
}

fn validate_address(address: &ShippingAddress) -> Result<(), AppError> {
    let required = [
        ("full_name", &address.full_name),
        ("street", &address.street),
        ("city", &address.city),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::BadRequest(format!("Dirección de envío incompleta: falta '{}'", field)));
    }
    Ok(())
}

pub struct OrderController {
    repository: OrderRepository,
}

impl OrderController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: OrderRepository::new(pool),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Order, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pedido no encontrado".to_string()))
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        request: CreateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, AppError> {
        let lines = merge_lines(&request.items)?;
        validate_address(&request.shipping_address)?;

        let order = self
            .repository
            .create_with_stock(user.user_id, &lines, request.shipping_address, request.notes)
            .await?;

        info!(
            "📦 Pedido {} creado por {}: {} líneas, total {}",
            order.order_number,
            user.email,
            order.items.len(),
            order.total
        );

        Ok(ApiResponse::success_with_message(order.into(), "Pedido creado"))
    }

    pub async fn list_mine(&self, user: &AuthenticatedUser) -> Result<Vec<OrderResponse>, AppError> {
        let orders = self.repository.list(Some(user.user_id), None).await?;
        Ok(orders.into_iter().map(Into::into).collect())
    }

    pub async fn list_all(
        &self,
        user: &AuthenticatedUser,
        filters: OrderFilters,
    ) -> Result<Vec<OrderResponse>, AppError> {
        user.require_admin()?;
        let status = filters.status.as_deref().map(parse_order_status).transpose()?;
        let orders = self.repository.list(None, status).await?;
        Ok(orders.into_iter().map(Into::into).collect())
    }

    pub async fn get_by_id(&self, user: &AuthenticatedUser, id: Uuid) -> Result<OrderResponse, AppError> {
        let order = self.find(id).await?;
        if !user.is_admin() && order.customer_id != user.user_id {
            return Err(AppError::Forbidden("No tienes permiso para ver este pedido".to_string()));
        }
        Ok(order.into())
    }

    /// El estado se valida antes de leer el pedido: un texto inválido no lo toca
    pub async fn update_status(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<ApiResponse<OrderResponse>, AppError> {
        user.require_admin()?;
        let next = parse_order_status(&request.status)?;

        let current = self.find(id).await?;
        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: current.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let entry = StatusHistoryEntry::new(next, request.note, Some(user.user_id));
        let order = if next == OrderStatus::Cancelled {
            self.repository.cancel_and_restock(&current, entry).await?
        } else {
            self.repository.update_status(id, current.status, entry).await?
        }
        .ok_or_else(|| AppError::Conflict("El pedido cambió mientras se procesaba la solicitud".to_string()))?;

        info!(
            "📦 Pedido {}: {} -> {}",
            order.order_number,
            current.status.as_str(),
            order.status.as_str()
        );

        Ok(ApiResponse::success_with_message(order.into(), "Estado del pedido actualizado"))
    }

    /// El cliente solo cancela mientras el pedido está pendiente
    pub async fn cancel(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<ApiResponse<OrderResponse>, AppError> {
        let current = self.find(id).await?;
        if current.customer_id != user.user_id && !user.is_admin() {
            return Err(AppError::Forbidden("No tienes permiso para cancelar este pedido".to_string()));
        }
        if current.status != OrderStatus::Pending {
            return Err(AppError::BadRequest(format!(
                "Solo se pueden cancelar pedidos pendientes (estado actual: '{}')",
                current.status.as_str()
            )));
        }

        let entry = StatusHistoryEntry::new(
            OrderStatus::Cancelled,
            Some("Cancelado por el cliente".to_string()),
            Some(user.user_id),
        );
        let order = self
            .repository
            .cancel_and_restock(&current, entry)
            .await?
            .ok_or_else(|| AppError::Conflict("El pedido cambió mientras se procesaba la solicitud".to_string()))?;

        info!("🗑️ Pedido {} cancelado por {}", order.order_number, user.email);

        Ok(ApiResponse::success_with_message(order.into(), "Pedido cancelado"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: i32) -> OrderLineRequest {
        OrderLineRequest { product_id, quantity }
    }

    #[test]
    fn test_invalid_status_is_bad_request() {
        assert!(matches!(parse_order_status("teleported"), Err(AppError::BadRequest(_))));
        assert_eq!(parse_order_status("Shipped").unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn test_merge_lines_groups_and_sorts() {
        let a = Uuid::from_u128(2);
        let b = Uuid::from_u128(1);
        let merged = merge_lines(&[line(a, 2), line(b, 1), line(a, 3)]).unwrap();
        assert_eq!(merged, vec![(b, 1), (a, 5)]);
    }

    #[test]
    fn test_merge_lines_rejects_bad_quantities() {
        let id = Uuid::new_v4();
        assert!(merge_lines(&[line(id, 0)]).is_err());
        assert!(merge_lines(&[line(id, 600), line(id, 600)]).is_err());
    }

    #[test]
    fn test_merge_lines_rejects_huge_quantities_without_overflow() {
        let id = Uuid::new_v4();
        let result = merge_lines(&[line(id, 2_147_483_000), line(id, 2_147_483_000)]);
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = merge_lines(&[line(id, 999), line(id, i32::MAX)]);
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        assert_eq!(merge_lines(&[line(id, 500), line(id, 499)]).unwrap(), vec![(id, 999)]);
    }

    #[test]
    fn test_validate_address() {
        let mut address = ShippingAddress {
            full_name: "Ana Costa".into(),
            street: "Muelle 3".into(),
            city: "Palma".into(),
            state: None,
            postal_code: "07001".into(),
            country: "ES".into(),
            phone: None,
        };
        assert!(validate_address(&address).is_ok());
        address.city = "  ".into();
        assert!(validate_address(&address).is_err());
    }
}
