use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::order::ShippingAddress;

// Cantidad comprobada en el controller (1..=999 tras agrupar por producto)
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

// Request para crear un pedido
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub items: Vec<OrderLineRequest>,

    pub shipping_address: ShippingAddress,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

// Cambio de estado (admin). El texto se valida contra los estados conocidos.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    pub status: String,

    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilters {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: Vec<OrderLineRequest>) -> CreateOrderRequest {
        CreateOrderRequest {
            items,
            shipping_address: ShippingAddress {
                full_name: "Marta Ribas".to_string(),
                street: "Moll de la Fusta 1".to_string(),
                city: "Barcelona".to_string(),
                state: None,
                postal_code: "08002".to_string(),
                country: "ES".to_string(),
                phone: None,
            },
            notes: None,
        }
    }

    #[test]
    fn test_order_needs_at_least_one_line() {
        assert!(request(vec![]).validate().is_err());

        let line = OrderLineRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        };
        assert!(request(vec![line]).validate().is_ok());
    }
}
