//! Modelo de Payment
//!
//! Un registro por PaymentIntent de Stripe. El estado local refleja el
//! ciclo de vida del intent y solo cambia cuando Stripe lo confirma
//! (confirmación, webhook o reembolso).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::models::boat_repair::RepairPaymentStatus;
use crate::models::order::OrderPaymentStatus;

/// Estado del pago - mapea al ENUM payment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Traducir el estado de un PaymentIntent de Stripe.
    /// `requires_payment_method` con error previo significa intento fallido.
    pub fn from_stripe(intent_status: &str, has_payment_error: bool) -> Self {
        match intent_status {
            "succeeded" => PaymentStatus::Succeeded,
            "processing" => PaymentStatus::Processing,
            "canceled" => PaymentStatus::Canceled,
            "requires_payment_method" if has_payment_error => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }

    /// Transiciones aceptadas al aplicar un eco de Stripe.
    /// Eventos repetidos o fuera de orden no hacen retroceder el estado.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Succeeded)
                | (Pending, Failed)
                | (Pending, Canceled)
                | (Processing, Succeeded)
                | (Processing, Failed)
                | (Processing, Canceled)
                | (Failed, Pending)
                | (Failed, Processing)
                | (Failed, Succeeded)
                | (Failed, Canceled)
                | (Succeeded, Refunded)
        )
    }

    /// Reflejo en el sub-pago de una reparación
    pub fn repair_payment_status(&self) -> RepairPaymentStatus {
        match self {
            PaymentStatus::Pending | PaymentStatus::Processing => RepairPaymentStatus::Pending,
            PaymentStatus::Succeeded => RepairPaymentStatus::Paid,
            PaymentStatus::Failed => RepairPaymentStatus::Failed,
            PaymentStatus::Canceled => RepairPaymentStatus::Unpaid,
            PaymentStatus::Refunded => RepairPaymentStatus::Refunded,
        }
    }

    /// Reflejo en `payment_status` de un pedido; `None` no lo modifica
    pub fn order_payment_status(&self) -> Option<OrderPaymentStatus> {
        match self {
            PaymentStatus::Succeeded => Some(OrderPaymentStatus::Paid),
            PaymentStatus::Failed => Some(OrderPaymentStatus::Failed),
            PaymentStatus::Refunded => Some(OrderPaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Tipo de servicio pagado - mapea al ENUM payment_service_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_service_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentServiceType {
    Repair,
    Appointment,
    Order,
}

impl PaymentServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentServiceType::Repair => "repair",
            PaymentServiceType::Appointment => "appointment",
            PaymentServiceType::Order => "order",
        }
    }
}

/// Tramo de pago de una reparación - mapea al ENUM repair_payment_stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "repair_payment_stage", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RepairPaymentStage {
    Advance,
    Final,
}

/// Referencia tipada al servicio que se paga
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ServiceRef {
    Repair(Uuid),
    Appointment(Uuid),
    Order(Uuid),
}

impl ServiceRef {
    pub fn from_parts(service_type: PaymentServiceType, service_id: Uuid) -> Self {
        match service_type {
            PaymentServiceType::Repair => ServiceRef::Repair(service_id),
            PaymentServiceType::Appointment => ServiceRef::Appointment(service_id),
            PaymentServiceType::Order => ServiceRef::Order(service_id),
        }
    }

    pub fn service_type(&self) -> PaymentServiceType {
        match self {
            ServiceRef::Repair(_) => PaymentServiceType::Repair,
            ServiceRef::Appointment(_) => PaymentServiceType::Appointment,
            ServiceRef::Order(_) => PaymentServiceType::Order,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ServiceRef::Repair(id) | ServiceRef::Appointment(id) | ServiceRef::Order(id) => *id,
        }
    }
}

/// Payment - mapea exactamente a la tabla payments
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_payment_intent_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub service_type: PaymentServiceType,
    pub service_id: Uuid,
    pub payment_stage: Option<RepairPaymentStage>,
    pub failure_reason: Option<String>,
    pub refunded_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn service(&self) -> ServiceRef {
        ServiceRef::from_parts(self.service_type, self.service_id)
    }
}

/// Response de pago para la API
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_payment_intent_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub service: ServiceRef,
    pub payment_stage: Option<RepairPaymentStage>,
    pub failure_reason: Option<String>,
    pub refunded_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        let service = p.service();
        Self {
            id: p.id,
            user_id: p.user_id,
            stripe_payment_intent_id: p.stripe_payment_intent_id,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            service,
            payment_stage: p.payment_stage,
            failure_reason: p.failure_reason,
            refunded_amount: p.refunded_amount,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stripe_status() {
        assert_eq!(PaymentStatus::from_stripe("succeeded", false), PaymentStatus::Succeeded);
        assert_eq!(PaymentStatus::from_stripe("processing", false), PaymentStatus::Processing);
        assert_eq!(PaymentStatus::from_stripe("requires_payment_method", false), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_stripe("requires_payment_method", true), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from_stripe("requires_action", false), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_stripe("canceled", false), PaymentStatus::Canceled);
    }

    #[test]
    fn test_status_never_moves_backwards() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Succeeded));
        assert!(Succeeded.can_transition_to(Refunded));
        assert!(!Succeeded.can_transition_to(Pending));
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Refunded.can_transition_to(Succeeded));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Refunded));
    }

    #[test]
    fn test_booking_mirrors() {
        assert_eq!(PaymentStatus::Succeeded.repair_payment_status(), RepairPaymentStatus::Paid);
        assert_eq!(PaymentStatus::Processing.repair_payment_status(), RepairPaymentStatus::Pending);
        assert_eq!(PaymentStatus::Canceled.repair_payment_status(), RepairPaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::Refunded.order_payment_status(), Some(OrderPaymentStatus::Refunded));
        assert_eq!(PaymentStatus::Processing.order_payment_status(), None);
    }

    #[test]
    fn test_service_ref_is_tagged() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ServiceRef::Repair(id)).unwrap();
        assert_eq!(json["type"], "repair");
        assert_eq!(json["id"], id.to_string());

        let parsed: ServiceRef =
            serde_json::from_value(serde_json::json!({ "type": "order", "id": id })).unwrap();
        assert_eq!(parsed, ServiceRef::Order(id));
        assert_eq!(parsed.service_type(), PaymentServiceType::Order);
        assert!(serde_json::from_value::<ServiceRef>(serde_json::json!({ "type": "boat_ride", "id": id })).is_err());
    }
}
