use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::payment::{RepairPaymentStage, ServiceRef};
use crate::utils::validation::{validate_currency, validate_positive_amount};

// Request para iniciar un cobro.
// `service` es `{ "type": "repair" | "appointment" | "order", "id": "<uuid>" }`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentIntentRequest {
    pub service: ServiceRef,

    // Solo reparaciones; por defecto `advance`
    pub stage: Option<RepairPaymentStage>,

    // Obligatorio para citas; opcional para el anticipo de una reparación
    #[validate(custom = "validate_positive_amount")]
    pub amount: Option<Decimal>,

    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentIntentResponse {
    pub payment_id: Uuid,
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1))]
    pub payment_intent_id: String,
}

// Reembolso (admin). Sin importe se reembolsa el total.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RefundRequest {
    #[validate(custom = "validate_positive_amount")]
    pub amount: Option<Decimal>,
}
