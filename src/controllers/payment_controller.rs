use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dto::payment_dto::{
    ConfirmPaymentRequest, CreatePaymentIntentRequest, CreatePaymentIntentResponse, RefundRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::appointment::AppointmentStatus;
use crate::models::boat_repair::{BoatRepair, RepairStatus};
use crate::models::order::{OrderPaymentStatus, OrderStatus};
use crate::models::payment::{Payment, PaymentResponse, PaymentStatus, RepairPaymentStage, ServiceRef};
use crate::repositories::appointment_repository::AppointmentRepository;
use crate::repositories::boat_repair_repository::BoatRepairRepository;
use crate::repositories::order_repository::OrderRepository;
use crate::repositories::payment_repository::{GatewayUpdate, NewPayment, PaymentRepository};
use crate::services::stripe_service::{
    from_minor_units, verify_webhook_signature, CreateIntentParams, GatewayIntent, PaymentGateway,
    StripeCharge, StripeEvent, WEBHOOK_TOLERANCE_SECS,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Importe a cobrar y descripción del servicio resuelto
#[derive(Debug)]
struct Chargeable {
    amount: Decimal,
    stage: Option<RepairPaymentStage>,
    description: String,
}

/// Anticipo: importe explícito o porcentaje del presupuesto
fn advance_amount(repair: &BoatRepair, requested: Option<Decimal>, percent: Decimal) -> Result<Decimal, AppError> {
    if repair.payment.is_paid() {
        return Err(AppError::BadRequest("El anticipo de esta reparación ya está pagado".to_string()));
    }
    match (requested, repair.estimated_cost) {
        (Some(amount), _) => Ok(amount),
        (None, Some(estimate)) => Ok((estimate * percent / Decimal::ONE_HUNDRED).round_dp(2)),
        (None, None) => Err(AppError::BadRequest(
            "La reparación aún no tiene presupuesto; indica el importe del anticipo".to_string(),
        )),
    }
}

/// Saldo final: coste final menos el anticipo pagado
fn final_amount(repair: &BoatRepair) -> Result<Decimal, AppError> {
    if repair.status != RepairStatus::Completed {
        return Err(AppError::BadRequest(
            "El saldo final solo se cobra con la reparación completada".to_string(),
        ));
    }
    if repair.final_payment.is_paid() {
        return Err(AppError::BadRequest("El saldo final ya está pagado".to_string()));
    }
    match repair.outstanding_balance() {
        Some(balance) if balance > Decimal::ZERO => Ok(balance),
        Some(_) => Err(AppError::BadRequest("No hay saldo pendiente".to_string())),
        None => Err(AppError::BadRequest("La reparación no tiene coste final".to_string())),
    }
}

/// Estado que anuncia cada tipo de evento de PaymentIntent
fn intent_event_status(event_type: &str) -> Option<PaymentStatus> {
    match event_type {
        "payment_intent.succeeded" => Some(PaymentStatus::Succeeded),
        "payment_intent.payment_failed" => Some(PaymentStatus::Failed),
        "payment_intent.canceled" => Some(PaymentStatus::Canceled),
        "payment_intent.processing" => Some(PaymentStatus::Processing),
        _ => None,
    }
}

fn invalid_payload(e: serde_json::Error) -> AppError {
    AppError::BadRequest(format!("Payload de webhook inválido: {}", e))
}

pub struct PaymentController {
    payments: PaymentRepository,
    repairs: BoatRepairRepository,
    orders: OrderRepository,
    appointments: AppointmentRepository,
    gateway: Arc<dyn PaymentGateway>,
    default_currency: String,
    advance_percent: Decimal,
    webhook_secret: String,
}

impl PaymentController {
    pub fn new(state: &AppState) -> Self {
        let pool: PgPool = state.pool.clone();
        Self {
            payments: PaymentRepository::new(pool.clone()),
            repairs: BoatRepairRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            appointments: AppointmentRepository::new(pool),
            gateway: state.payments.clone(),
            default_currency: state.config.default_currency.clone(),
            advance_percent: state.config.repair_advance_percent,
            webhook_secret: state.config.stripe_webhook_secret.clone(),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Payment, AppError> {
        self.payments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pago no encontrado".to_string()))
    }

    /// Resolver la reserva referenciada, comprobar que es del usuario y calcular el importe
    async fn resolve(
        &self,
        user: &AuthenticatedUser,
        request: &CreatePaymentIntentRequest,
    ) -> Result<Chargeable, AppError> {
        if request.stage.is_some() && !matches!(request.service, ServiceRef::Repair(_)) {
            return Err(AppError::BadRequest("`stage` solo aplica a reparaciones".to_string()));
        }

        match request.service {
            ServiceRef::Repair(id) => {
                let repair = self
                    .repairs
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Reparación no encontrada".to_string()))?;
                if repair.customer_id != user.user_id && !user.is_admin() {
                    return Err(AppError::Forbidden("La reparación no te pertenece".to_string()));
                }
                if repair.status == RepairStatus::Cancelled {
                    return Err(AppError::BadRequest("La reparación está cancelada".to_string()));
                }

                let stage = request.stage.unwrap_or(RepairPaymentStage::Advance);
                let amount = match stage {
                    RepairPaymentStage::Advance => advance_amount(&repair, request.amount, self.advance_percent)?,
                    RepairPaymentStage::Final => final_amount(&repair)?,
                };
                Ok(Chargeable {
                    amount,
                    stage: Some(stage),
                    description: format!("Reparación {}", repair.repair_number),
                })
            }
            ServiceRef::Order(id) => {
                let order = self
                    .orders
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Pedido no encontrado".to_string()))?;
                if order.customer_id != user.user_id && !user.is_admin() {
                    return Err(AppError::Forbidden("El pedido no te pertenece".to_string()));
                }
                if order.status == OrderStatus::Cancelled {
                    return Err(AppError::BadRequest("El pedido está cancelado".to_string()));
                }
                if matches!(order.payment_status, OrderPaymentStatus::Paid | OrderPaymentStatus::Refunded) {
                    return Err(AppError::BadRequest("El pedido ya está pagado".to_string()));
                }
                Ok(Chargeable {
                    amount: order.total,
                    stage: None,
                    description: format!("Pedido {}", order.order_number),
                })
            }
            ServiceRef::Appointment(id) => {
                let appointment = self
                    .appointments
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Cita no encontrada".to_string()))?;
                user.require_owner_or_staff(appointment.customer_id)?;
                if appointment.status == AppointmentStatus::Cancelled {
                    return Err(AppError::BadRequest("La cita está cancelada".to_string()));
                }
                let amount = request.amount.ok_or_else(|| {
                    AppError::BadRequest("Indica el importe del depósito de la cita".to_string())
                })?;
                Ok(Chargeable {
                    amount,
                    stage: None,
                    description: format!(
                        "Depósito cita {} {}",
                        appointment.appointment_date, appointment.appointment_time
                    ),
                })
            }
        }
    }

    pub async fn create_intent(
        &self,
        user: &AuthenticatedUser,
        request: CreatePaymentIntentRequest,
    ) -> Result<ApiResponse<CreatePaymentIntentResponse>, AppError> {
        let chargeable = self.resolve(user, &request).await?;
        if chargeable.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest("El importe debe ser mayor que cero".to_string()));
        }

        let currency = request
            .currency
            .unwrap_or_else(|| self.default_currency.clone())
            .to_lowercase();
        let payment_id = Uuid::new_v4();

        let intent = self
            .gateway
            .create_payment_intent(CreateIntentParams {
                amount: chargeable.amount,
                currency: currency.clone(),
                customer_email: user.email.clone(),
                service: request.service,
                payment_id,
                description: chargeable.description,
            })
            .await?;

        let client_secret = intent
            .client_secret
            .clone()
            .ok_or_else(|| AppError::ExternalApi("Stripe no devolvió client_secret".to_string()))?;

        let payment = self
            .payments
            .create(NewPayment {
                id: payment_id,
                user_id: user.user_id,
                stripe_payment_intent_id: intent.id.clone(),
                amount: chargeable.amount,
                currency: currency.clone(),
                service: request.service,
                payment_stage: chargeable.stage,
            })
            .await?;

        info!(
            "💳 PaymentIntent {} creado para {} {}: {} {}",
            intent.id,
            request.service.service_type().as_str(),
            request.service.id(),
            payment.amount,
            currency
        );

        Ok(ApiResponse::success(CreatePaymentIntentResponse {
            payment_id: payment.id,
            payment_intent_id: payment.stripe_payment_intent_id,
            client_secret,
            amount: payment.amount,
            currency: payment.currency,
        }))
    }

    /// Aplicar el estado que devuelve Stripe; si no procede, devolver el pago tal cual
    async fn mirror(&self, payment: Payment, update: GatewayUpdate) -> Result<Payment, AppError> {
        if update.status == payment.status {
            return Ok(payment);
        }
        match self.payments.apply_gateway_update(&payment, update).await? {
            Some(updated) => Ok(updated),
            None => self.find(payment.id).await,
        }
    }

    fn update_from_intent(intent: &GatewayIntent) -> GatewayUpdate {
        let status = PaymentStatus::from_stripe(&intent.status, intent.last_payment_error.is_some());
        GatewayUpdate {
            status,
            failure_reason: intent.failure_reason(),
            refunded_amount: None,
        }
    }

    pub async fn confirm(
        &self,
        user: &AuthenticatedUser,
        request: ConfirmPaymentRequest,
    ) -> Result<ApiResponse<PaymentResponse>, AppError> {
        let payment = self
            .payments
            .find_by_intent_id(&request.payment_intent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pago no encontrado".to_string()))?;
        if payment.user_id != user.user_id && !user.is_admin() {
            return Err(AppError::Forbidden("El pago no te pertenece".to_string()));
        }

        let intent = self.gateway.retrieve_payment_intent(&payment.stripe_payment_intent_id).await?;
        let payment = self.mirror(payment, Self::update_from_intent(&intent)).await?;

        Ok(ApiResponse::success_with_message(
            payment.into(),
            format!("Estado del pago: {}", intent.status),
        ))
    }

    /// Procesar un webhook firmado de Stripe. Los eventos desconocidos se aceptan sin efecto.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<(), AppError> {
        let signature = signature
            .ok_or_else(|| AppError::BadRequest("Falta la cabecera Stripe-Signature".to_string()))?;
        verify_webhook_signature(
            payload,
            signature,
            &self.webhook_secret,
            Utc::now().timestamp(),
            WEBHOOK_TOLERANCE_SECS,
        )?;

        let event: StripeEvent = serde_json::from_slice(payload).map_err(invalid_payload)?;

        if let Some(status) = intent_event_status(&event.event_type) {
            let intent: GatewayIntent = serde_json::from_value(event.data.object).map_err(invalid_payload)?;
            let Some(payment) = self.payments.find_by_intent_id(&intent.id).await? else {
                warn!("⚠️ Webhook {} para intent desconocido {}", event.id, intent.id);
                return Ok(());
            };
            let update = GatewayUpdate {
                status,
                failure_reason: intent.failure_reason(),
                refunded_amount: None,
            };
            self.mirror(payment, update).await?;
            return Ok(());
        }

        if event.event_type == "charge.refunded" {
            let charge: StripeCharge = serde_json::from_value(event.data.object).map_err(invalid_payload)?;
            let Some(intent_id) = charge.payment_intent else {
                return Ok(());
            };
            let Some(payment) = self.payments.find_by_intent_id(&intent_id).await? else {
                warn!("⚠️ Reembolso para intent desconocido {}", intent_id);
                return Ok(());
            };
            let update = GatewayUpdate {
                status: PaymentStatus::Refunded,
                failure_reason: None,
                refunded_amount: Some(from_minor_units(charge.amount_refunded)),
            };
            self.mirror(payment, update).await?;
            return Ok(());
        }

        debug!("Webhook {} ignorado ({})", event.id, event.event_type);
        Ok(())
    }

    pub async fn list_mine(&self, user: &AuthenticatedUser) -> Result<Vec<PaymentResponse>, AppError> {
        let payments = self.payments.list(Some(user.user_id)).await?;
        Ok(payments.into_iter().map(Into::into).collect())
    }

    pub async fn list_all(&self, user: &AuthenticatedUser) -> Result<Vec<PaymentResponse>, AppError> {
        user.require_admin()?;
        let payments = self.payments.list(None).await?;
        Ok(payments.into_iter().map(Into::into).collect())
    }

    pub async fn get_by_id(&self, user: &AuthenticatedUser, id: Uuid) -> Result<PaymentResponse, AppError> {
        let payment = self.find(id).await?;
        if payment.user_id != user.user_id && !user.is_admin() {
            return Err(AppError::Forbidden("El pago no te pertenece".to_string()));
        }
        Ok(payment.into())
    }

    pub async fn refund(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: RefundRequest,
    ) -> Result<ApiResponse<PaymentResponse>, AppError> {
        user.require_admin()?;
        let payment = self.find(id).await?;

        if payment.status != PaymentStatus::Succeeded {
            return Err(AppError::BadRequest(format!(
                "Solo se reembolsan pagos completados (estado actual: '{}')",
                payment.status.as_str()
            )));
        }
        if let Some(amount) = request.amount {
            if amount > payment.amount {
                return Err(AppError::BadRequest(format!(
                    "El reembolso ({}) supera el importe del pago ({})",
                    amount, payment.amount
                )));
            }
        }

        let refund = self
            .gateway
            .refund(&payment.stripe_payment_intent_id, request.amount)
            .await?;

        info!("↩️ Reembolso {} del pago {} por {}", refund.id, payment.id, user.email);

        let update = GatewayUpdate {
            status: PaymentStatus::Refunded,
            failure_reason: None,
            refunded_amount: Some(from_minor_units(refund.amount)),
        };
        let payment = self.mirror(payment, update).await?;

        Ok(ApiResponse::success_with_message(payment.into(), "Pago reembolsado"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::appointment::BoatDetails;
    use crate::models::boat_repair::{RepairPayment, RepairPaymentStatus, RepairServiceType};
    use sqlx::types::Json;

    fn repair(status: RepairStatus, estimated: Option<i64>, final_cost: Option<i64>) -> BoatRepair {
        BoatRepair {
            id: Uuid::new_v4(),
            repair_number: "REP-20250110-AB12".into(),
            customer_id: Uuid::new_v4(),
            service_type: RepairServiceType::EngineRepair,
            problem_description: "El motor no arranca".into(),
            boat_details: Json(BoatDetails::default()),
            preferred_date: None,
            scheduled_date: None,
            assigned_technician_id: None,
            estimated_cost: estimated.map(|v| Decimal::new(v, 0)),
            final_cost: final_cost.map(|v| Decimal::new(v, 0)),
            status,
            payment: Json(RepairPayment::default()),
            final_payment: Json(RepairPayment::default()),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_advance_uses_percent_of_estimate() {
        let r = repair(RepairStatus::Confirmed, Some(1000), None);
        assert_eq!(advance_amount(&r, None, Decimal::new(30, 0)).unwrap(), Decimal::new(300, 0));
        assert_eq!(
            advance_amount(&r, Some(Decimal::new(50, 0)), Decimal::new(30, 0)).unwrap(),
            Decimal::new(50, 0)
        );
        let no_estimate = repair(RepairStatus::Pending, None, None);
        assert!(advance_amount(&no_estimate, None, Decimal::new(30, 0)).is_err());
    }

    #[test]
    fn test_final_amount_subtracts_paid_advance() {
        let mut r = repair(RepairStatus::Completed, Some(1000), Some(1200));
        r.payment = Json(RepairPayment {
            status: RepairPaymentStatus::Paid,
            amount: Some(Decimal::new(300, 0)),
            payment_intent_id: Some("pi_1".into()),
            paid_at: Some(Utc::now()),
        });
        assert_eq!(final_amount(&r).unwrap(), Decimal::new(900, 0));

        let in_progress = repair(RepairStatus::InProgress, Some(1000), Some(1200));
        assert!(final_amount(&in_progress).is_err());
    }

    #[test]
    fn test_intent_event_status() {
        assert_eq!(intent_event_status("payment_intent.succeeded"), Some(PaymentStatus::Succeeded));
        assert_eq!(intent_event_status("payment_intent.payment_failed"), Some(PaymentStatus::Failed));
        assert_eq!(intent_event_status("customer.created"), None);
    }
}
