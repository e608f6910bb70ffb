use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::boat_repair::{RepairPayment, RepairPaymentStatus};
use crate::models::order::{OrderPaymentStatus, OrderStatus, StatusHistoryEntry};
use crate::models::payment::{Payment, PaymentStatus, RepairPaymentStage, ServiceRef};
use crate::utils::errors::AppError;

/// Datos de un pago recién creado en Stripe
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_payment_intent_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub service: ServiceRef,
    pub payment_stage: Option<RepairPaymentStage>,
}

/// Estado devuelto por Stripe que se aplica al pago local
#[derive(Debug, Clone)]
pub struct GatewayUpdate {
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub refunded_amount: Option<Decimal>,
}

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Guardar el pago en `pending` y marcar el sub-pago de la reparación
    pub async fn create(&self, new: NewPayment) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, user_id, stripe_payment_intent_id, amount, currency, status,
                service_type, service_id, payment_stage, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.stripe_payment_intent_id)
        .bind(new.amount)
        .bind(&new.currency)
        .bind(new.service.service_type())
        .bind(new.service.id())
        .bind(new.payment_stage)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let (ServiceRef::Repair(repair_id), Some(stage)) = (new.service, new.payment_stage) {
            let sub = RepairPayment {
                status: RepairPaymentStatus::Pending,
                amount: Some(new.amount),
                payment_intent_id: Some(new.stripe_payment_intent_id.clone()),
                paid_at: None,
            };
            write_repair_payment(&mut tx, repair_id, stage, &sub).await?;
        }

        tx.commit().await?;

        Ok(payment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn find_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, AppError> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE stripe_payment_intent_id = $1")
                .bind(intent_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(payment)
    }

    pub async fn list(&self, user_id: Option<Uuid>) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Aplicar el estado que Stripe reporta, junto con su efecto sobre la reserva.
    ///
    /// Todo ocurre en una transacción: o cambian el pago y la reserva, o
    /// ninguno. Devuelve `None` cuando la transición no procede (evento
    /// repetido, fuera de orden o el pago cambió entretanto).
    pub async fn apply_gateway_update(
        &self,
        payment: &Payment,
        update: GatewayUpdate,
    ) -> Result<Option<Payment>, AppError> {
        if !payment.status.can_transition_to(update.status) {
            return Ok(None);
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $3,
                failure_reason = COALESCE($4, failure_reason),
                refunded_amount = COALESCE($5, refunded_amount),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.status)
        .bind(update.status)
        .bind(&update.failure_reason)
        .bind(update.refunded_amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        match updated.service() {
            ServiceRef::Repair(repair_id) => {
                if let Some(stage) = updated.payment_stage {
                    apply_to_repair(&mut tx, repair_id, stage, &updated).await?;
                }
            }
            ServiceRef::Order(order_id) => {
                if let Some(order_status) = updated.status.order_payment_status() {
                    apply_to_order(&mut tx, order_id, order_status).await?;
                }
            }
            ServiceRef::Appointment(appointment_id) => {
                if updated.status == PaymentStatus::Succeeded {
                    confirm_appointment(&mut tx, appointment_id).await?;
                }
            }
        }

        tx.commit().await?;

        info!(
            "💳 Pago {} ({}): {} -> {}",
            updated.id,
            updated.stripe_payment_intent_id,
            payment.status.as_str(),
            updated.status.as_str()
        );

        Ok(Some(updated))
    }
}

async fn write_repair_payment(
    conn: &mut PgConnection,
    repair_id: Uuid,
    stage: RepairPaymentStage,
    sub: &RepairPayment,
) -> Result<(), AppError> {
    let sql = match stage {
        RepairPaymentStage::Advance => {
            "UPDATE boat_repairs SET payment = $2, updated_at = NOW() WHERE id = $1"
        }
        RepairPaymentStage::Final => {
            "UPDATE boat_repairs SET final_payment = $2, updated_at = NOW() WHERE id = $1"
        }
    };

    sqlx::query(sql).bind(repair_id).bind(Json(sub)).execute(conn).await?;

    Ok(())
}

/// Actualizar el sub-pago (anticipo o saldo) de la reparación.
/// Un intent antiguo no pisa el sub-pago de otro intent más reciente.
async fn apply_to_repair(
    conn: &mut PgConnection,
    repair_id: Uuid,
    stage: RepairPaymentStage,
    payment: &Payment,
) -> Result<(), AppError> {
    let sql = match stage {
        RepairPaymentStage::Advance => "SELECT payment FROM boat_repairs WHERE id = $1 FOR UPDATE",
        RepairPaymentStage::Final => "SELECT final_payment FROM boat_repairs WHERE id = $1 FOR UPDATE",
    };

    let row: Option<(Json<RepairPayment>,)> = sqlx::query_as(sql)
        .bind(repair_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some((Json(mut sub),)) = row else {
        warn!("⚠️ Reparación {} del pago {} no existe", repair_id, payment.id);
        return Ok(());
    };

    let same_intent = sub.payment_intent_id.as_deref() == Some(payment.stripe_payment_intent_id.as_str());
    if !same_intent && payment.status != PaymentStatus::Succeeded {
        return Ok(());
    }

    sub.status = payment.status.repair_payment_status();
    sub.amount = Some(payment.amount);
    sub.payment_intent_id = Some(payment.stripe_payment_intent_id.clone());
    if payment.status == PaymentStatus::Succeeded {
        sub.paid_at = Some(Utc::now());
    }

    write_repair_payment(conn, repair_id, stage, &sub).await
}

/// `payment_status` de un pedido. Un fallo no pisa un pedido ya pagado.
async fn apply_to_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    payment_status: OrderPaymentStatus,
) -> Result<(), AppError> {
    let sql = match payment_status {
        OrderPaymentStatus::Failed => {
            "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1 AND payment_status <> 'paid'"
        }
        _ => "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1",
    };

    sqlx::query(sql)
        .bind(order_id)
        .bind(payment_status)
        .execute(&mut *conn)
        .await?;

    if payment_status == OrderPaymentStatus::Paid {
        let entry = StatusHistoryEntry::new(OrderStatus::Confirmed, Some("Pago recibido".to_string()), None);
        sqlx::query(
            r#"
            UPDATE orders
            SET status = 'confirmed', status_history = status_history || $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(Json(vec![entry]))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Una cita pendiente queda confirmada al cobrar su depósito
async fn confirm_appointment(conn: &mut PgConnection, appointment_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE appointments SET status = 'confirmed', updated_at = NOW() WHERE id = $1 AND status = 'pending'",
    )
    .bind(appointment_id)
    .execute(conn)
    .await?;

    Ok(())
}
