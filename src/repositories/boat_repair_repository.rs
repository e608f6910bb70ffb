use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::models::appointment::BoatDetails;
use crate::models::boat_repair::{BoatRepair, RepairPayment, RepairServiceType, RepairStatus};
use crate::utils::errors::AppError;
use crate::utils::reference::{generate_reference, REPAIR_PREFIX};

const MAX_NUMBER_ATTEMPTS: usize = 3;

/// Datos para registrar una reparación
#[derive(Debug, Clone)]
pub struct NewBoatRepair {
    pub customer_id: Uuid,
    pub service_type: RepairServiceType,
    pub problem_description: String,
    pub boat_details: BoatDetails,
    pub preferred_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

pub struct BoatRepairRepository {
    pool: PgPool,
}

impl BoatRepairRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewBoatRepair) -> Result<BoatRepair, AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let result = sqlx::query_as::<_, BoatRepair>(
                r#"
                INSERT INTO boat_repairs (
                    id, repair_number, customer_id, service_type, problem_description,
                    boat_details, preferred_date, status, payment, final_payment,
                    notes, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $8, $9, $10, $10)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(generate_reference(REPAIR_PREFIX))
            .bind(new.customer_id)
            .bind(new.service_type)
            .bind(&new.problem_description)
            .bind(Json(&new.boat_details))
            .bind(new.preferred_date)
            .bind(Json(RepairPayment::default()))
            .bind(&new.notes)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(repair) => return Ok(repair),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() && attempt < MAX_NUMBER_ATTEMPTS => {
                    warn!("⚠️ Número de reparación repetido, reintentando ({})", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BoatRepair>, AppError> {
        let repair = sqlx::query_as::<_, BoatRepair>("SELECT * FROM boat_repairs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(repair)
    }

    pub async fn list(
        &self,
        customer_id: Option<Uuid>,
        status: Option<RepairStatus>,
    ) -> Result<Vec<BoatRepair>, AppError> {
        let repairs = sqlx::query_as::<_, BoatRepair>(
            r#"
            SELECT * FROM boat_repairs
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::repair_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(repairs)
    }

    /// Cambiar de estado solo si nadie lo cambió desde que se leyó.
    /// Devuelve `None` si el estado actual ya no es `from`.
    pub async fn transition(
        &self,
        id: Uuid,
        from: RepairStatus,
        to: RepairStatus,
        final_cost: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<Option<BoatRepair>, AppError> {
        let repair = sqlx::query_as::<_, BoatRepair>(
            r#"
            UPDATE boat_repairs
            SET status = $3,
                final_cost = COALESCE($4, final_cost),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(final_cost)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(repair)
    }

    pub async fn assign(
        &self,
        id: Uuid,
        from: RepairStatus,
        technician_id: Uuid,
        scheduled_date: Option<NaiveDate>,
    ) -> Result<Option<BoatRepair>, AppError> {
        let repair = sqlx::query_as::<_, BoatRepair>(
            r#"
            UPDATE boat_repairs
            SET assigned_technician_id = $3,
                scheduled_date = COALESCE($4, scheduled_date),
                status = 'assigned',
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(technician_id)
        .bind(scheduled_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(repair)
    }

    pub async fn reschedule(
        &self,
        id: Uuid,
        from: RepairStatus,
        scheduled_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Option<BoatRepair>, AppError> {
        let repair = sqlx::query_as::<_, BoatRepair>(
            r#"
            UPDATE boat_repairs
            SET scheduled_date = $3,
                status = 'rescheduled',
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(scheduled_date)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(repair)
    }

    pub async fn set_estimate(
        &self,
        id: Uuid,
        estimated_cost: Decimal,
        notes: Option<String>,
    ) -> Result<Option<BoatRepair>, AppError> {
        let repair = sqlx::query_as::<_, BoatRepair>(
            r#"
            UPDATE boat_repairs
            SET estimated_cost = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(estimated_cost)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(repair)
    }
}
