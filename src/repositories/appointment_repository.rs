use chrono::{NaiveDate, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::models::appointment::{
    Appointment, AppointmentServiceType, AppointmentStatus, BoatDetails, TimeSlot,
};
use crate::utils::errors::AppError;

/// Datos para insertar una cita
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_type: AppointmentServiceType,
    pub appointment_date: NaiveDate,
    pub appointment_time: TimeSlot,
    pub boat_details: Option<BoatDetails>,
    pub notes: Option<String>,
}

/// Un UPDATE/INSERT chocó con el índice único de slots activos
fn slot_conflict(e: sqlx::Error, date: NaiveDate, time: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::SlotUnavailable(format!(
            "El horario {} del {} ya está reservado",
            time, date
        )),
        _ => e.into(),
    }
}

pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insertar la cita si el slot está libre.
    /// Devuelve `None` cuando otra cita no cancelada ocupa (fecha, hora);
    /// la comprobación la hace el índice único parcial en la misma sentencia.
    pub async fn create_if_slot_free(&self, new: NewAppointment) -> Result<Option<Appointment>, AppError> {
        let now = Utc::now();
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                id, customer_id, customer_name, customer_email, customer_phone,
                service_type, appointment_date, appointment_time, status,
                boat_details, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10, $11, $11)
            ON CONFLICT (appointment_date, appointment_time) WHERE status <> 'cancelled'
            DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.customer_id)
        .bind(&new.customer_name)
        .bind(&new.customer_email)
        .bind(&new.customer_phone)
        .bind(new.service_type)
        .bind(new.appointment_date)
        .bind(new.appointment_time.as_str())
        .bind(new.boat_details.map(Json))
        .bind(&new.notes)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(appointment)
    }

    pub async fn list(
        &self,
        customer_id: Option<Uuid>,
        date: Option<NaiveDate>,
        status: Option<AppointmentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Appointment>, AppError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::date IS NULL OR appointment_date = $2)
              AND ($3::appointment_status IS NULL OR status = $3)
            ORDER BY appointment_date DESC, appointment_time ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(customer_id)
        .bind(date)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    /// Slots ocupados (citas no canceladas) de una fecha
    pub async fn booked_slots(&self, date: NaiveDate) -> Result<Vec<TimeSlot>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT appointment_time FROM appointments
            WHERE appointment_date = $1 AND status <> 'cancelled'
            ORDER BY appointment_time
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(|(time,)| TimeSlot::parse(time)).collect())
    }

    /// Conteo de citas no canceladas por día en `[from, to)`
    pub async fn daily_counts(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<(NaiveDate, i64)>, AppError> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            r#"
            SELECT appointment_date, COUNT(*)::bigint
            FROM appointments
            WHERE appointment_date >= $1 AND appointment_date < $2 AND status <> 'cancelled'
            GROUP BY appointment_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Cambiar el estado si la cita sigue en `current.status`.
    /// `None` si otra petición la modificó entretanto.
    pub async fn update_status(
        &self,
        current: &Appointment,
        status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Option<Appointment>, AppError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $3, notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(current.status)
        .bind(status)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| slot_conflict(e, current.appointment_date, &current.appointment_time))
    }

    /// Mover la cita a otro slot con la misma guarda de estado
    pub async fn reschedule(
        &self,
        current: &Appointment,
        date: NaiveDate,
        time: TimeSlot,
    ) -> Result<Option<Appointment>, AppError> {
        sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET appointment_date = $3, appointment_time = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(current.status)
        .bind(date)
        .bind(time.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| slot_conflict(e, date, time.as_str()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
