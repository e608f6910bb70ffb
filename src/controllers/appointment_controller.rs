use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::dto::appointment_dto::{
    AppointmentFilters, AvailableSlotsResponse, CreateAppointmentRequest,
    RescheduleAppointmentRequest, UpdateAppointmentStatusRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::appointment::{Appointment, AppointmentResponse, AppointmentStatus, TimeSlot};
use crate::repositories::appointment_repository::{AppointmentRepository, NewAppointment};
use crate::services::scheduling_service::{available_slots, build_month_calendar, month_bounds, MonthCalendar};
use crate::utils::errors::AppError;
use crate::utils::validation::parse_date;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Validar el texto de un slot horario
pub fn parse_time_slot(value: &str) -> Result<TimeSlot, AppError> {
    TimeSlot::parse(value).ok_or_else(|| {
        let valid: Vec<&str> = TimeSlot::ALL.iter().map(|s| s.as_str()).collect();
        AppError::BadRequest(format!(
            "Horario inválido '{}'. Horarios disponibles: {}",
            value,
            valid.join(", ")
        ))
    })
}

/// Validar el texto de un estado de cita
pub fn parse_appointment_status(value: &str) -> Result<AppointmentStatus, AppError> {
    AppointmentStatus::parse(value)
        .ok_or_else(|| AppError::BadRequest(format!("Estado de cita inválido: '{}'", value)))
}

/// Fecha y hora de una nueva reserva, que no puede quedar en el pasado
fn parse_future_slot(date: &str, time: &str) -> Result<(NaiveDate, TimeSlot), AppError> {
    let date = parse_date(date)?;
    let slot = parse_time_slot(time)?;
    if date < Utc::now().date_naive() {
        return Err(AppError::BadRequest("No se pueden reservar citas en fechas pasadas".to_string()));
    }
    Ok((date, slot))
}

fn changed_meanwhile() -> AppError {
    AppError::Conflict("La cita cambió mientras se procesaba la solicitud".to_string())
}

pub struct AppointmentController {
    repository: AppointmentRepository,
}

impl AppointmentController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AppointmentRepository::new(pool),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Appointment, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cita no encontrada".to_string()))
    }

    pub async fn create(
        &self,
        user: Option<&AuthenticatedUser>,
        request: CreateAppointmentRequest,
    ) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let (date, slot) = parse_future_slot(&request.appointment_date, &request.appointment_time)?;

        let new = NewAppointment {
            customer_id: user.map(|u| u.user_id),
            customer_name: request.customer_name.trim().to_string(),
            customer_email: request.customer_email.trim().to_lowercase(),
            customer_phone: request.customer_phone.trim().to_string(),
            service_type: request.service_type,
            appointment_date: date,
            appointment_time: slot,
            boat_details: request.boat_details,
            notes: request.notes,
        };

        let appointment = self
            .repository
            .create_if_slot_free(new)
            .await?
            .ok_or_else(|| {
                AppError::SlotUnavailable(format!("El horario {} del {} ya está reservado", slot, date))
            })?;

        info!("📅 Cita {} reservada para {} {}", appointment.id, date, slot);

        Ok(ApiResponse::success_with_message(
            appointment.into(),
            "Cita reservada exitosamente",
        ))
    }

    pub async fn available_slots(&self, date: &str) -> Result<AvailableSlotsResponse, AppError> {
        let date = parse_date(date)?;
        let booked = self.repository.booked_slots(date).await?;
        let available = available_slots(&booked);

        Ok(AvailableSlotsResponse {
            date,
            available_slots: available,
            booked_slots: booked,
            total_slots: TimeSlot::PER_DAY,
        })
    }

    pub async fn calendar(&self, year: i32, month: u32) -> Result<MonthCalendar, AppError> {
        let (from, to) = month_bounds(year, month)?;
        let counts: HashMap<NaiveDate, i64> = self
            .repository
            .daily_counts(from, to)
            .await?
            .into_iter()
            .collect();

        build_month_calendar(year, month, &counts)
    }

    /// Personal: todas las citas. Cliente: solo las suyas.
    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        filters: AppointmentFilters,
    ) -> Result<Vec<AppointmentResponse>, AppError> {
        let date = filters.date.as_deref().map(parse_date).transpose()?;
        let status = filters.status.as_deref().map(parse_appointment_status).transpose()?;
        let limit = filters.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = filters.offset.unwrap_or(0).max(0);
        let customer_id = if user.is_staff() { None } else { Some(user.user_id) };

        let appointments = self
            .repository
            .list(customer_id, date, status, limit, offset)
            .await?;

        Ok(appointments.into_iter().map(Into::into).collect())
    }

    pub async fn get_by_id(&self, user: &AuthenticatedUser, id: Uuid) -> Result<AppointmentResponse, AppError> {
        let appointment = self.find(id).await?;
        user.require_owner_or_staff(appointment.customer_id)?;
        Ok(appointment.into())
    }

    pub async fn update_status(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: UpdateAppointmentStatusRequest,
    ) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        user.require_staff()?;
        let status = parse_appointment_status(&request.status)?;

        let current = self.find(id).await?;
        if current.status == status && request.notes.is_none() {
            return Ok(ApiResponse::success(current.into()));
        }

        // Reactivar una cita cancelada vuelve a ocupar su slot; el índice único decide
        if !current.status.occupies_slot() && status.occupies_slot() {
            info!(
                "♻️ Reactivando cita {} en {} {}",
                current.id, current.appointment_date, current.appointment_time
            );
        }
        let updated = self
            .repository
            .update_status(&current, status, request.notes)
            .await?
            .ok_or_else(changed_meanwhile)?;

        info!(
            "📅 Cita {}: {} -> {}",
            updated.id,
            current.status.as_str(),
            updated.status.as_str()
        );

        Ok(ApiResponse::success_with_message(
            updated.into(),
            "Estado de la cita actualizado",
        ))
    }

    pub async fn cancel(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let current = self.find(id).await?;
        user.require_owner_or_staff(current.customer_id)?;

        match current.status {
            AppointmentStatus::Cancelled => {
                return Err(AppError::BadRequest("La cita ya está cancelada".to_string()))
            }
            AppointmentStatus::Completed => {
                return Err(AppError::BadRequest("No se puede cancelar una cita completada".to_string()))
            }
            _ => {}
        }

        let updated = self
            .repository
            .update_status(&current, AppointmentStatus::Cancelled, None)
            .await?
            .ok_or_else(changed_meanwhile)?;

        info!("🗑️ Cita {} cancelada, slot {} {} liberado", updated.id, updated.appointment_date, updated.appointment_time);

        Ok(ApiResponse::success_with_message(updated.into(), "Cita cancelada"))
    }

    pub async fn reschedule(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<ApiResponse<AppointmentResponse>, AppError> {
        let (date, slot) = parse_future_slot(&request.appointment_date, &request.appointment_time)?;

        let current = self.find(id).await?;
        user.require_owner_or_staff(current.customer_id)?;

        if matches!(current.status, AppointmentStatus::Cancelled | AppointmentStatus::Completed) {
            return Err(AppError::BadRequest(format!(
                "No se puede reprogramar una cita en estado '{}'",
                current.status.as_str()
            )));
        }

        let updated = self
            .repository
            .reschedule(&current, date, slot)
            .await?
            .ok_or_else(changed_meanwhile)?;

        info!("🔁 Cita {} movida a {} {}", updated.id, date, slot);

        Ok(ApiResponse::success_with_message(updated.into(), "Cita reprogramada"))
    }

    pub async fn delete(&self, user: &AuthenticatedUser, id: Uuid) -> Result<(), AppError> {
        user.require_admin()?;
        if !self.repository.delete(id).await? {
            return Err(AppError::NotFound("Cita no encontrada".to_string()));
        }
        info!("🗑️ Cita {} eliminada por {}", id, user.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_slot_lists_valid_slots() {
        match parse_time_slot("08:00") {
            Err(AppError::BadRequest(msg)) => {
                assert!(msg.contains("09:00"));
                assert!(msg.contains("20:00"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(parse_time_slot("14:00").unwrap(), TimeSlot::H14);
    }

    #[test]
    fn test_past_dates_are_rejected() {
        assert!(matches!(parse_future_slot("2000-01-01", "10:00"), Err(AppError::BadRequest(_))));
        let tomorrow = (Utc::now().date_naive() + chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
        assert!(parse_future_slot(&tomorrow, "10:00").is_ok());
    }

    #[test]
    fn test_parse_appointment_status() {
        assert_eq!(parse_appointment_status("Confirmed").unwrap(), AppointmentStatus::Confirmed);
        assert!(matches!(parse_appointment_status("Lost"), Err(AppError::BadRequest(_))));
    }
}
