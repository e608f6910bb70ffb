use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::appointment::{AppointmentServiceType, BoatDetails, TimeSlot};
use crate::utils::validation::validate_phone;

// Request para crear una cita.
// Fecha y hora llegan como texto y se validan en el controller (400 si no son válidas).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 2, max = 100))]
    pub customer_name: String,

    #[validate(email)]
    pub customer_email: String,

    #[validate(custom = "validate_phone")]
    pub customer_phone: String,

    pub service_type: AppointmentServiceType,

    pub appointment_date: String,

    pub appointment_time: String,

    pub boat_details: Option<BoatDetails>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

// Request para cambiar el estado (staff)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAppointmentStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

// Request para mover la cita a otro slot
#[derive(Debug, Deserialize, Validate)]
pub struct RescheduleAppointmentRequest {
    pub appointment_date: String,
    pub appointment_time: String,
}

// Filtros de listado
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFilters {
    pub date: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

// Response de disponibilidad de un día
#[derive(Debug, Serialize)]
pub struct AvailableSlotsResponse {
    pub date: NaiveDate,
    pub available_slots: Vec<TimeSlot>,
    pub booked_slots: Vec<TimeSlot>,
    pub total_slots: usize,
}
