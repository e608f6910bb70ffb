//! Modelo de Appointment
//!
//! Citas de venta/visita de embarcaciones. Cada cita ocupa uno de los
//! 12 slots horarios del día (09:00 a 20:00).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Slot horario de una cita
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeSlot {
    H09,
    H10,
    H11,
    H12,
    H13,
    H14,
    H15,
    H16,
    H17,
    H18,
    H19,
    H20,
}

impl TimeSlot {
    /// Los 12 slots diarios en orden
    pub const ALL: [TimeSlot; 12] = [
        TimeSlot::H09,
        TimeSlot::H10,
        TimeSlot::H11,
        TimeSlot::H12,
        TimeSlot::H13,
        TimeSlot::H14,
        TimeSlot::H15,
        TimeSlot::H16,
        TimeSlot::H17,
        TimeSlot::H18,
        TimeSlot::H19,
        TimeSlot::H20,
    ];

    pub const PER_DAY: usize = 12;

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::H09 => "09:00",
            TimeSlot::H10 => "10:00",
            TimeSlot::H11 => "11:00",
            TimeSlot::H12 => "12:00",
            TimeSlot::H13 => "13:00",
            TimeSlot::H14 => "14:00",
            TimeSlot::H15 => "15:00",
            TimeSlot::H16 => "16:00",
            TimeSlot::H17 => "17:00",
            TimeSlot::H18 => "18:00",
            TimeSlot::H19 => "19:00",
            TimeSlot::H20 => "20:00",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.iter().copied().find(|slot| slot.as_str() == value)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Tipo de servicio de la cita - mapea al ENUM appointment_service_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "appointment_service_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentServiceType {
    BoatPurchase,
    BoatViewing,
    SeaTrial,
    Consultation,
    TradeIn,
}

/// Estado de la cita - mapea al ENUM appointment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::InProgress => "In Progress",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// Acepta "In Progress", "in_progress", "in-progress" (sin distinguir mayúsculas)
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "in progress" => Some(AppointmentStatus::InProgress),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Una cita en este estado ocupa su slot
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

/// Datos de la embarcación asociada a la cita
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoatDetails {
    pub boat_type: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub length_ft: Option<f64>,
    pub engine_type: Option<String>,
    pub notes: Option<String>,
}

/// Appointment - mapea exactamente a la tabla appointments
#[derive(Debug, Clone, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_type: AppointmentServiceType,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub boat_details: Option<Json<BoatDetails>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response de cita para la API
#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_type: AppointmentServiceType,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub boat_details: Option<BoatDetails>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            customer_id: a.customer_id,
            customer_name: a.customer_name,
            customer_email: a.customer_email,
            customer_phone: a.customer_phone,
            service_type: a.service_type,
            appointment_date: a.appointment_date,
            appointment_time: a.appointment_time,
            status: a.status,
            boat_details: a.boat_details.map(|Json(details)| details),
            notes: a.notes,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slots_cover_nine_to_eight() {
        assert_eq!(TimeSlot::ALL.len(), TimeSlot::PER_DAY);
        assert_eq!(TimeSlot::ALL[0].as_str(), "09:00");
        assert_eq!(TimeSlot::ALL[11].as_str(), "20:00");
    }

    #[test]
    fn test_time_slot_parse() {
        assert_eq!(TimeSlot::parse("10:00"), Some(TimeSlot::H10));
        assert_eq!(TimeSlot::parse(" 20:00 "), Some(TimeSlot::H20));
        assert_eq!(TimeSlot::parse("08:00"), None);
        assert_eq!(TimeSlot::parse("21:00"), None);
        assert_eq!(TimeSlot::parse("10:30"), None);
    }

    #[test]
    fn test_status_parse_variants() {
        assert_eq!(AppointmentStatus::parse("In Progress"), Some(AppointmentStatus::InProgress));
        assert_eq!(AppointmentStatus::parse("in_progress"), Some(AppointmentStatus::InProgress));
        assert_eq!(AppointmentStatus::parse("CANCELLED"), Some(AppointmentStatus::Cancelled));
        assert_eq!(AppointmentStatus::parse("archived"), None);
    }

    #[test]
    fn test_status_serializes_with_display_labels() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
        assert!(AppointmentStatus::Completed.occupies_slot());
    }
}
