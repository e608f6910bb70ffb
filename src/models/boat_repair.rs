//! Modelo de BoatRepair
//!
//! Solicitudes de reparación con su ciclo de trabajo (asignación,
//! ejecución, espera de repuestos) y dos pagos independientes:
//! anticipo (`payment`) y saldo final (`final_payment`).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use uuid::Uuid;

use crate::models::appointment::BoatDetails;

/// Tipo de servicio de reparación - mapea al ENUM repair_service_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "repair_service_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RepairServiceType {
    EngineRepair,
    HullRepair,
    Electrical,
    Plumbing,
    Maintenance,
    Inspection,
    Painting,
    Other,
}

/// Estado de la reparación - mapea al ENUM repair_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "repair_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Pending,
    Assigned,
    Confirmed,
    InProgress,
    WaitingParts,
    Completed,
    Cancelled,
    Rescheduled,
}

impl RepairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStatus::Pending => "pending",
            RepairStatus::Assigned => "assigned",
            RepairStatus::Confirmed => "confirmed",
            RepairStatus::InProgress => "in_progress",
            RepairStatus::WaitingParts => "waiting_parts",
            RepairStatus::Completed => "completed",
            RepairStatus::Cancelled => "cancelled",
            RepairStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" => Some(RepairStatus::Pending),
            "assigned" => Some(RepairStatus::Assigned),
            "confirmed" => Some(RepairStatus::Confirmed),
            "in_progress" => Some(RepairStatus::InProgress),
            "waiting_parts" => Some(RepairStatus::WaitingParts),
            "completed" => Some(RepairStatus::Completed),
            "cancelled" | "canceled" => Some(RepairStatus::Cancelled),
            "rescheduled" => Some(RepairStatus::Rescheduled),
            _ => None,
        }
    }

    /// Estados alcanzables desde el actual
    pub fn allowed_next(&self) -> &'static [RepairStatus] {
        use RepairStatus::*;
        match self {
            Pending => &[Assigned, Cancelled, Rescheduled],
            Assigned => &[Confirmed, Cancelled, Rescheduled],
            Confirmed => &[InProgress, Cancelled, Rescheduled],
            InProgress => &[WaitingParts, Completed],
            WaitingParts => &[InProgress, Completed],
            Rescheduled => &[Assigned, Confirmed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: RepairStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// El cliente solo puede cancelar antes de que empiece el trabajo
    pub fn customer_can_cancel(&self) -> bool {
        matches!(self, RepairStatus::Pending | RepairStatus::Assigned)
    }
}

/// Estado de cada sub-pago de la reparación
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepairPaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Sub-documento de pago (anticipo o saldo)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RepairPayment {
    pub status: RepairPaymentStatus,
    pub amount: Option<Decimal>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl RepairPayment {
    pub fn is_paid(&self) -> bool {
        self.status == RepairPaymentStatus::Paid
    }

    pub fn paid_amount(&self) -> Decimal {
        if self.is_paid() {
            self.amount.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }
}

/// BoatRepair - mapea exactamente a la tabla boat_repairs
#[derive(Debug, Clone, FromRow)]
pub struct BoatRepair {
    pub id: Uuid,
    pub repair_number: String,
    pub customer_id: Uuid,
    pub service_type: RepairServiceType,
    pub problem_description: String,
    pub boat_details: Json<BoatDetails>,
    pub preferred_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub assigned_technician_id: Option<Uuid>,
    pub estimated_cost: Option<Decimal>,
    pub final_cost: Option<Decimal>,
    pub status: RepairStatus,
    pub payment: Json<RepairPayment>,
    pub final_payment: Json<RepairPayment>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoatRepair {
    /// Importe pendiente tras el anticipo pagado
    pub fn outstanding_balance(&self) -> Option<Decimal> {
        self.final_cost
            .map(|total| (total - self.payment.paid_amount()).max(Decimal::ZERO))
    }
}

/// Response de reparación para la API
#[derive(Debug, Serialize)]
pub struct BoatRepairResponse {
    pub id: Uuid,
    pub repair_number: String,
    pub customer_id: Uuid,
    pub service_type: RepairServiceType,
    pub problem_description: String,
    pub boat_details: BoatDetails,
    pub preferred_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub assigned_technician_id: Option<Uuid>,
    pub estimated_cost: Option<Decimal>,
    pub final_cost: Option<Decimal>,
    pub outstanding_balance: Option<Decimal>,
    pub status: RepairStatus,
    pub payment: RepairPayment,
    pub final_payment: RepairPayment,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BoatRepair> for BoatRepairResponse {
    fn from(r: BoatRepair) -> Self {
        let outstanding_balance = r.outstanding_balance();
        Self {
            id: r.id,
            repair_number: r.repair_number,
            customer_id: r.customer_id,
            service_type: r.service_type,
            problem_description: r.problem_description,
            boat_details: r.boat_details.0,
            preferred_date: r.preferred_date,
            scheduled_date: r.scheduled_date,
            assigned_technician_id: r.assigned_technician_id,
            estimated_cost: r.estimated_cost,
            final_cost: r.final_cost,
            outstanding_balance,
            status: r.status,
            payment: r.payment.0,
            final_payment: r.final_payment.0,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use RepairStatus::*;
        let path = [Pending, Assigned, Confirmed, InProgress, WaitingParts, InProgress, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_forbidden_transitions() {
        use RepairStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Pending));
        assert!(Cancelled.is_terminal());
        assert!(Completed.is_terminal());
        assert!(Rescheduled.can_transition_to(Assigned));
    }

    #[test]
    fn test_customer_cancel_window() {
        assert!(RepairStatus::Pending.customer_can_cancel());
        assert!(RepairStatus::Assigned.customer_can_cancel());
        assert!(!RepairStatus::InProgress.customer_can_cancel());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(RepairStatus::parse("waiting-parts"), Some(RepairStatus::WaitingParts));
        assert_eq!(RepairStatus::parse("In Progress"), Some(RepairStatus::InProgress));
        assert_eq!(RepairStatus::parse("done"), None);
    }

    #[test]
    fn test_paid_amount_only_counts_paid() {
        let mut payment = RepairPayment {
            status: RepairPaymentStatus::Pending,
            amount: Some(Decimal::new(150, 0)),
            ..Default::default()
        };
        assert_eq!(payment.paid_amount(), Decimal::ZERO);
        payment.status = RepairPaymentStatus::Paid;
        assert_eq!(payment.paid_amount(), Decimal::new(150, 0));
    }
}
