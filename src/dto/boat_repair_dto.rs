use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::appointment::BoatDetails;
use crate::models::boat_repair::RepairServiceType;
use crate::utils::validation::{validate_non_negative_amount, validate_positive_amount};

// Request para registrar una reparación
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoatRepairRequest {
    pub service_type: RepairServiceType,

    #[validate(length(min = 10, max = 5000))]
    pub problem_description: String,

    #[serde(default)]
    pub boat_details: BoatDetails,

    // YYYY-MM-DD
    pub preferred_date: Option<String>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

// Asignación de técnico (admin)
#[derive(Debug, Deserialize, Validate)]
pub struct AssignTechnicianRequest {
    pub technician_id: String,
    pub scheduled_date: Option<String>,
}

// Cambio de estado (staff)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRepairStatusRequest {
    pub status: String,

    #[validate(custom = "validate_non_negative_amount")]
    pub final_cost: Option<Decimal>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetEstimateRequest {
    #[validate(custom = "validate_positive_amount")]
    pub estimated_cost: Decimal,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RescheduleRepairRequest {
    pub scheduled_date: String,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RepairFilters {
    pub status: Option<String>,
}
