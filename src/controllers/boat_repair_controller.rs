use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::dto::boat_repair_dto::{
    AssignTechnicianRequest, CreateBoatRepairRequest, RepairFilters, RescheduleRepairRequest,
    SetEstimateRequest, UpdateRepairStatusRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::boat_repair::{BoatRepair, BoatRepairResponse, RepairStatus};
use crate::models::user::UserRole;
use crate::repositories::boat_repair_repository::{BoatRepairRepository, NewBoatRepair};
use crate::repositories::user_repository::UserRepository;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_date, parse_id};

pub fn parse_repair_status(value: &str) -> Result<RepairStatus, AppError> {
    RepairStatus::parse(value)
        .ok_or_else(|| AppError::BadRequest(format!("Estado de reparación inválido: '{}'", value)))
}

/// Comprobar la transición antes de tocar la base de datos
fn ensure_transition(from: RepairStatus, to: RepairStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

fn concurrent_change() -> AppError {
    AppError::Conflict("La reparación cambió mientras se procesaba la solicitud".to_string())
}

pub struct BoatRepairController {
    repository: BoatRepairRepository,
    users: UserRepository,
}

impl BoatRepairController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BoatRepairRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }

    async fn find(&self, id: Uuid) -> Result<BoatRepair, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reparación no encontrada".to_string()))
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        request: CreateBoatRepairRequest,
    ) -> Result<ApiResponse<BoatRepairResponse>, AppError> {
        let preferred_date = request.preferred_date.as_deref().map(parse_date).transpose()?;

        let repair = self
            .repository
            .create(NewBoatRepair {
                customer_id: user.user_id,
                service_type: request.service_type,
                problem_description: request.problem_description.trim().to_string(),
                boat_details: request.boat_details,
                preferred_date,
                notes: request.notes,
            })
            .await?;

        info!("🔧 Reparación {} registrada por {}", repair.repair_number, user.email);

        Ok(ApiResponse::success_with_message(
            repair.into(),
            "Solicitud de reparación registrada",
        ))
    }

    pub async fn list_mine(&self, user: &AuthenticatedUser) -> Result<Vec<BoatRepairResponse>, AppError> {
        let repairs = self.repository.list(Some(user.user_id), None).await?;
        Ok(repairs.into_iter().map(Into::into).collect())
    }

    pub async fn list_all(
        &self,
        user: &AuthenticatedUser,
        filters: RepairFilters,
    ) -> Result<Vec<BoatRepairResponse>, AppError> {
        user.require_staff()?;
        let status = filters.status.as_deref().map(parse_repair_status).transpose()?;
        let repairs = self.repository.list(None, status).await?;
        Ok(repairs.into_iter().map(Into::into).collect())
    }

    pub async fn get_by_id(&self, user: &AuthenticatedUser, id: Uuid) -> Result<BoatRepairResponse, AppError> {
        let repair = self.find(id).await?;
        user.require_owner_or_staff(Some(repair.customer_id))?;
        Ok(repair.into())
    }

    /// Asignar técnico (admin). El destino debe ser un empleado.
    pub async fn assign(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: AssignTechnicianRequest,
    ) -> Result<ApiResponse<BoatRepairResponse>, AppError> {
        user.require_admin()?;
        let technician_id = parse_id(&request.technician_id, "Técnico")?;
        let scheduled_date = request.scheduled_date.as_deref().map(parse_date).transpose()?;

        let technician = self
            .users
            .find_by_id(technician_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Técnico no encontrado".to_string()))?;
        if technician.role != UserRole::Employee {
            return Err(AppError::BadRequest(format!(
                "{} no es un empleado y no puede recibir reparaciones",
                technician.email
            )));
        }

        let current = self.find(id).await?;
        ensure_transition(current.status, RepairStatus::Assigned)?;

        let repair = self
            .repository
            .assign(id, current.status, technician.id, scheduled_date)
            .await?
            .ok_or_else(concurrent_change)?;

        info!("🧑‍🔧 Reparación {} asignada a {}", repair.repair_number, technician.email);

        Ok(ApiResponse::success_with_message(repair.into(), "Técnico asignado"))
    }

    pub async fn update_status(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: UpdateRepairStatusRequest,
    ) -> Result<ApiResponse<BoatRepairResponse>, AppError> {
        user.require_staff()?;
        let next = parse_repair_status(&request.status)?;

        if next == RepairStatus::Assigned || next == RepairStatus::Rescheduled {
            return Err(AppError::BadRequest(format!(
                "El estado '{}' se fija desde su endpoint dedicado",
                next.as_str()
            )));
        }
        if request.final_cost.is_some() && next != RepairStatus::Completed {
            return Err(AppError::BadRequest(
                "El coste final solo se indica al completar la reparación".to_string(),
            ));
        }

        let current = self.find(id).await?;
        ensure_transition(current.status, next)?;

        let repair = self
            .repository
            .transition(id, current.status, next, request.final_cost, request.notes)
            .await?
            .ok_or_else(concurrent_change)?;

        info!(
            "🔧 Reparación {}: {} -> {}",
            repair.repair_number,
            current.status.as_str(),
            repair.status.as_str()
        );

        Ok(ApiResponse::success_with_message(repair.into(), "Estado actualizado"))
    }

    pub async fn set_estimate(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: SetEstimateRequest,
    ) -> Result<ApiResponse<BoatRepairResponse>, AppError> {
        user.require_staff()?;

        let current = self.find(id).await?;
        if current.status.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "No se puede presupuestar una reparación en estado '{}'",
                current.status.as_str()
            )));
        }

        let repair = self
            .repository
            .set_estimate(id, request.estimated_cost, request.notes)
            .await?
            .ok_or_else(|| AppError::NotFound("Reparación no encontrada".to_string()))?;

        info!("💶 Presupuesto de {}: {}", repair.repair_number, request.estimated_cost);

        Ok(ApiResponse::success_with_message(repair.into(), "Presupuesto actualizado"))
    }

    pub async fn reschedule(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        request: RescheduleRepairRequest,
    ) -> Result<ApiResponse<BoatRepairResponse>, AppError> {
        let date = parse_date(&request.scheduled_date)?;

        let current = self.find(id).await?;
        user.require_owner_or_staff(Some(current.customer_id))?;
        ensure_transition(current.status, RepairStatus::Rescheduled)?;

        let repair = self
            .repository
            .reschedule(id, current.status, date, request.notes)
            .await?
            .ok_or_else(concurrent_change)?;

        info!("🔁 Reparación {} reprogramada para {}", repair.repair_number, date);

        Ok(ApiResponse::success_with_message(repair.into(), "Reparación reprogramada"))
    }

    /// Cliente: solo mientras está pendiente o asignada. Personal: cualquier estado no terminal.
    pub async fn cancel(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<ApiResponse<BoatRepairResponse>, AppError> {
        let current = self.find(id).await?;
        user.require_owner_or_staff(Some(current.customer_id))?;

        if !user.is_staff() && !current.status.customer_can_cancel() {
            return Err(AppError::BadRequest(format!(
                "La reparación ya está en estado '{}' y no se puede cancelar",
                current.status.as_str()
            )));
        }
        ensure_transition(current.status, RepairStatus::Cancelled)?;

        let repair = self
            .repository
            .transition(id, current.status, RepairStatus::Cancelled, None, None)
            .await?
            .ok_or_else(concurrent_change)?;

        info!("🗑️ Reparación {} cancelada por {}", repair.repair_number, user.email);

        Ok(ApiResponse::success_with_message(repair.into(), "Reparación cancelada"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition(RepairStatus::Pending, RepairStatus::Assigned).is_ok());
        match ensure_transition(RepairStatus::Completed, RepairStatus::InProgress) {
            Err(AppError::InvalidTransition { from, to }) => {
                assert_eq!(from, "completed");
                assert_eq!(to, "in_progress");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_repair_status() {
        assert_eq!(parse_repair_status("waiting_parts").unwrap(), RepairStatus::WaitingParts);
        assert!(matches!(parse_repair_status("sunk"), Err(AppError::BadRequest(_))));
    }
}
