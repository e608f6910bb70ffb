use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Extension, Json, Router,
};

use crate::controllers::boat_repair_controller::BoatRepairController;
use crate::dto::boat_repair_dto::{
    AssignTechnicianRequest, CreateBoatRepairRequest, RepairFilters, RescheduleRepairRequest,
    SetEstimateRequest, UpdateRepairStatusRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::models::boat_repair::BoatRepairResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_id, ValidatedJson};

pub fn create_boat_repair_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_repair).get(list_repairs))
        .route("/my", get(my_repairs))
        .route("/:id", get(get_repair))
        .route("/:id/assign", patch(assign))
        .route("/:id/status", patch(update_status))
        .route("/:id/estimate", patch(set_estimate))
        .route("/:id/reschedule", patch(reschedule))
        .route("/:id/cancel", post(cancel))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

async fn create_repair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateBoatRepairRequest>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.create(&user, request).await?;
    Ok(Json(response))
}

async fn my_repairs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<BoatRepairResponse>>>, AppError> {
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.list_mine(&user).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn list_repairs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(filters): Query<RepairFilters>,
) -> Result<Json<ApiResponse<Vec<BoatRepairResponse>>>, AppError> {
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.list_all(&user, filters).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn get_repair(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let id = parse_id(&id, "Reparación")?;
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.get_by_id(&user, id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<AssignTechnicianRequest>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let id = parse_id(&id, "Reparación")?;
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.assign(&user, id, request).await?;
    Ok(Json(response))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRepairStatusRequest>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let id = parse_id(&id, "Reparación")?;
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.update_status(&user, id, request).await?;
    Ok(Json(response))
}

async fn set_estimate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<SetEstimateRequest>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let id = parse_id(&id, "Reparación")?;
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.set_estimate(&user, id, request).await?;
    Ok(Json(response))
}

async fn reschedule(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RescheduleRepairRequest>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let id = parse_id(&id, "Reparación")?;
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.reschedule(&user, id, request).await?;
    Ok(Json(response))
}

async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BoatRepairResponse>>, AppError> {
    let id = parse_id(&id, "Reparación")?;
    let controller = BoatRepairController::new(state.pool.clone());
    let response = controller.cancel(&user, id).await?;
    Ok(Json(response))
}
