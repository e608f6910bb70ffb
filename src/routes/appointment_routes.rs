use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Extension, Json, Router,
};

use crate::controllers::appointment_controller::AppointmentController;
use crate::dto::appointment_dto::{
    AppointmentFilters, AvailableSlotsQuery, AvailableSlotsResponse, CalendarQuery,
    CreateAppointmentRequest, RescheduleAppointmentRequest, UpdateAppointmentStatusRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, optional_auth_middleware, AuthenticatedUser};
use crate::models::appointment::AppointmentResponse;
use crate::services::scheduling_service::MonthCalendar;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_id, ValidatedJson};

pub fn create_appointment_router(state: AppState) -> Router<AppState> {
    // Reservar y consultar disponibilidad no exige cuenta
    let public = Router::new()
        .route("/", post(create_appointment))
        .route("/available-slots", get(available_slots))
        .route("/calendar", get(calendar))
        .route_layer(from_fn_with_state(state.clone(), optional_auth_middleware));

    let protected = Router::new()
        .route("/", get(list_appointments))
        .route("/:id", get(get_appointment).delete(delete_appointment))
        .route("/:id/status", patch(update_status))
        .route("/:id/reschedule", patch(reschedule))
        .route("/:id/cancel", post(cancel))
        .route_layer(from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

async fn create_appointment(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller
        .create(user.as_ref().map(|Extension(u)| u), request)
        .await?;
    Ok(Json(response))
}

async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<ApiResponse<AvailableSlotsResponse>>, AppError> {
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.available_slots(&query.date).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<ApiResponse<MonthCalendar>>, AppError> {
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.calendar(query.year, query.month).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(filters): Query<AppointmentFilters>,
) -> Result<Json<ApiResponse<Vec<AppointmentResponse>>>, AppError> {
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.list(&user, filters).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let id = parse_id(&id, "Cita")?;
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.get_by_id(&user, id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateAppointmentStatusRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let id = parse_id(&id, "Cita")?;
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.update_status(&user, id, request).await?;
    Ok(Json(response))
}

async fn reschedule(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RescheduleAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let id = parse_id(&id, "Cita")?;
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.reschedule(&user, id, request).await?;
    Ok(Json(response))
}

async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AppointmentResponse>>, AppError> {
    let id = parse_id(&id, "Cita")?;
    let controller = AppointmentController::new(state.pool.clone());
    let response = controller.cancel(&user, id).await?;
    Ok(Json(response))
}

async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let id = parse_id(&id, "Cita")?;
    let controller = AppointmentController::new(state.pool.clone());
    controller.delete(&user, id).await?;
    Ok(Json(ApiResponse::message("Cita eliminada exitosamente")))
}
