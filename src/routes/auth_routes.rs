use axum::{
    extract::{Path, Query, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::controllers::auth_controller::AuthController;
use crate::dto::auth_dto::{LoginRequest, LoginResponse, RegisterRequest, UpdateRoleRequest};
use crate::dto::ApiResponse;
use crate::middleware::auth::{admin_only_middleware, auth_middleware, AuthenticatedUser};
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::models::user::UserResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_id, ValidatedJson};

#[derive(Debug, Default, Deserialize)]
pub struct UserFilters {
    pub role: Option<String>,
}

pub fn create_auth_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    let authenticated = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/role", put(update_role))
        .route_layer(from_fn(admin_only_middleware))
        .route_layer(from_fn_with_state(state, auth_middleware));

    public.merge(authenticated).merge(admin)
}

fn controller(state: &AppState) -> AuthController {
    AuthController::new(state.pool.clone(), state.jwt_config())
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let response = controller(&state).register(request).await?;
    Ok(Json(response))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let response = controller(&state).login(request).await?;
    Ok(Json(response))
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let response = controller(&state).me(&user).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn list_users(
    State(state): State<AppState>,
    Query(filters): Query<UserFilters>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, AppError> {
    let users = controller(&state).list_users(filters.role.as_deref()).await?;
    Ok(Json(ApiResponse::list(users)))
}

async fn update_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRoleRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id, "Usuario")?;
    let response = controller(&state).update_role(&user, id, request).await?;
    Ok(Json(response))
}
