use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Extension, Json, Router,
};

use crate::controllers::order_controller::OrderController;
use crate::dto::order_dto::{CreateOrderRequest, OrderFilters, UpdateOrderStatusRequest};
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::models::order::OrderResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_id, ValidatedJson};

pub fn create_order_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/my", get(my_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_status))
        .route("/:id/cancel", post(cancel))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    let controller = OrderController::new(state.pool.clone());
    let response = controller.create(&user, request).await?;
    Ok(Json(response))
}

async fn my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, AppError> {
    let controller = OrderController::new(state.pool.clone());
    let response = controller.list_mine(&user).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(filters): Query<OrderFilters>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, AppError> {
    let controller = OrderController::new(state.pool.clone());
    let response = controller.list_all(&user, filters).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    let id = parse_id(&id, "Pedido")?;
    let controller = OrderController::new(state.pool.clone());
    let response = controller.get_by_id(&user, id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    let id = parse_id(&id, "Pedido")?;
    let controller = OrderController::new(state.pool.clone());
    let response = controller.update_status(&user, id, request).await?;
    Ok(Json(response))
}

async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, AppError> {
    let id = parse_id(&id, "Pedido")?;
    let controller = OrderController::new(state.pool.clone());
    let response = controller.cancel(&user, id).await?;
    Ok(Json(response))
}
