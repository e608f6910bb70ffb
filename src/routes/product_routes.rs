use axum::{
    extract::{Path, Query, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::product_controller::ProductController;
use crate::dto::product_dto::{CreateProductRequest, ProductFilters};
use crate::dto::ApiResponse;
use crate::middleware::auth::{admin_only_middleware, auth_middleware, AuthenticatedUser};
use crate::models::product::Product;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_id, ValidatedJson};

pub fn create_product_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product));

    let admin = Router::new()
        .route("/", post(create_product))
        .route_layer(from_fn(admin_only_middleware))
        .route_layer(from_fn_with_state(state, auth_middleware));

    public.merge(admin)
}

async fn list_products(
    State(state): State<AppState>,
    Query(filters): Query<ProductFilters>,
) -> Result<Json<ApiResponse<Vec<Product>>>, AppError> {
    let controller = ProductController::new(state.pool.clone());
    let products = controller.list(filters).await?;
    Ok(Json(ApiResponse::list(products)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let id = parse_id(&id, "Producto")?;
    let controller = ProductController::new(state.pool.clone());
    let product = controller.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateProductRequest>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let controller = ProductController::new(state.pool.clone());
    let response = controller.create(&user, request).await?;
    Ok(Json(response))
}
