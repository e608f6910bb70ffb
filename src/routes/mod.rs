//! Routers de la API
//!
//! Cada recurso expone su propio `Router<AppState>`; aquí se montan bajo `/api`.

pub mod appointment_routes;
pub mod auth_routes;
pub mod boat_repair_routes;
pub mod order_routes;
pub mod payment_routes;
pub mod product_routes;

use axum::Router;

use crate::state::AppState;

pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes::create_auth_router(state.clone()))
        .nest("/appointments", appointment_routes::create_appointment_router(state.clone()))
        .nest("/boat-repairs", boat_repair_routes::create_boat_repair_router(state.clone()))
        .nest("/products", product_routes::create_product_router(state.clone()))
        .nest("/orders", order_routes::create_order_router(state.clone()))
        .nest("/payments", payment_routes::create_payment_router(state))
}
