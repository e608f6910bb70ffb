use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};

use crate::controllers::payment_controller::PaymentController;
use crate::dto::payment_dto::{
    ConfirmPaymentRequest, CreatePaymentIntentRequest, CreatePaymentIntentResponse, RefundRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::{auth_middleware, AuthenticatedUser};
use crate::models::payment::PaymentResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::{parse_id, ValidatedJson};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn create_payment_router(state: AppState) -> Router<AppState> {
    // El webhook se autentica con la firma de Stripe, no con JWT
    let webhook = Router::new().route("/webhook", post(webhook));

    let protected = Router::new()
        .route("/create-intent", post(create_intent))
        .route("/confirm", post(confirm))
        .route("/my", get(my_payments))
        .route("/", get(list_payments))
        .route("/:id", get(get_payment))
        .route("/:id/refund", post(refund))
        .route_layer(from_fn_with_state(state, auth_middleware));

    webhook.merge(protected)
}

async fn create_intent(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreatePaymentIntentRequest>,
) -> Result<Json<ApiResponse<CreatePaymentIntentResponse>>, AppError> {
    let response = PaymentController::new(&state).create_intent(&user, request).await?;
    Ok(Json(response))
}

async fn confirm(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<ConfirmPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let response = PaymentController::new(&state).confirm(&user, request).await?;
    Ok(Json(response))
}

/// Cuerpo crudo: la firma se calcula sobre los bytes tal como llegan
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    PaymentController::new(&state)
        .handle_webhook(&body, signature)
        .await?;

    Ok(Json(json!({ "received": true })))
}

async fn my_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, AppError> {
    let response = PaymentController::new(&state).list_mine(&user).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, AppError> {
    let response = PaymentController::new(&state).list_all(&user).await?;
    Ok(Json(ApiResponse::list(response)))
}

async fn get_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let id = parse_id(&id, "Pago")?;
    let response = PaymentController::new(&state).get_by_id(&user, id).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn refund(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Option<Json<RefundRequest>>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let id = parse_id(&id, "Pago")?;
    let request = body.map(|Json(r)| r).unwrap_or_default();
    validator::Validate::validate(&request)?;
    let response = PaymentController::new(&state).refund(&user, id, request).await?;
    Ok(Json(response))
}
