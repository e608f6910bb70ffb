//! Utilidades compartidas por los tests de integración
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use marina_backend::build_router;
use marina_backend::config::EnvironmentConfig;
use marina_backend::models::user::UserRole;
use marina_backend::services::stripe_service::{
    sign_webhook_payload, CreateIntentParams, GatewayIntent, GatewayRefund, PaymentGateway,
};
use marina_backend::state::AppState;
use marina_backend::utils::errors::AppError;
use marina_backend::utils::jwt::{generate_token, JwtConfig};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Pasarela falsa: nunca llega a Stripe
pub struct FakeGateway;

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(&self, params: CreateIntentParams) -> Result<GatewayIntent, AppError> {
        Ok(GatewayIntent {
            id: format!("pi_{}", params.payment_id.simple()),
            status: "requires_payment_method".to_string(),
            amount: 0,
            currency: params.currency,
            client_secret: Some("secret_test".to_string()),
            last_payment_error: None,
        })
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError> {
        Ok(GatewayIntent {
            id: intent_id.to_string(),
            status: "succeeded".to_string(),
            amount: 0,
            currency: "usd".to_string(),
            client_secret: None,
            last_payment_error: None,
        })
    }

    async fn refund(&self, _intent_id: &str, _amount: Option<Decimal>) -> Result<GatewayRefund, AppError> {
        Ok(GatewayRefund {
            id: "re_test".to_string(),
            amount: 0,
            status: Some("succeeded".to_string()),
        })
    }
}

pub fn test_config() -> EnvironmentConfig {
    EnvironmentConfig {
        environment: "test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        jwt_secret: "test-secret-marina".to_string(),
        jwt_expiration: 3600,
        cors_origins: vec!["*".to_string()],
        rate_limit_requests: 100,
        rate_limit_window: 60,
        stripe_secret_key: "sk_test".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        stripe_api_base: "http://127.0.0.1:9".to_string(),
        default_currency: "usd".to_string(),
        repair_advance_percent: Decimal::new(30, 0),
    }
}

pub fn app_with_pool(pool: PgPool) -> Router {
    build_router(AppState::with_gateway(pool, test_config(), Arc::new(FakeGateway)))
}

pub fn token_for_user(user_id: Uuid, role: UserRole) -> String {
    let config = JwtConfig::from(&test_config());
    generate_token(user_id, "tester@marina.test", role, &config).unwrap()
}

pub fn token_for(role: UserRole) -> String {
    token_for_user(Uuid::new_v4(), role)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Webhook firmado con el secreto de test
pub fn signed_webhook(payload: &Value) -> Request<Body> {
    let payload = payload.to_string();
    let signature =
        sign_webhook_payload(payload.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap();
    Request::builder()
        .method(Method::POST)
        .uri("/api/payments/webhook")
        .header("stripe-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}
