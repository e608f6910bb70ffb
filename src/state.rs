//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::services::stripe_service::{PaymentGateway, StripeClient};
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub rate_limit: RateLimitState,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Estado de producción con el cliente real de Stripe
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        let stripe = StripeClient::new(config.stripe_secret_key.clone(), config.stripe_api_base.clone());
        Self::with_gateway(pool, config, Arc::new(stripe))
    }

    /// Estado con una pasarela de pagos concreta
    pub fn with_gateway(pool: PgPool, config: EnvironmentConfig, payments: Arc<dyn PaymentGateway>) -> Self {
        let rate_limit = RateLimitState::new(config.rate_limit_requests, config.rate_limit_window);
        Self {
            pool,
            config,
            rate_limit,
            payments,
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::from(&self.config)
    }
}
