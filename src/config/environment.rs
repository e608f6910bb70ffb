//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    // Stripe
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub default_currency: String,
    /// Porcentaje del presupuesto cobrado como anticipo de una reparación
    pub repair_advance_percent: Decimal,
}

/// Leer una variable opcional con valor por defecto
fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Leer y parsear una variable opcional con valor por defecto
fn parse_var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value", name)),
        Err(_) => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Cargar configuración desde el entorno (después de `dotenvy`)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: var_or("ENVIRONMENT", "development"),
            port: parse_var_or("PORT", 3000)?,
            host: var_or("HOST", "0.0.0.0"),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiration: parse_var_or("JWT_EXPIRATION", 86_400)?,
            cors_origins: var_or("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_requests: parse_var_or("RATE_LIMIT_REQUESTS", 20)?,
            rate_limit_window: parse_var_or("RATE_LIMIT_WINDOW", 60)?,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .context("STRIPE_SECRET_KEY must be set")?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET must be set")?,
            stripe_api_base: var_or("STRIPE_API_BASE", "https://api.stripe.com"),
            default_currency: var_or("DEFAULT_CURRENCY", "usd").to_lowercase(),
            repair_advance_percent: parse_var_or("REPAIR_ADVANCE_PERCENT", Decimal::new(30, 0))?,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// CORS abierto cuando no hay orígenes concretos configurados
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_or_uses_default_when_missing() {
        let value: u32 = parse_var_or("MARINA_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_allows_any_origin() {
        let mut config = EnvironmentConfig {
            environment: "test".into(),
            port: 3000,
            host: "127.0.0.1".into(),
            jwt_secret: "secret".into(),
            jwt_expiration: 60,
            cors_origins: vec!["*".into()],
            rate_limit_requests: 10,
            rate_limit_window: 60,
            stripe_secret_key: "sk_test".into(),
            stripe_webhook_secret: "whsec_test".into(),
            stripe_api_base: "http://localhost".into(),
            default_currency: "usd".into(),
            repair_advance_percent: Decimal::new(30, 0),
        };
        assert!(config.allows_any_origin());
        config.cors_origins = vec!["https://marina.example".into()];
        assert!(!config.allows_any_origin());
        assert_eq!(config.server_url(), "127.0.0.1:3000");
    }
}
