//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos recibidos en paths y query strings.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::utils::errors::AppError;

lazy_static! {
    /// Teléfono: dígitos con separadores opcionales y prefijo internacional
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9(][0-9 ()\-]{6,20}$").unwrap();
}

/// Extractor JSON que responde 400 ante cuerpos mal formados
/// y ejecuta las reglas de `validator` antes de llegar al handler.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Convertir un id de path a UUID.
/// Un id mal formado se trata como recurso inexistente (404).
pub fn parse_id(value: &str, resource: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::NotFound(format!("{} con id '{}' no encontrado", resource, value)))
}

/// Convertir string `YYYY-MM-DD` a fecha
pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!("Fecha inválida '{}', formato esperado YYYY-MM-DD", value))
    })
}

/// Validar formato de teléfono
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if !PHONE_REGEX.is_match(value.trim()) || !(7..=15).contains(&digits) {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un importe sea positivo
pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un importe no sea negativo
pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar código de moneda ISO 4217 (tres letras)
pub fn validate_currency(value: &str) -> Result<(), ValidationError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut error = ValidationError::new("currency");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert!(parse_id("550e8400-e29b-41d4-a716-446655440000", "Cita").is_ok());
        assert!(matches!(parse_id("not-an-id", "Cita"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert!(matches!(parse_date("2025/01/10"), Err(AppError::BadRequest(_))));
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+34 600 123 456").is_ok());
        assert!(validate_phone("(305) 555-0199").is_ok());
        assert!(validate_phone("+(34) 600 123 456").is_ok());
        assert!(validate_phone("(abc) 555-0199").is_err());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("call me maybe").is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_positive_amount(&Decimal::new(1050, 2)).is_ok());
        assert!(validate_positive_amount(&Decimal::ZERO).is_err());
        assert!(validate_non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative_amount(&Decimal::new(-1, 0)).is_err());
    }

    #[test]
    fn test_validate_currency() {
        assert!(validate_currency("usd").is_ok());
        assert!(validate_currency("EURO").is_err());
        assert!(validate_currency("U5D").is_err());
    }
}
