//! Integración con Stripe
//!
//! `PaymentGateway` abstrae las llamadas a la API de PaymentIntents y
//! reembolsos; `StripeClient` es la implementación real sobre `reqwest`.
//! También contiene la verificación de firma de los webhooks.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::payment::ServiceRef;
use crate::utils::errors::AppError;

/// Tolerancia por defecto de la marca de tiempo del webhook (segundos)
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Parámetros para crear un PaymentIntent
#[derive(Debug, Clone)]
pub struct CreateIntentParams {
    pub amount: Decimal,
    pub currency: String,
    pub customer_email: String,
    pub service: ServiceRef,
    pub payment_id: Uuid,
    pub description: String,
}

/// Vista mínima de un PaymentIntent de Stripe
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub client_secret: Option<String>,
    pub last_payment_error: Option<GatewayError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayError {
    pub message: Option<String>,
    pub code: Option<String>,
}

impl GatewayIntent {
    pub fn failure_reason(&self) -> Option<String> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
    }
}

/// Vista mínima de un Refund de Stripe
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub amount: i64,
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, params: CreateIntentParams) -> Result<GatewayIntent, AppError>;

    async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError>;

    /// Reembolsar total (`None`) o parcialmente un intent
    async fn refund(&self, intent_id: &str, amount: Option<Decimal>) -> Result<GatewayRefund, AppError>;
}

/// Convertir un importe a unidades menores (centavos)
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| AppError::BadRequest(format!("Importe fuera de rango: {}", amount)))
}

/// Convertir unidades menores a importe decimal
pub fn from_minor_units(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

/// Cliente HTTP de la API de Stripe
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            http: Client::new(),
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn parse_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::ExternalApi(format!("Respuesta de Stripe inválida: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .map(|b| {
                format!(
                    "{} ({})",
                    b.error.message.unwrap_or_default(),
                    b.error.kind.unwrap_or_default()
                )
            })
            .unwrap_or(body);

        error!("❌ Stripe respondió {}: {}", status, message);
        Err(AppError::ExternalApi(format!("Stripe {}: {}", status, message)))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(&self, params: CreateIntentParams) -> Result<GatewayIntent, AppError> {
        let amount = to_minor_units(params.amount)?;
        let service = params.service;

        let form = vec![
            ("amount", amount.to_string()),
            ("currency", params.currency.to_lowercase()),
            ("receipt_email", params.customer_email),
            ("description", params.description),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[payment_id]", params.payment_id.to_string()),
            ("metadata[service_type]", service.service_type().as_str().to_string()),
            ("metadata[service_id]", service.id().to_string()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", params.payment_id.to_string())
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Error conectando con Stripe: {}", e)))?;

        let intent: GatewayIntent = Self::parse_response(response).await?;
        info!("💳 PaymentIntent {} creado ({} {})", intent.id, amount, intent.currency);
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<GatewayIntent, AppError> {
        let response = self
            .http
            .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Error conectando con Stripe: {}", e)))?;

        Self::parse_response(response).await
    }

    async fn refund(&self, intent_id: &str, amount: Option<Decimal>) -> Result<GatewayRefund, AppError> {
        let mut form = vec![("payment_intent", intent_id.to_string())];
        if let Some(amount) = amount {
            form.push(("amount", to_minor_units(amount)?.to_string()));
        }

        let response = self
            .http
            .post(format!("{}/v1/refunds", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Error conectando con Stripe: {}", e)))?;

        let refund: GatewayRefund = Self::parse_response(response).await?;
        info!("↩️ Reembolso {} emitido para {}", refund.id, intent_id);
        Ok(refund)
    }
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

/// Evento de webhook de Stripe
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Objeto Charge (solo lo necesario para `charge.refunded`)
#[derive(Debug, Deserialize)]
pub struct StripeCharge {
    pub payment_intent: Option<String>,
    pub amount_refunded: i64,
}

type HmacSha256 = Hmac<Sha256>;

/// Verificar la cabecera `Stripe-Signature` (`t=<ts>,v1=<hex>[,v1=<hex>]`)
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), AppError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::BadRequest("Firma de webhook sin marca de tiempo".to_string()))?;
    if signatures.is_empty() {
        return Err(AppError::BadRequest("Firma de webhook sin esquema v1".to_string()));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(AppError::BadRequest("Firma de webhook fuera de tolerancia".to_string()));
    }

    let matches = signatures.iter().any(|expected| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(expected).is_ok()
    });

    if !matches {
        return Err(AppError::BadRequest("Firma de webhook inválida".to_string()));
    }
    Ok(())
}

/// Calcular la firma v1 de un payload (usada por tests y herramientas locales)
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Clave HMAC inválida: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(12999, 2)).unwrap(), 12999);
        assert_eq!(to_minor_units(Decimal::new(5, 0)).unwrap(), 500);
        assert_eq!(from_minor_units(4550), Decimal::new(4550, 2));
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = sign_webhook_payload(payload, SECRET, now).unwrap();
        assert!(verify_webhook_signature(payload, &header, SECRET, now + 10, WEBHOOK_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let now = 1_700_000_000;
        let header = sign_webhook_payload(b"{\"amount\":100}", SECRET, now).unwrap();
        let result = verify_webhook_signature(b"{\"amount\":999}", &header, SECRET, now, WEBHOOK_TOLERANCE_SECS);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_old_timestamp_is_rejected() {
        let payload = b"{}";
        let header = sign_webhook_payload(payload, SECRET, 1_000).unwrap();
        assert!(verify_webhook_signature(payload, &header, SECRET, 1_000 + 301, WEBHOOK_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        assert!(verify_webhook_signature(b"{}", "garbage", SECRET, 0, WEBHOOK_TOLERANCE_SECS).is_err());
        assert!(verify_webhook_signature(b"{}", "t=5", SECRET, 5, WEBHOOK_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn test_parse_event_and_intent() {
        let raw = serde_json::json!({
            "id": "evt_123",
            "type": "payment_intent.payment_failed",
            "data": { "object": {
                "id": "pi_123",
                "status": "requires_payment_method",
                "amount": 2500,
                "currency": "usd",
                "client_secret": null,
                "last_payment_error": { "message": "Your card was declined.", "code": "card_declined" }
            }}
        });
        let event: StripeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event_type, "payment_intent.payment_failed");
        let intent: GatewayIntent = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(intent.failure_reason().as_deref(), Some("Your card was declined."));
    }
}
