//! Services module
//!
//! Este módulo contiene la lógica de negocio que no pertenece a un único
//! repositorio: reglas de disponibilidad de citas e integración con Stripe.

pub mod scheduling_service;
pub mod stripe_service;

pub use scheduling_service::*;
pub use stripe_service::{PaymentGateway, StripeClient};
