//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL, junto con sus máquinas de estado.

pub mod appointment;
pub mod boat_repair;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;
