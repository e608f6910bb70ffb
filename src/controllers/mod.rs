pub mod appointment_controller;
pub mod auth_controller;
pub mod boat_repair_controller;
pub mod order_controller;
pub mod payment_controller;
pub mod product_controller;
