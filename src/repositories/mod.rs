pub mod appointment_repository;
pub mod boat_repair_repository;
pub mod order_repository;
pub mod payment_repository;
pub mod product_repository;
pub mod user_repository;
