pub mod health;
pub mod images;
pub mod metrics_handler;
