pub mod auth;
pub mod communication;
pub mod health;
pub mod metrics;
pub mod users;
