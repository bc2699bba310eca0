pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod plugin;
pub mod repo;
pub mod service;

pub use plugin::FollowsPlugin;
