pub mod clock;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod media;
pub mod memory;
pub mod models;
pub mod plugin;
pub mod policy;
pub mod repo;
pub mod service;

pub use plugin::StoriesPlugin;

#[cfg(test)]
mod tests;
