pub mod follows;
pub mod shared;
pub mod stories;
