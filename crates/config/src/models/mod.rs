pub mod app_config;
pub mod database;
pub mod observability;

pub use app_config::*;
pub use database::*;
pub use observability::*;
