//! Storage module for database and configuration.

pub mod config;
pub mod database;
pub mod schema;

pub use config::{AppConfig, ConfigError, DatabaseSettings, ServerSettings, StatsSettings};
pub use database::{Database, DatabaseError};
