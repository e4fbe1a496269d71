//! Configuration management

pub mod app;

pub use app::{AppConfig, ServiceSettings, StorageSettings};
