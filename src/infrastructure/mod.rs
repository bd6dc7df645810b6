// Infrastructure layer - Configuration and catalogue adapters
pub mod config;
pub mod static_catalogue;
