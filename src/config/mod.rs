/// Database configuration and connection management
pub mod database;

/// Admin identity configuration from environment variables
pub mod admins;

/// Service settings loading from config.toml
pub mod settings;
