/// Service settings read from the environment
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Master data seeding from config.toml
pub mod masters;
