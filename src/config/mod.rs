/// Service credentials and server settings from environment variables
pub mod app;

/// Shipping rate configuration loading from config.toml
pub mod pricing;

pub use app::{AdminSeed, AppConfig, MailSettings, Secret, StoreBackend};
pub use pricing::Pricing;
