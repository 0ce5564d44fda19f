//! Application configuration loaded from environment variables.
//!
//! Four values are required to talk to the hosted services: the table API key
//! and base id, and the image cloud name and unsigned upload preset. Mail,
//! server, session and bootstrap-admin settings are optional and fall back to
//! sensible defaults. A `.env` file is loaded by `main` before this runs.

use crate::errors::{Error, Result};
use std::{fmt, path::PathBuf};

/// A credential that must never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a credential.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw credential for use in a request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Which record store backs the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// The hosted table service (production)
    Airtable,
    /// In-process records, lost on restart (local demos)
    Memory,
}

/// Optional mail delivery settings.
#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    /// Same-origin backend endpoint accepting `{to, subject, html}`
    pub backend_url: Option<String>,
    /// Key for the Brevo transactional-email API
    pub brevo_api_key: Option<Secret>,
    /// Sender address used by the transactional API
    pub sender_email: String,
    /// Sender display name
    pub sender_name: String,
}

/// First admin account created on startup when none exists.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    /// Login email
    pub email: String,
    /// Initial password
    pub password: Secret,
    /// Display name
    pub name: String,
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Hosted table service API key
    pub airtable_api_key: Secret,
    /// Hosted table service base identifier
    pub airtable_base_id: String,
    /// Image service cloud name
    pub cloudinary_cloud_name: String,
    /// Image service unsigned upload preset
    pub cloudinary_upload_preset: String,
    /// Optional folder uploaded photos land in
    pub cloudinary_folder: Option<String>,
    /// Mail delivery settings
    pub mail: MailSettings,
    /// Address the HTTP server binds to
    pub server_host: String,
    /// Port the HTTP server binds to
    pub server_port: u16,
    /// Public dashboard URL, used in emails
    pub app_base_url: String,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,
    /// Bootstrap admin, if configured
    pub admin_seed: Option<AdminSeed>,
    /// Record store selection
    pub store_backend: StoreBackend,
    /// Path of the pricing TOML file
    pub pricing_path: PathBuf,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// Returns `Error::Config` listing every missing required variable, or the
    /// first malformed optional one.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = [
            "AIRTABLE_API_KEY",
            "AIRTABLE_BASE_ID",
            "CLOUDINARY_CLOUD_NAME",
            "CLOUDINARY_UPLOAD_PRESET",
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config {
                message: format!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                ),
            });
        }

        let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let server_port = match get("SERVER_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| Error::Config {
                message: format!("Invalid SERVER_PORT '{raw}': {e}"),
            })?,
            None => 8080,
        };
        let app_base_url = get("APP_BASE_URL")
            .unwrap_or_else(|| format!("http://{server_host}:{server_port}"))
            .trim_end_matches('/')
            .to_string();
        let session_ttl_hours = match get("SESSION_TTL_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(Error::Config {
                        message: format!("Invalid SESSION_TTL_HOURS '{raw}'"),
                    });
                }
            },
            None => 12,
        };

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("airtable") => StoreBackend::Airtable,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(Error::Config {
                    message: format!(
                        "Invalid STORE_BACKEND '{other}' (expected 'airtable' or 'memory')"
                    ),
                });
            }
        };

        let admin_seed = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email,
                password: Secret::new(password),
                name: get("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config {
                    message: "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
                });
            }
        };

        let mail = MailSettings {
            backend_url: get("MAIL_BACKEND_URL"),
            brevo_api_key: get("BREVO_API_KEY").map(Secret::new),
            sender_email: get("MAIL_SENDER_EMAIL")
                .unwrap_or_else(|| "noreply@shiplink.example".to_string()),
            sender_name: get("MAIL_SENDER_NAME").unwrap_or_else(|| "ShipLink".to_string()),
        };

        let config = Self {
            airtable_api_key: Secret::new(get("AIRTABLE_API_KEY").unwrap_or_default()),
            airtable_base_id: get("AIRTABLE_BASE_ID").unwrap_or_default(),
            cloudinary_cloud_name: get("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            cloudinary_upload_preset: get("CLOUDINARY_UPLOAD_PRESET").unwrap_or_default(),
            cloudinary_folder: get("CLOUDINARY_FOLDER"),
            mail,
            server_host,
            server_port,
            app_base_url,
            session_ttl_hours,
            admin_seed,
            store_backend,
            pricing_path: get("CONFIG_PATH").map_or_else(|| PathBuf::from("config.toml"), PathBuf::from),
        };

        tracing::info!(
            store = ?config.store_backend,
            mail_backend = config.mail.backend_url.is_some(),
            mail_brevo = config.mail.brevo_api_key.is_some(),
            "Application configuration loaded"
        );
        Ok(config)
    }

    /// `host:port` string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
