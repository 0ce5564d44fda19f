use shiplink::{
    config::{AppConfig, StoreBackend, pricing::load_pricing},
    core::accounts,
    errors::Result,
    services::{CloudinaryUploader, Mailer},
    store::{AirtableStore, MemoryStore, RecordStore, Records},
    web::{self, AppState, SessionStore},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal: variables can be set externally
    if dotenv().is_err() {
        info!("No .env file found, using the process environment.");
    }

    // 3. Load configuration and pricing
    let config = AppConfig::from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let pricing = load_pricing(&config.pricing_path)
        .inspect_err(|e| error!("Failed to load pricing: {}", e))?;

    // 4. Pick the record store
    let store: Arc<dyn RecordStore> = match config.store_backend {
        StoreBackend::Airtable => Arc::new(AirtableStore::new(
            config.airtable_api_key.clone(),
            config.airtable_base_id.clone(),
        )?),
        StoreBackend::Memory => {
            warn!("Using the in-memory store: records are lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };
    let records = Records::new(store);

    // 5. Seed the first admin (if configured and missing)
    if let Some(seed) = &config.admin_seed {
        accounts::seed_admin(&records, seed)
            .await
            .inspect_err(|e| error!("Failed to seed admin account: {}", e))?;
    }

    // 6. Hosted services
    let mailer = Mailer::from_settings(&config.mail)?;
    let photos = CloudinaryUploader::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_upload_preset.clone(),
        config.cloudinary_folder.clone(),
    )?;

    // 7. Serve until Ctrl-C
    let state = AppState {
        records,
        pricing,
        mailer,
        photos: Arc::new(photos),
        sessions: SessionStore::new(config.session_ttl_hours),
        base_url: config.app_base_url.clone(),
    };
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", address, e))?;
    info!(%address, base_url = %config.app_base_url, "ShipLink dashboard listening");

    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
    info!("Shutdown signal received.");
}
