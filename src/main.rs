use dotenvy::dotenv;
use onion_procure::{
    api::{self, AppState},
    config::{app::AppConfig, database, masters},
    core::user,
    errors::Result,
    tally::TallyClient,
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Service configuration
    let app_config = AppConfig::from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(bind_addr = %app_config.bind_addr, tally_url = %app_config.tally_url, "Configuration loaded");

    // 4. Database and schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Master data and first admin
    let masters_config = masters::load_or_builtin(&app_config.config_path)?;
    masters::seed_masters(&db, &masters_config)
        .await
        .inspect(|count| info!("Seeded {} master data rows", count))
        .inspect_err(|e| error!("Failed to seed master data: {}", e))?;

    let admin_email = env::var("ADMIN_EMAIL").ok();
    let admin_password = env::var("ADMIN_PASSWORD").ok();
    if let Some(admin) =
        user::bootstrap_admin(&db, admin_email.as_deref(), admin_password.as_deref()).await?
    {
        info!("Created initial admin {}", admin.email);
    }

    // 6. Serve
    let state = AppState {
        db,
        tally: Arc::new(TallyClient::new(app_config.tally_url.clone())),
        config: Arc::new(app_config),
    };
    let listener = tokio::net::TcpListener::bind(state.config.bind_addr).await?;
    info!("Listening on {}", state.config.bind_addr);

    axum::serve(listener, api::build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
