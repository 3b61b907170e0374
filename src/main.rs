use std::process;
use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};

use labops::{
    create_router,
    database::{create_database_pool, ensure_schema},
    services::{
        IdPrefixes, InventoryService, LocalAssetStore, LogMailer, ServiceSettings,
    },
    store::{DocumentStore, PgDocumentStore},
    utils::SystemClock,
    AppState, Config,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = create_database_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(db));
    let service = InventoryService::new(store.clone())
        .with_settings(ServiceSettings {
            lab_offset: config.lab_offset,
            approval_email: config.approval_email.clone(),
            public_base_url: config.public_base_url.clone(),
            prefixes: IdPrefixes {
                item: config.item_id_prefix.clone(),
                plasmid: config.plasmid_id_prefix.clone(),
            },
        })
        .with_clock(Arc::new(SystemClock))
        .with_assets(Arc::new(LocalAssetStore::new(&config.upload_dir, "/uploads")))
        .with_mailer(Arc::new(LogMailer));

    // Build the application router
    let state = AppState::new(service, store, &config.jwt_secret);
    let app = create_router(state, &config.upload_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("labops server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
