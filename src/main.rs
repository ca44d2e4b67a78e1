use actix_web::{App, HttpServer};
use anyhow::Context;
use billcore::config::{Config, LogFormat, StorageBackend};
use billcore::middleware::RequestId;
use billcore::AppState;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    init_tracing(&config);

    tracing::info!(
        env = %config.app.env,
        storage = %config.billing.storage_backend,
        bind_address = %config.server.bind_address(),
        "Starting billing service"
    );

    let state = match config.billing.storage_backend {
        StorageBackend::Memory => AppState::in_memory(config.billing.clone()),
        StorageBackend::MySql => {
            let pool = config
                .database
                .create_pool()
                .await
                .context("Failed to create database pool")?;

            tracing::info!(
                max_connections = config.database.max_connections,
                "Database pool initialized"
            );

            AppState::mysql(pool, config.billing.clone())
                .await
                .context("Failed to initialise MySQL storage")?
        }
    };

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await.context("Server terminated with an error")
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("billcore={},actix_web=info", config.app.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    match config.app.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
