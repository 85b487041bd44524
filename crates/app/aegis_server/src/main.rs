//! Aegis identity service server binary.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use aegis_api::AppState;
use aegis_api::config::ApiConfig;
use aegis_core::cache::memory::MemoryCache;
use aegis_core::clock::SystemClock;
use aegis_core::store::postgres::PgCredentialStore;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "aegis_server", about = "Aegis identity service")]
struct Args {
    /// Port to listen on. Overrides the port in BIND_ADDR when set.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/aegis"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aegis_api=debug,aegis_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.database_url = args.database_url;
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("127.0.0.1");
        config.bind_addr = format!("{host}:{port}");
    }

    info!(bind_addr = %config.bind_addr, "starting aegis_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    aegis_core::migrate::migrate(&pool).await?;

    let state = AppState::new(
        Arc::new(PgCredentialStore::new(pool)),
        Arc::new(MemoryCache::new(Arc::new(SystemClock))),
        Arc::new(SystemClock),
        config.clone(),
    );

    let app = aegis_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
