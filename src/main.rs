use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use campusfeed::config::{Cli, Config};
use campusfeed::media::LocalMediaStore;
use campusfeed::state::AppState;
use campusfeed::{db, routes, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    if cli.seed_demo {
        let mut conn = pool.get()?;
        let report = seed::seed_demo(&mut conn, config.feed.limits(), &mut rand::thread_rng())?;
        tracing::info!(users = report.users, posts = report.posts, "demo seed finished");
    }

    let media = LocalMediaStore::new(config.uploads_path())?;
    tracing::info!("Uploads directory: {}", config.uploads_path().display());

    let state = AppState {
        db: pool,
        config: config.clone(),
        media: Arc::new(media),
    };
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
