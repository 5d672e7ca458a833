use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use signal_relay::{AppError, AppState, Settings};
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> signal_relay::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = Settings::new()?;

    // Initialize logging; RUST_LOG takes precedence over log.level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!(environment = %config.environment, "Configuration loaded successfully");
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let state = web::Data::new(AppState::new(config.clone()));

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    info!(
        "Relay ready to accept connections at ws://{}:{}{}",
        config.server.host, config.server.port, config.server.path
    );

    let ws_path = config.server.path.clone();
    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(signal_relay::cors(&cors_config))
            .app_data(state.clone())
            .configure(|cfg| signal_relay::routes(cfg, &ws_path))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
