pub mod config;
pub mod error;
pub mod relay;
pub mod websocket;

use std::sync::Arc;
use actix_cors::Cors;
use actix_web::{web, HttpResponse};

pub use error::{AppError, RelayError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;
pub use relay::{Connection, Relay, Registry};

/// Health check endpoint handler
/// Returns server status, timestamp and the number of live connections
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "connections": state.relay.connection_count(),
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(config: Settings) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(Relay::new()),
        }
    }
}

/// Registers the health check and the relay endpoint at `ws_path`.
pub fn routes(cfg: &mut web::ServiceConfig, ws_path: &str) {
    cfg.route("/health", web::get().to(health_check))
        .route(ws_path, web::get().to(websocket::websocket_route));
}

/// Builds the CORS middleware from configuration.
pub fn cors(config: &config::CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET"])
    };

    cors.max_age(config.max_age as usize)
}
