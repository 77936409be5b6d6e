//! Web application router and middleware setup.

use crate::error::{Result, SystemError};
use crate::web::config::WebConfig;
use crate::web::handlers;
use crate::web::state::AppState;
use crate::web::websocket;
use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, state: AppState) -> Result<Router> {
    let mut app = Router::new()
        // Actuator routes
        .route("/loiter", get(handlers::loiter))
        .route("/rotate-right", get(handlers::rotate_right))
        .route("/rotate-left", get(handlers::rotate_left))
        .route("/status", get(handlers::status))
        .route("/api/health", get(handlers::health_check))
        // WebSocket route
        .route("/sensor", get(websocket::sensor_handler))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(cors_layer(config)?);
    }

    app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    Ok(app)
}

fn cors_layer(config: &WebConfig) -> Result<CorsLayer> {
    let Some(origin) = &config.cors_origin else {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    };

    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| SystemError::config_error(format!("Invalid CORS origin {:?}: {}", origin, e)))?;
    info!("CORS restricted to {:?}", origin);

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}
