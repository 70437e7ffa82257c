//! JSON HTTP API.
//!
//! Handlers are thin: they pull ids and bodies out of the request, call one
//! core operation, and wrap the result in `{success: true, ...}`. Failures
//! become responses through the `IntoResponse` impl in [`error`].

/// Error to response mapping
pub mod error;

mod donations;
mod help_requests;
mod products;
mod purchases;
mod users;

use crate::{config::settings::Settings, errors::Result, notify::EventSender};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Where core operations publish domain events
    pub events: EventSender,
    /// Loaded service settings
    pub settings: Arc<Settings>,
}

/// Builds the API router over the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/notifications", patch(users::link_notifications))
        .route("/users/:id/history", get(users::purchase_history))
        .route("/users/:id/reviews", get(users::reviews))
        .route("/users/:id/donations", get(users::donations))
        .route("/users/:id/help-requests", get(users::help_requests))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/top/rating", get(products::top_rated))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/comments", post(products::add_comment))
        .route("/purchase", post(purchases::purchase))
        .route("/donate", post(donations::donate))
        .route("/donations/stats", get(donations::stats))
        .route("/help-request", post(help_requests::submit))
        .route("/help-requests", get(help_requests::list))
        .route("/help-requests/:id", patch(help_requests::decide))
        .route("/fund", get(help_requests::fund))
        .layer(cors)
        .with_state(state)
}

/// Serves the API until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let address = format!("0.0.0.0:{}", state.settings.server.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("HTTP API running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP API shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
