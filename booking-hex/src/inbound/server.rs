//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use booking_types::BookingRepository;

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::BookingService;

/// HTTP Server for the Booking API.
pub struct HttpServer<R: BookingRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: BookingRepository> HttpServer<R> {
    /// Creates a new HTTP server with the default limit of 100 requests per minute.
    pub fn new(service: BookingService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()),
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: BookingService<R>, requests_per_minute: u32) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Uses the globally set MeterProvider
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .route(
                "/api/rooms",
                post(handlers::create_room::<R>).get(handlers::list_rooms::<R>),
            )
            .route("/api/rooms/{id}", get(handlers::get_room::<R>))
            .route(
                "/api/rooms/{id}/prices",
                put(handlers::set_daily_price::<R>).get(handlers::price_calendar::<R>),
            )
            .route("/api/rooms/{id}/quote", get(handlers::quote::<R>))
            .route(
                "/api/rooms/{id}/availability",
                get(handlers::check_availability::<R>),
            )
            .route(
                "/api/rooms/{id}/bookings",
                get(handlers::list_room_bookings::<R>),
            )
            .route(
                "/api/hotels/{id}/available-rooms",
                get(handlers::search_available_rooms::<R>),
            )
            .route(
                "/api/exchange-rates",
                post(handlers::record_exchange_rate::<R>),
            )
            .route(
                "/api/exchange-rates/latest",
                get(handlers::latest_exchange_rate::<R>),
            )
            .route("/api/bookings", post(handlers::create_booking::<R>))
            .route("/api/bookings/{id}", get(handlers::get_booking::<R>))
            .route(
                "/api/bookings/{id}/status",
                post(handlers::update_booking_status::<R>),
            )
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
