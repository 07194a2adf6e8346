//! # Booking Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Create the booking service with its pricing policy
//! - Start the HTTP server

mod config;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_hex::{BookingService, FallbackPolicy, PricingPolicy, inbound::HttpServer};
use booking_repo::build_repo;

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("booking-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;

    // OpenTelemetry export only when a collector is configured
    let otel = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => Some(init_tracer(endpoint)?),
        None => None,
    };
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking_app=debug,booking_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!("Starting booking server on port {}", config.port);
    tracing::info!(
        fx_fallback = config.fx_fallback_enabled,
        max_attempts = config.booking_max_attempts,
        rate_limit = config.rate_limit_per_minute,
        "Pricing and limits configured"
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    let policy = PricingPolicy {
        fallback: if config.fx_fallback_enabled {
            FallbackPolicy::DefaultTable
        } else {
            FallbackPolicy::Disabled
        },
        max_booking_attempts: config.booking_max_attempts,
    };
    let service = BookingService::with_policy(repo, policy);

    let server = HttpServer::with_rate_limit(service, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    Ok(())
}
