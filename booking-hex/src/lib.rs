//! # Booking Hex
//!
//! Application service layer and HTTP adapter for the booking service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (quotes, availability, booking commits)
//! - `inbound/` - HTTP adapter (Axum server, rate limiting)
//! - `openapi/` - OpenAPI document served by the adapter
//!
//! The service is generic over `R: BookingRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::{BookingService, PricingPolicy};
pub use exchange_rates::FallbackPolicy;
