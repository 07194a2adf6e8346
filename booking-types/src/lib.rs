//! # Booking Types
//!
//! Domain types, pricing rules and port traits for the hotel booking service.
//! This crate has no IO dependencies - only data structures, pure
//! computations and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Rooms, daily prices, quotes, availability and bookings
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AvailabilityDecision, Booking, BookingDraft, BookingId, BookingSource, BookingStatus,
    BookingTotals, CalendarDay, Conflict, DailyPriceEntry, Fee, GuestDetails, HotelId, MAX_OCCUPANCY,
    MAX_STAY_NIGHTS, Money, NightlyPrice, PriceSource, Quote, Room, RoomId, StayRange, Tax,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use exchange_rates::{CurrencyCode, ExchangeError, ExchangeRate, RateSource, ResolvedRate};
pub use ports::{BookingRepository, ExchangeRateProvider};
