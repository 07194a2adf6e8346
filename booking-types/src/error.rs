//! Error types for the booking service.

use chrono::NaiveDate;
use exchange_rates::{CurrencyCode, ExchangeError};

use crate::domain::{BookingId, BookingStatus, RoomId, StayRange};

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        got: CurrencyCode,
    },

    #[error("Invalid date range: check-out {check_out} must be after check-in {check_in}")]
    InvalidDateRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Dates unavailable: {}", join(.dates))]
    DateUnavailable { dates: Vec<NaiveDate> },

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Room is not active: {0}")]
    RoomInactive(RoomId),

    #[error("Stay of {nights} nights is outside the allowed length ({min}..{})", .max.map(|m| m.to_string()).unwrap_or_default())]
    StayLengthOutOfBounds {
        nights: u32,
        min: u32,
        max: Option<u32>,
    },

    #[error("Party of {guests} exceeds room capacity of {max}")]
    OverCapacity { guests: u32, max: u32 },

    #[error("Booking conflict on {}", join(.conflicts))]
    BookingConflict { conflicts: Vec<StayRange> },

    #[error("Exchange rate unavailable for {from} -> {to}")]
    RateUnavailable { from: CurrencyCode, to: CurrencyCode },

    #[error("Cannot move booking from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ExchangeError> for DomainError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::RateNotAvailable(from, to) => DomainError::RateUnavailable { from, to },
            other => DomainError::ValidationError(other.to_string()),
        }
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    /// Write contention; the caller may retry.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Dates unavailable: {}", join(.0))]
    DateUnavailable(Vec<NaiveDate>),

    #[error("Booking conflict on {}", join(.0))]
    BookingConflict(Vec<StayRange>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    UnprocessableEntity(String),

    #[error("Rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::DateUnavailable { dates } => AppError::DateUnavailable(dates),
            DomainError::BookingConflict { conflicts } => AppError::BookingConflict(conflicts),
            DomainError::RoomNotFound(_) | DomainError::BookingNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            DomainError::RateUnavailable { .. } => AppError::RateUnavailable(err.to_string()),
            DomainError::RoomInactive(_)
            | DomainError::StayLengthOutOfBounds { .. }
            | DomainError::OverCapacity { .. }
            | DomainError::InvalidStatusTransition { .. } => {
                AppError::UnprocessableEntity(err.to_string())
            }
            DomainError::ValidationError(msg) => AppError::BadRequest(msg),
            DomainError::NegativeAmount
            | DomainError::CurrencyMismatch { .. }
            | DomainError::InvalidDateRange { .. } => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
        }
    }
}
