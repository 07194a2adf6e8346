//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait.

use crate::domain::{
    Booking, BookingId, BookingStatus, DailyPriceEntry, HotelId, Room, RoomId, StayRange,
};
use crate::error::RepoError;

use super::exchange::ExchangeRateProvider;

/// The main repository port for rooms, daily prices and bookings.
#[async_trait::async_trait]
pub trait BookingRepository: ExchangeRateProvider + Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Rooms
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_room(&self, room: Room) -> Result<Room, RepoError>;

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepoError>;

    /// Lists rooms, optionally for a single hotel.
    async fn list_rooms(&self, hotel_id: Option<HotelId>) -> Result<Vec<Room>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Daily prices
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts or replaces the entry for (room, date).
    async fn upsert_daily_price(&self, entry: DailyPriceEntry)
    -> Result<DailyPriceEntry, RepoError>;

    /// Entries whose date falls in `[range.check_in, range.check_out)`, ordered by date.
    async fn daily_prices(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<DailyPriceEntry>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────────

    /// Bookings in a blocking status that overlap `range`.
    async fn active_bookings(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<Booking>, RepoError>;

    /// Inserts a booking after re-validating availability in the same unit of work.
    ///
    /// Returns `RepoError::Domain(BookingConflict | DateUnavailable)` when the
    /// stay is no longer available, and `RepoError::Conflict` on write
    /// contention that may succeed on retry.
    async fn create_booking(&self, booking: Booking) -> Result<Booking, RepoError>;

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, RepoError>;

    async fn list_bookings_for_room(&self, room_id: RoomId) -> Result<Vec<Booking>, RepoError>;

    /// Persists a status change only if the stored status is still `expected`.
    ///
    /// Returns `RepoError::Conflict` if another writer changed it first.
    async fn update_booking_status(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<Booking, RepoError>;
}
