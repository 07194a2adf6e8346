//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use booking_types::domain::{FeeLine, TaxLine};
use booking_types::{
    AvailabilityDecision, AvailableRoom, Booking, BookingId, BookingSource, BookingStatus,
    BookingTotals, CalendarDay, CalendarQuery, Conflict, CreateBookingRequest,
    CreateRoomRequest, CurrencyCode, DailyPriceEntry, ExchangeRate, Fee, GuestDetails,
    HealthResponse, HotelId, LatestRateQuery, NightlyPrice, PriceCalendarResponse, PriceSource,
    Quote, RateSource, RecordExchangeRateRequest, ResolvedRate, Room, RoomId, RoomListQuery,
    SetDailyPriceRequest, StayQuery, StayRange, Tax, UpdateBookingStatusRequest,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() {}

/// Create a room
#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 400, description = "Invalid room attributes")
    )
)]
async fn create_room() {}

/// List rooms
#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "rooms",
    params(RoomListQuery),
    responses(
        (status = 200, description = "Rooms", body = Vec<Room>)
    )
)]
async fn list_rooms() {}

/// Get a room by ID
#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    tag = "rooms",
    params(
        ("id" = RoomId, Path, description = "Room ID (UUID)")
    ),
    responses(
        (status = 200, description = "Room details", body = Room),
        (status = 404, description = "Room not found")
    )
)]
async fn get_room() {}

/// Set, convert or block the price of one date
#[utoipa::path(
    put,
    path = "/api/rooms/{id}/prices",
    tag = "prices",
    request_body = SetDailyPriceRequest,
    params(
        ("id" = RoomId, Path, description = "Room ID (UUID)")
    ),
    responses(
        (status = 200, description = "Stored daily price", body = DailyPriceEntry),
        (status = 400, description = "Invalid price"),
        (status = 404, description = "Room not found"),
        (status = 503, description = "No exchange rate for the local currency")
    )
)]
async fn set_daily_price() {}

/// Price calendar for an inclusive date range
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/prices",
    tag = "prices",
    params(
        ("id" = RoomId, Path, description = "Room ID (UUID)"),
        CalendarQuery
    ),
    responses(
        (status = 200, description = "One row per day", body = PriceCalendarResponse),
        (status = 400, description = "Invalid or too long range"),
        (status = 404, description = "Room not found")
    )
)]
async fn price_calendar() {}

/// Quote a stay
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/quote",
    tag = "quotes",
    params(
        ("id" = RoomId, Path, description = "Room ID (UUID)"),
        StayQuery
    ),
    responses(
        (status = 200, description = "Price breakdown", body = Quote),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "One or more nights are blocked"),
        (status = 422, description = "Room inactive or stay length not allowed"),
        (status = 503, description = "Exchange rate unavailable")
    )
)]
async fn quote() {}

/// Check whether a stay can be booked
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/availability",
    tag = "quotes",
    params(
        ("id" = RoomId, Path, description = "Room ID (UUID)"),
        StayQuery
    ),
    responses(
        (status = 200, description = "Availability decision", body = AvailabilityDecision),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Room not found")
    )
)]
async fn check_availability() {}

/// Bookings of a room
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/bookings",
    tag = "bookings",
    params(
        ("id" = RoomId, Path, description = "Room ID (UUID)")
    ),
    responses(
        (status = 200, description = "Bookings", body = Vec<Booking>),
        (status = 404, description = "Room not found")
    )
)]
async fn list_room_bookings() {}

/// Rooms of a hotel available for a stay
#[utoipa::path(
    get,
    path = "/api/hotels/{id}/available-rooms",
    tag = "quotes",
    params(
        ("id" = HotelId, Path, description = "Hotel ID (UUID)"),
        StayQuery
    ),
    responses(
        (status = 200, description = "Available rooms with quotes", body = Vec<AvailableRoom>),
        (status = 400, description = "Invalid date range")
    )
)]
async fn search_available_rooms() {}

/// Record an exchange rate
#[utoipa::path(
    post,
    path = "/api/exchange-rates",
    tag = "exchange-rates",
    request_body = RecordExchangeRateRequest,
    responses(
        (status = 201, description = "Rate recorded", body = ExchangeRate),
        (status = 400, description = "Invalid rate")
    )
)]
async fn record_exchange_rate() {}

/// Resolve the current rate for a pair
#[utoipa::path(
    get,
    path = "/api/exchange-rates/latest",
    tag = "exchange-rates",
    params(LatestRateQuery),
    responses(
        (status = 200, description = "Resolved rate and its source", body = ResolvedRate),
        (status = 503, description = "No rate and fallback disabled")
    )
)]
async fn latest_exchange_rate() {}

/// Book a room
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = Booking),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Dates unavailable or booking conflict"),
        (status = 422, description = "Room inactive, stay length or capacity not allowed")
    )
)]
async fn create_booking() {}

/// Get a booking by ID
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = BookingId, Path, description = "Booking ID (UUID)")
    ),
    responses(
        (status = 200, description = "Booking details", body = Booking),
        (status = 404, description = "Booking not found")
    )
)]
async fn get_booking() {}

/// Move a booking along its lifecycle
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/status",
    tag = "bookings",
    request_body = UpdateBookingStatusRequest,
    params(
        ("id" = BookingId, Path, description = "Booking ID (UUID)")
    ),
    responses(
        (status = 200, description = "Updated booking", body = Booking),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking changed concurrently"),
        (status = 422, description = "Transition not allowed")
    )
)]
async fn update_booking_status() {}

/// OpenAPI documentation for the Booking API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Room Booking Service API",
        version = "1.0.0",
        description = "Calendar-driven room pricing, availability and bookings.\n\nDates are `YYYY-MM-DD`, money values are decimal strings and currencies are ISO-4217 codes. Requests are rate limited per `X-Client-Id` header.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_room,
        list_rooms,
        get_room,
        set_daily_price,
        price_calendar,
        quote,
        check_availability,
        list_room_bookings,
        search_available_rooms,
        record_exchange_rate,
        latest_exchange_rate,
        create_booking,
        get_booking,
        update_booking_status,
    ),
    components(
        schemas(
            HealthResponse,
            CreateRoomRequest,
            Room,
            Fee,
            Tax,
            HotelId,
            RoomId,
            BookingId,
            CurrencyCode,
            SetDailyPriceRequest,
            DailyPriceEntry,
            PriceSource,
            PriceCalendarResponse,
            CalendarDay,
            Quote,
            NightlyPrice,
            FeeLine,
            TaxLine,
            StayRange,
            AvailabilityDecision,
            Conflict,
            AvailableRoom,
            RecordExchangeRateRequest,
            ExchangeRate,
            ResolvedRate,
            RateSource,
            CreateBookingRequest,
            UpdateBookingStatusRequest,
            Booking,
            BookingStatus,
            BookingSource,
            BookingTotals,
            GuestDetails,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room administration"),
        (name = "prices", description = "Daily price overrides and calendars"),
        (name = "quotes", description = "Quotes, availability and room search"),
        (name = "exchange-rates", description = "Exchange rate records"),
        (name = "bookings", description = "Booking lifecycle"),
    )
)]
pub struct ApiDoc;
