//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use utoipa::OpenApi;

use booking_types::{
    AppError, BookingId, BookingRepository, CalendarQuery, CreateBookingRequest,
    CreateRoomRequest, HealthResponse, HotelId, LatestRateQuery, RecordExchangeRateRequest,
    RoomId, RoomListQuery, SetDailyPriceRequest, StayQuery, UpdateBookingStatusRequest,
};

use crate::BookingService;
use crate::openapi::ApiDoc;

/// Application state shared across handlers.
pub struct AppState<R: BookingRepository> {
    pub service: BookingService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let (status, detail) = match self.0 {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            AppError::DateUnavailable(dates) => {
                (StatusCode::CONFLICT, Some(("dates", json!(dates))))
            }
            AppError::BookingConflict(conflicts) => {
                (StatusCode::CONFLICT, Some(("conflicts", json!(conflicts))))
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, None),
            AppError::UnprocessableEntity(_) => (StatusCode::UNPROCESSABLE_ENTITY, None),
            AppError::RateUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, None),
            AppError::Internal(_) => {
                tracing::error!(error = %message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let mut body = json!({
            "error": message,
            "code": status.as_u16()
        });
        if let Some((key, value)) = detail {
            body[key] = value;
        }

        (status, Json(body)).into_response()
    }
}

fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)).into())
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ─────────────────────────────────────────────────────────────────────────────
// Rooms
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all, fields(hotel_id = %req.hotel_id))]
pub async fn create_room<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.service.create_room(req).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// List rooms, optionally for one hotel.
#[tracing::instrument(skip(state))]
pub async fn list_rooms<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<RoomListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.service.list_rooms(query.hotel_id).await?;
    Ok(Json(rooms))
}

#[tracing::instrument(skip(state), fields(room_id = %id))]
pub async fn get_room<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let room = state.service.get_room(room_id).await?;
    Ok(Json(room))
}

/// Set, convert or block the price of one date.
#[tracing::instrument(skip(state, req), fields(room_id = %id, date = %req.date))]
pub async fn set_daily_price<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<SetDailyPriceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let entry = state.service.set_daily_price(room_id, req).await?;
    Ok(Json(entry))
}

#[tracing::instrument(skip(state, query), fields(room_id = %id))]
pub async fn price_calendar<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let calendar = state.service.price_calendar(room_id, query).await?;
    Ok(Json(calendar))
}

// ─────────────────────────────────────────────────────────────────────────────
// Quotes & availability
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, query), fields(room_id = %id, check_in = %query.check_in, check_out = %query.check_out))]
pub async fn quote<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(query): Query<StayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let quote = state
        .service
        .quote(room_id, query.check_in, query.check_out, query.currency)
        .await?;
    Ok(Json(quote))
}

#[tracing::instrument(skip(state, query), fields(room_id = %id, check_in = %query.check_in, check_out = %query.check_out))]
pub async fn check_availability<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(query): Query<StayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let decision = state
        .service
        .check_availability(room_id, query.check_in, query.check_out)
        .await?;
    Ok(Json(decision))
}

#[tracing::instrument(skip(state, query), fields(hotel_id = %id))]
pub async fn search_available_rooms<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Query(query): Query<StayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hotel_id: HotelId = parse_id(&id, "hotel")?;
    let rooms = state
        .service
        .search_available_rooms(hotel_id, query.check_in, query.check_out, query.currency)
        .await?;
    Ok(Json(rooms))
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange rates
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all, fields(from = %req.from, to = %req.to))]
pub async fn record_exchange_rate<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<RecordExchangeRateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rate = state.service.record_exchange_rate(req).await?;
    Ok((StatusCode::CREATED, Json(rate)))
}

#[tracing::instrument(skip(state))]
pub async fn latest_exchange_rate<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<LatestRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rate = state
        .service
        .latest_exchange_rate(query.from, query.to)
        .await?;
    Ok(Json(rate))
}

// ─────────────────────────────────────────────────────────────────────────────
// Bookings
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all, fields(room_id = %req.room_id, check_in = %req.check_in, check_out = %req.check_out))]
pub async fn create_booking<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.service.create_booking(req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[tracing::instrument(skip(state), fields(booking_id = %id))]
pub async fn get_booking<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let booking_id: BookingId = parse_id(&id, "booking")?;
    let booking = state.service.get_booking(booking_id).await?;
    Ok(Json(booking))
}

#[tracing::instrument(skip(state), fields(room_id = %id))]
pub async fn list_room_bookings<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let bookings = state.service.list_room_bookings(room_id).await?;
    Ok(Json(bookings))
}

#[tracing::instrument(skip(state, req), fields(booking_id = %id, status = %req.status))]
pub async fn update_booking_status<R: BookingRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking_id: BookingId = parse_id(&id, "booking")?;
    let booking = state
        .service
        .update_booking_status(booking_id, req.status)
        .await?;
    Ok(Json(booking))
}
