//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::NaiveDate;
use exchange_rates::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    BookingSource, BookingStatus, CalendarDay, Fee, GuestDetails, HotelId, NewRoom, Quote, Room,
    RoomId, Tax,
};

fn default_currency() -> CurrencyCode {
    CurrencyCode::USD
}

fn default_min_stay() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Room DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a new room.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    pub hotel_id: HotelId,
    #[schema(example = "Ocean View 101")]
    pub name: String,
    #[schema(example = "deluxe")]
    pub room_type: String,
    #[schema(example = 2)]
    pub max_occupancy: u32,
    #[schema(value_type = String, example = "100.00")]
    pub base_price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: CurrencyCode,
    #[serde(default = "default_min_stay")]
    pub min_stay: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stay: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub taxes: Vec<Tax>,
}

impl From<CreateRoomRequest> for NewRoom {
    fn from(req: CreateRoomRequest) -> Self {
        NewRoom {
            hotel_id: req.hotel_id,
            name: req.name,
            room_type: req.room_type,
            max_occupancy: req.max_occupancy,
            base_price: req.base_price,
            currency: req.currency,
            min_stay: req.min_stay,
            max_stay: req.max_stay,
            is_active: req.is_active,
            fees: req.fees,
            taxes: req.taxes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomListQuery {
    /// Only rooms of this hotel
    pub hotel_id: Option<HotelId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Daily price DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to set or block the price of one date.
///
/// Either `price` (in `currency`, defaulting to the room currency) or
/// `local_price` (in `local_currency`) may be given. A local price is
/// converted with the latest rate. Omitting both is only allowed when
/// blocking the date.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetDailyPriceRequest {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "150.00")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "19500.00")]
    pub local_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_currency: Option<CurrencyCode>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceCalendarResponse {
    pub room_id: RoomId,
    pub currency: CurrencyCode,
    pub days: Vec<CalendarDay>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Quote & availability DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Half-open stay `[check_in, check_out)` with an optional display currency.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StayQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailableRoom {
    pub room: Room,
    pub quote: Quote,
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange rate DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to record a rate: `rate` units of `from` buy one `to`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordExchangeRateRequest {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    #[schema(value_type = String, example = "130.00")]
    pub rate: Decimal,
    /// Defaults to today
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestRateQuery {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

// ─────────────────────────────────────────────────────────────────────────────
// Booking DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to book a room.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest: GuestDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "0.00")]
    pub discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BookingSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Currency of the price snapshot; defaults to the room currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_room_defaults() {
        let json = serde_json::json!({
            "hotel_id": HotelId::new(),
            "name": "Standard 1",
            "room_type": "standard",
            "max_occupancy": 2,
            "base_price": "85.50"
        });
        let req: CreateRoomRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.currency, CurrencyCode::USD);
        assert_eq!(req.min_stay, 1);
        assert!(req.is_active);
        assert_eq!(req.base_price, dec!(85.50));
    }

    #[test]
    fn test_booking_request_minimal() {
        let json = serde_json::json!({
            "room_id": RoomId::new(),
            "check_in": "2025-03-01",
            "check_out": "2025-03-04",
            "guest": {
                "first_name": "Amina",
                "last_name": "Otieno",
                "email": "amina@example.com"
            }
        });
        let req: CreateBookingRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.guest.adults, 1);
        assert!(req.discount.is_none());
        assert!(req.source.is_none());
    }
}
