//! # Booking Client SDK
//!
//! A typed Rust client for the room booking API.

use booking_types::{
    AvailabilityDecision, AvailableRoom, Booking, BookingId, BookingStatus, CalendarQuery,
    CreateBookingRequest, CreateRoomRequest, CurrencyCode, DailyPriceEntry, ExchangeRate,
    HealthResponse, HotelId, LatestRateQuery, PriceCalendarResponse, Quote,
    RecordExchangeRateRequest, ResolvedRate, Room, RoomId, RoomListQuery, SetDailyPriceRequest,
    StayQuery, UpdateBookingStatusRequest,
};
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};

/// Header the server uses to key rate limits.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Booking API client.
#[derive(Clone)]
pub struct BookingClient {
    base_url: String,
    client_id: Option<String>,
    http: Client,
}

impl BookingClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: None,
            http: Client::new(),
        }
    }

    /// Identifies this client for per-client rate limiting.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Fetches the health report.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rooms
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_room(&self, req: &CreateRoomRequest) -> Result<Room, ClientError> {
        self.post("/api/rooms", req).await
    }

    pub async fn get_room(&self, id: RoomId) -> Result<Room, ClientError> {
        self.get(&format!("/api/rooms/{}", id)).await
    }

    /// Lists rooms, optionally only those of one hotel.
    pub async fn list_rooms(&self, hotel_id: Option<HotelId>) -> Result<Vec<Room>, ClientError> {
        self.get_with("/api/rooms", &RoomListQuery { hotel_id }).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Prices
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn set_daily_price(
        &self,
        room_id: RoomId,
        req: &SetDailyPriceRequest,
    ) -> Result<DailyPriceEntry, ClientError> {
        self.put(&format!("/api/rooms/{}/prices", room_id), req)
            .await
    }

    /// Calendar for the inclusive range `start..=end`.
    pub async fn price_calendar(
        &self,
        room_id: RoomId,
        start: NaiveDate,
        end: NaiveDate,
        currency: Option<CurrencyCode>,
    ) -> Result<PriceCalendarResponse, ClientError> {
        let query = CalendarQuery {
            start,
            end,
            currency,
        };
        self.get_with(&format!("/api/rooms/{}/prices", room_id), &query)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Quotes & availability
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn quote(
        &self,
        room_id: RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        currency: Option<CurrencyCode>,
    ) -> Result<Quote, ClientError> {
        let query = StayQuery {
            check_in,
            check_out,
            currency,
        };
        self.get_with(&format!("/api/rooms/{}/quote", room_id), &query)
            .await
    }

    pub async fn check_availability(
        &self,
        room_id: RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<AvailabilityDecision, ClientError> {
        let query = StayQuery {
            check_in,
            check_out,
            currency: None,
        };
        self.get_with(&format!("/api/rooms/{}/availability", room_id), &query)
            .await
    }

    pub async fn search_available_rooms(
        &self,
        hotel_id: HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        currency: Option<CurrencyCode>,
    ) -> Result<Vec<AvailableRoom>, ClientError> {
        let query = StayQuery {
            check_in,
            check_out,
            currency,
        };
        self.get_with(&format!("/api/hotels/{}/available-rooms", hotel_id), &query)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Exchange rates
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn record_exchange_rate(
        &self,
        req: &RecordExchangeRateRequest,
    ) -> Result<ExchangeRate, ClientError> {
        self.post("/api/exchange-rates", req).await
    }

    pub async fn latest_exchange_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<ResolvedRate, ClientError> {
        self.get_with("/api/exchange-rates/latest", &LatestRateQuery { from, to })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_booking(&self, req: &CreateBookingRequest) -> Result<Booking, ClientError> {
        self.post("/api/bookings", req).await
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<Booking, ClientError> {
        self.get(&format!("/api/bookings/{}", id)).await
    }

    pub async fn list_room_bookings(&self, room_id: RoomId) -> Result<Vec<Booking>, ClientError> {
        self.get(&format!("/api/rooms/{}/bookings", room_id))
            .await
    }

    pub async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, ClientError> {
        self.post(
            &format!("/api/bookings/{}/status", id),
            &UpdateBookingStatusRequest { status },
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn identify(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.client_id {
            Some(id) => req.header(CLIENT_ID_HEADER, id),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let req = self.identify(self.http.get(self.url(path)));
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn get_with<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ClientError> {
        let req = self.identify(self.http.get(self.url(path)).query(query));
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let req = self.identify(self.http.post(self.url(path)).json(body));
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let req = self.identify(self.http.put(self.url(path)).json(body));
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
    }
}

/// Pulls the `error` field out of an API error body, else returns the body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BookingClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
        assert!(client.client_id.is_none());
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = BookingClient::new("http://localhost:3000/");
        assert_eq!(client.url("/health"), "http://localhost:3000/health");
    }

    #[test]
    fn test_client_with_client_id() {
        let client = BookingClient::new("http://localhost:3000").with_client_id("front-desk");
        assert_eq!(client.client_id, Some("front-desk".to_string()));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":"Room not found: 42","code":404}"#;
        assert_eq!(error_message(body), "Room not found: 42");
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }

    #[test]
    fn test_api_error_status() {
        let err = ClientError::Api {
            status: 409,
            message: "conflict".into(),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "API error: 409 - conflict");
    }
}
