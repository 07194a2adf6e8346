//! End-to-end HTTP tests against an in-memory SQLite repository.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use booking_hex::{BookingService, inbound::HttpServer};
use booking_repo::SqliteRepo;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn create_app() -> Router {
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    HttpServer::new(BookingService::new(repo)).router()
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_room(app: &Router, hotel_id: &str) -> String {
    let (status, room) = send(
        app,
        Method::POST,
        "/api/rooms",
        Some(json!({
            "hotel_id": hotel_id,
            "name": "Ocean View 101",
            "room_type": "deluxe",
            "max_occupancy": 2,
            "base_price": "100.00",
            "currency": "USD"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    room["id"].as_str().unwrap().to_string()
}

fn booking_body(room_id: &str, check_in: &str, check_out: &str) -> Value {
    json!({
        "room_id": room_id,
        "check_in": check_in,
        "check_out": check_out,
        "guest": {
            "first_name": "Amina",
            "last_name": "Otieno",
            "email": "amina@example.com",
            "adults": 2
        }
    })
}

const HOTEL: &str = "7f3c2a9e-1b4d-4c8e-9a6f-2d5b8e1c3a70";

#[tokio::test]
async fn test_health_and_openapi() {
    let app = create_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/bookings"].is_object());
}

#[tokio::test]
async fn test_quote_over_http_uses_decimal_strings() {
    let app = create_app().await;
    let room_id = create_room(&app, HOTEL).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/rooms/{}/prices", room_id),
        Some(json!({ "date": "2025-03-02", "price": "150.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, quote) = send(
        &app,
        Method::GET,
        &format!("/api/rooms/{}/quote?check_in=2025-03-01&check_out=2025-03-04", room_id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["subtotal"], "350.00");
    assert_eq!(quote["currency"], "USD");
    let nights: Vec<_> = quote["per_night"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["price"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(nights, vec!["100.00", "150.00", "100.00"]);
}

#[tokio::test]
async fn test_blocked_date_reports_dates() {
    let app = create_app().await;
    let room_id = create_room(&app, HOTEL).await;
    send(
        &app,
        Method::PUT,
        &format!("/api/rooms/{}/prices", room_id),
        Some(json!({ "date": "2025-03-02", "is_available": false })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/rooms/{}/quote?check_in=2025-03-01&check_out=2025-03-04", room_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["dates"], json!(["2025-03-02"]));

    let (status, decision) = send(
        &app,
        Method::GET,
        &format!("/api/rooms/{}/availability?check_in=2025-03-01&check_out=2025-03-04", room_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["available"], false);
    assert_eq!(decision["conflicts"][0]["kind"], "blocked_date");
}

#[tokio::test]
async fn test_invalid_requests_map_to_status_codes() {
    let app = create_app().await;
    let room_id = create_room(&app, HOTEL).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/rooms/{}/quote?check_in=2025-03-04&check_out=2025-03-01", room_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = send(&app, Method::GET, "/api/rooms/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/rooms/00000000-0000-4000-8000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_requests_rejected() {
    let app = create_app().await;
    let room_id = create_room(&app, HOTEL).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/rooms/{}/quote?check_in=2025-01-01&check_out=4025-01-01", room_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 422);

    let mut party = booking_body(&room_id, "2030-03-01", "2030-03-02");
    party["guest"]["adults"] = json!(u32::MAX);
    party["guest"]["children"] = json!(1);
    let (status, _) = send(&app, Method::POST, "/api/bookings", Some(party)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/rooms",
        Some(json!({
            "hotel_id": HOTEL,
            "name": "Ballroom",
            "room_type": "hall",
            "max_occupancy": 4_000_000_000u32,
            "base_price": "100.00",
            "currency": "USD"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_flow() {
    let app = create_app().await;
    let room_id = create_room(&app, HOTEL).await;

    let (status, booking) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(booking_body(&room_id, "2025-01-15", "2025-01-20")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["totals"]["total"], "500.00");
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // Same-day turnover
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(booking_body(&room_id, "2025-01-10", "2025-01-15")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(booking_body(&room_id, "2025-01-18", "2025-01-22")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["conflicts"],
        json!([{ "check_in": "2025-01-18", "check_out": "2025-01-20" }])
    );

    let (status, confirmed) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{}/status", booking_id),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");
    assert!(confirmed["confirmed_at"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/bookings/{}/status", booking_id),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, bookings) = send(
        &app,
        Method::GET,
        &format!("/api/rooms/{}/bookings", room_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bookings.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_exchange_rates_and_converted_quote() {
    let app = create_app().await;
    let room_id = create_room(&app, HOTEL).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/exchange-rates",
        Some(json!({ "from": "KES", "to": "USD", "rate": "130", "as_of": "2025-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, rate) = send(
        &app,
        Method::GET,
        "/api/exchange-rates/latest?from=KES&to=USD",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rate["source"]["kind"], "recorded");

    let (status, quote) = send(
        &app,
        Method::GET,
        &format!(
            "/api/rooms/{}/quote?check_in=2025-03-01&check_out=2025-03-02&currency=KES",
            room_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["currency"], "KES");
    assert_eq!(quote["total"], "13000.00");

    let (status, lower) = send(
        &app,
        Method::GET,
        &format!(
            "/api/rooms/{}/quote?check_in=2025-03-01&check_out=2025-03-02&currency=kes",
            room_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lower["currency"], "KES");
    assert_eq!(lower["total"], quote["total"]);
}

#[tokio::test]
async fn test_search_available_rooms() {
    let app = create_app().await;
    let free = create_room(&app, HOTEL).await;
    let booked = create_room(&app, HOTEL).await;
    send(
        &app,
        Method::POST,
        "/api/bookings",
        Some(booking_body(&booked, "2025-06-01", "2025-06-05")),
    )
    .await;

    let (status, rooms) = send(
        &app,
        Method::GET,
        &format!(
            "/api/hotels/{}/available-rooms?check_in=2025-06-02&check_out=2025-06-04",
            HOTEL
        ),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rooms = rooms.as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["room"]["id"], free.as_str());
}
