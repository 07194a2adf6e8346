//! Client example walking through a booking flow against a running server.
//!
//! Run with: cargo run -p booking-app --example client_example

use booking_client::BookingClient;
use booking_hex::{BookingService, inbound::HttpServer};
use booking_repo::build_repo;
use booking_types::{
    BookingStatus, CreateBookingRequest, CreateRoomRequest, CurrencyCode, GuestDetails, HotelId,
    RecordExchangeRateRequest, SetDailyPriceRequest,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::net::SocketAddr;
use tempfile::tempdir;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Bind first so the port is ours
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("bookings.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("Starting server on {addr}...");
    println!("   Database: {db_url}");

    let repo = build_repo(&db_url).await?;
    let router = HttpServer::new(BookingService::new(repo)).router();

    tokio::spawn(async move {
        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {e}");
        }
    });

    let client = BookingClient::new(format!("http://{addr}")).with_client_id("example");

    let health = client.health().await?;
    println!("Server health: {} (v{})", health.status, health.version);

    // ─────────────────────────────────────────────────────────────────────────
    // Room and prices
    // ─────────────────────────────────────────────────────────────────────────

    let hotel_id = HotelId::new();
    let room = client
        .create_room(&CreateRoomRequest {
            hotel_id,
            name: "Ocean View 101".into(),
            room_type: "deluxe".into(),
            max_occupancy: 2,
            base_price: dec!(100.00),
            currency: CurrencyCode::USD,
            min_stay: 1,
            max_stay: None,
            is_active: true,
            fees: Vec::new(),
            taxes: Vec::new(),
        })
        .await?;
    println!("Created room {} (id={})", room.name, room.id);

    let check_in: NaiveDate = "2030-03-01".parse()?;
    let check_out: NaiveDate = "2030-03-04".parse()?;
    let peak: NaiveDate = "2030-03-02".parse()?;

    client
        .set_daily_price(
            room.id,
            &SetDailyPriceRequest {
                date: peak,
                price: Some(dec!(150.00)),
                currency: None,
                local_price: None,
                local_currency: None,
                is_available: true,
            },
        )
        .await?;
    println!("Set {peak} to 150.00 USD");

    client
        .record_exchange_rate(&RecordExchangeRateRequest {
            from: CurrencyCode::KES,
            to: CurrencyCode::USD,
            rate: dec!(130),
            as_of: None,
        })
        .await?;
    println!("Recorded 130 KES per USD");

    // ─────────────────────────────────────────────────────────────────────────
    // Quotes
    // ─────────────────────────────────────────────────────────────────────────

    let quote = client.quote(room.id, check_in, check_out, None).await?;
    println!("Quote: {} nights, total {} {}", quote.nights, quote.total, quote.currency);
    for night in &quote.per_night {
        println!("   {} {} ({:?})", night.date, night.price, night.source);
    }

    let local = client
        .quote(room.id, check_in, check_out, Some(CurrencyCode::KES))
        .await?;
    println!("Same stay in KES: {}", local.total);

    // ─────────────────────────────────────────────────────────────────────────
    // Booking lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    let booking = client
        .create_booking(&CreateBookingRequest {
            room_id: room.id,
            check_in,
            check_out,
            guest: GuestDetails {
                first_name: "Amina".into(),
                last_name: "Otieno".into(),
                email: "amina@example.com".into(),
                phone: None,
                adults: 2,
                children: 0,
                infants: 0,
            },
            discount: None,
            source: None,
            special_requests: None,
            currency: None,
        })
        .await?;
    println!(
        "Booked {} ({}), total {}",
        booking.reference, booking.status, booking.totals.total
    );

    let clash = client.check_availability(room.id, peak, check_out).await?;
    println!(
        "Overlapping stay available: {} ({} conflicts)",
        clash.available,
        clash.conflicts.len()
    );

    let booking = client
        .update_booking_status(booking.id, BookingStatus::Confirmed)
        .await?;
    println!("Booking {} is now {}", booking.reference, booking.status);

    let rooms = client
        .search_available_rooms(hotel_id, check_in, check_out, None)
        .await?;
    println!("Rooms still free for the same stay: {}", rooms.len());

    println!("\nExample completed successfully!");

    Ok(())
}
