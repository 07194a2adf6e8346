//! Booking CLI
//!
//! Command-line interface for the room booking API.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use booking_client::BookingClient;
use booking_types::{
    BookingId, BookingSource, BookingStatus, CreateBookingRequest, CreateRoomRequest,
    CurrencyCode, GuestDetails, HotelId, RecordExchangeRateRequest, RoomId, SetDailyPriceRequest,
};

#[derive(Parser)]
#[command(name = "booking")]
#[command(author, version, about = "Room booking API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the booking API
    #[arg(long, env = "BOOKING_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Identity used for per-client rate limiting
    #[arg(long, env = "BOOKING_CLIENT_ID")]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Room operations
    Room {
        #[command(subcommand)]
        action: RoomCommands,
    },
    /// Daily price operations
    Price {
        #[command(subcommand)]
        action: PriceCommands,
    },
    /// Exchange rate operations
    Rate {
        #[command(subcommand)]
        action: RateCommands,
    },
    /// Price a stay
    Quote {
        #[arg(long)]
        room: RoomId,
        #[arg(long)]
        check_in: NaiveDate,
        #[arg(long)]
        check_out: NaiveDate,
        /// Display currency (defaults to the room currency)
        #[arg(long)]
        currency: Option<CurrencyCode>,
    },
    /// Check whether a stay can be booked, or search a hotel with --hotel
    Availability {
        #[arg(long, conflicts_with = "hotel", required_unless_present = "hotel")]
        room: Option<RoomId>,
        #[arg(long)]
        hotel: Option<HotelId>,
        #[arg(long)]
        check_in: NaiveDate,
        #[arg(long)]
        check_out: NaiveDate,
        #[arg(long)]
        currency: Option<CurrencyCode>,
    },
    /// Booking operations
    Booking {
        #[command(subcommand)]
        action: BookingCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum RoomCommands {
    /// Create a new room
    Create {
        #[arg(long)]
        hotel: HotelId,
        /// Room name
        name: String,
        #[arg(long, default_value = "standard")]
        room_type: String,
        #[arg(long, default_value_t = 2)]
        max_occupancy: u32,
        /// Nightly base price
        #[arg(long)]
        base_price: Decimal,
        #[arg(long, default_value = "USD")]
        currency: CurrencyCode,
        #[arg(long, default_value_t = 1)]
        min_stay: u32,
        #[arg(long)]
        max_stay: Option<u32>,
        /// Create the room deactivated
        #[arg(long)]
        inactive: bool,
    },
    /// Get room details
    Get {
        /// Room ID (UUID)
        id: RoomId,
    },
    /// List rooms
    List {
        #[arg(long)]
        hotel: Option<HotelId>,
    },
}

#[derive(Subcommand)]
enum PriceCommands {
    /// Set, convert or block the price of one date
    Set {
        #[arg(long)]
        room: RoomId,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, conflicts_with = "local_price")]
        price: Option<Decimal>,
        #[arg(long, requires = "price")]
        currency: Option<CurrencyCode>,
        /// Price in a local currency, converted with the latest rate
        #[arg(long, requires = "local_currency")]
        local_price: Option<Decimal>,
        #[arg(long)]
        local_currency: Option<CurrencyCode>,
        /// Mark the date unbookable
        #[arg(long)]
        blocked: bool,
    },
    /// Show the price calendar for an inclusive date range
    Calendar {
        #[arg(long)]
        room: RoomId,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        currency: Option<CurrencyCode>,
    },
}

#[derive(Subcommand)]
enum RateCommands {
    /// Record a rate: RATE units of FROM buy one TO
    Record {
        #[arg(long)]
        from: CurrencyCode,
        #[arg(long)]
        to: CurrencyCode,
        #[arg(long)]
        rate: Decimal,
        /// Effective date (defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Resolve the current rate for a pair
    Latest {
        #[arg(long)]
        from: CurrencyCode,
        #[arg(long)]
        to: CurrencyCode,
    },
}

#[derive(Subcommand)]
enum BookingCommands {
    /// Book a room
    Create {
        #[arg(long)]
        room: RoomId,
        #[arg(long)]
        check_in: NaiveDate,
        #[arg(long)]
        check_out: NaiveDate,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, default_value_t = 1)]
        adults: u32,
        #[arg(long, default_value_t = 0)]
        children: u32,
        #[arg(long, default_value_t = 0)]
        infants: u32,
        #[arg(long)]
        discount: Option<Decimal>,
        #[arg(long)]
        source: Option<BookingSource>,
        #[arg(long)]
        special_requests: Option<String>,
        /// Currency of the price snapshot
        #[arg(long)]
        currency: Option<CurrencyCode>,
    },
    /// Get booking details
    Get {
        /// Booking ID (UUID)
        id: BookingId,
    },
    /// List bookings of a room
    List {
        #[arg(long)]
        room: RoomId,
    },
    /// Move a booking to a new status
    Status {
        /// Booking ID (UUID)
        id: BookingId,
        /// confirmed, checked_in, checked_out, cancelled, no_show or refunded
        status: BookingStatus,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = BookingClient::new(&cli.api_url);
    if let Some(id) = cli.client_id {
        client = client.with_client_id(id);
    }

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("✓ API is {} (version {})", health.status, health.version);
        }

        Commands::Room { action } => match action {
            RoomCommands::Create {
                hotel,
                name,
                room_type,
                max_occupancy,
                base_price,
                currency,
                min_stay,
                max_stay,
                inactive,
            } => {
                let req = CreateRoomRequest {
                    hotel_id: hotel,
                    name,
                    room_type,
                    max_occupancy,
                    base_price,
                    currency,
                    min_stay,
                    max_stay,
                    is_active: !inactive,
                    fees: Vec::new(),
                    taxes: Vec::new(),
                };
                print_json(&client.create_room(&req).await?)?;
            }
            RoomCommands::Get { id } => {
                print_json(&client.get_room(id).await?)?;
            }
            RoomCommands::List { hotel } => {
                print_json(&client.list_rooms(hotel).await?)?;
            }
        },

        Commands::Price { action } => match action {
            PriceCommands::Set {
                room,
                date,
                price,
                currency,
                local_price,
                local_currency,
                blocked,
            } => {
                let req = SetDailyPriceRequest {
                    date,
                    price,
                    currency,
                    local_price,
                    local_currency,
                    is_available: !blocked,
                };
                print_json(&client.set_daily_price(room, &req).await?)?;
            }
            PriceCommands::Calendar {
                room,
                start,
                end,
                currency,
            } => {
                print_json(&client.price_calendar(room, start, end, currency).await?)?;
            }
        },

        Commands::Rate { action } => match action {
            RateCommands::Record {
                from,
                to,
                rate,
                as_of,
            } => {
                let req = RecordExchangeRateRequest {
                    from,
                    to,
                    rate,
                    as_of,
                };
                print_json(&client.record_exchange_rate(&req).await?)?;
            }
            RateCommands::Latest { from, to } => {
                print_json(&client.latest_exchange_rate(from, to).await?)?;
            }
        },

        Commands::Quote {
            room,
            check_in,
            check_out,
            currency,
        } => {
            print_json(&client.quote(room, check_in, check_out, currency).await?)?;
        }

        Commands::Availability {
            room,
            hotel,
            check_in,
            check_out,
            currency,
        } => match (room, hotel) {
            (Some(room), _) => {
                print_json(&client.check_availability(room, check_in, check_out).await?)?;
            }
            (None, Some(hotel)) => {
                let rooms = client
                    .search_available_rooms(hotel, check_in, check_out, currency)
                    .await?;
                print_json(&rooms)?;
            }
            (None, None) => anyhow::bail!("either --room or --hotel is required"),
        },

        Commands::Booking { action } => match action {
            BookingCommands::Create {
                room,
                check_in,
                check_out,
                first_name,
                last_name,
                email,
                phone,
                adults,
                children,
                infants,
                discount,
                source,
                special_requests,
                currency,
            } => {
                let req = CreateBookingRequest {
                    room_id: room,
                    check_in,
                    check_out,
                    guest: GuestDetails {
                        first_name,
                        last_name,
                        email,
                        phone,
                        adults,
                        children,
                        infants,
                    },
                    discount,
                    source,
                    special_requests,
                    currency,
                };
                print_json(&client.create_booking(&req).await?)?;
            }
            BookingCommands::Get { id } => {
                print_json(&client.get_booking(id).await?)?;
            }
            BookingCommands::List { room } => {
                print_json(&client.list_room_bookings(room).await?)?;
            }
            BookingCommands::Status { id, status } => {
                print_json(&client.update_booking_status(id, status).await?)?;
            }
        },
    }

    Ok(())
}
