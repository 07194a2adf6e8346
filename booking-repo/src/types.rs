//! Shared database row types with feature-gated column representations.
//!
//! SQLite stores ids, decimals and timestamps as TEXT; PostgreSQL uses native
//! UUID, NUMERIC and TIMESTAMPTZ columns. The aliases below pick the column
//! type and the `*_to_db`/`*_from_db` helpers convert at the boundary.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use booking_types::{
    Booking, BookingId, BookingTotals, CurrencyCode, DailyPriceEntry, ExchangeRate, Fee,
    GuestDetails, HotelId, NightlyPrice, RepoError, Room, RoomId, Tax,
};

// ─────────────────────────────────────────────────────────────────────────────
// Column representations
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type DbId = String;
#[cfg(feature = "postgres")]
pub type DbId = Uuid;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type DbDecimal = String;
#[cfg(feature = "postgres")]
pub type DbDecimal = Decimal;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type DbTimestamp = String;
#[cfg(feature = "postgres")]
pub type DbTimestamp = DateTime<Utc>;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub fn id_to_db(id: Uuid) -> DbId {
    id.to_string()
}
#[cfg(feature = "postgres")]
pub fn id_to_db(id: Uuid) -> DbId {
    id
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
fn id_from_db(value: DbId) -> Result<Uuid, RepoError> {
    Uuid::parse_str(&value).map_err(|e| RepoError::Database(e.to_string()))
}
#[cfg(feature = "postgres")]
fn id_from_db(value: DbId) -> Result<Uuid, RepoError> {
    Ok(value)
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub fn decimal_to_db(value: Decimal) -> DbDecimal {
    value.to_string()
}
#[cfg(feature = "postgres")]
pub fn decimal_to_db(value: Decimal) -> DbDecimal {
    value
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
fn decimal_from_db(value: DbDecimal) -> Result<Decimal, RepoError> {
    Decimal::from_str(&value).map_err(|e| RepoError::Database(e.to_string()))
}
#[cfg(feature = "postgres")]
fn decimal_from_db(value: DbDecimal) -> Result<Decimal, RepoError> {
    Ok(value)
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub fn ts_to_db(value: DateTime<Utc>) -> DbTimestamp {
    value.to_rfc3339()
}
#[cfg(feature = "postgres")]
pub fn ts_to_db(value: DateTime<Utc>) -> DbTimestamp {
    value
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
fn ts_from_db(value: DbTimestamp) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}
#[cfg(feature = "postgres")]
fn ts_from_db(value: DbTimestamp) -> Result<DateTime<Utc>, RepoError> {
    Ok(value)
}

fn opt_ts_from_db(value: Option<DbTimestamp>) -> Result<Option<DateTime<Utc>>, RepoError> {
    value.map(ts_from_db).transpose()
}

pub fn opt_ts_to_db(value: Option<DateTime<Utc>>) -> Option<DbTimestamp> {
    value.map(ts_to_db)
}

fn currency_from_db(value: &str) -> Result<CurrencyCode, RepoError> {
    value
        .parse()
        .map_err(|e: booking_types::ExchangeError| RepoError::Database(e.to_string()))
}

fn count_from_db(value: i32) -> Result<u32, RepoError> {
    u32::try_from(value).map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

pub const ROOM_COLUMNS: &str = "id, hotel_id, name, room_type, max_occupancy, base_price, currency, \
     min_stay, max_stay, is_active, fees, taxes, created_at, updated_at";

/// Room row from database.
#[derive(FromRow)]
pub struct DbRoom {
    pub id: DbId,
    pub hotel_id: DbId,
    pub name: String,
    pub room_type: String,
    pub max_occupancy: i32,
    pub base_price: DbDecimal,
    pub currency: String,
    pub min_stay: i32,
    pub max_stay: Option<i32>,
    pub is_active: bool,
    pub fees: Json<Vec<Fee>>,
    pub taxes: Json<Vec<Tax>>,
    pub created_at: DbTimestamp,
    pub updated_at: DbTimestamp,
}

impl DbRoom {
    pub fn into_domain(self) -> Result<Room, RepoError> {
        Ok(Room {
            id: RoomId::from_uuid(id_from_db(self.id)?),
            hotel_id: HotelId::from_uuid(id_from_db(self.hotel_id)?),
            name: self.name,
            room_type: self.room_type,
            max_occupancy: count_from_db(self.max_occupancy)?,
            base_price: decimal_from_db(self.base_price)?,
            currency: currency_from_db(&self.currency)?,
            min_stay: count_from_db(self.min_stay)?,
            max_stay: self.max_stay.map(count_from_db).transpose()?,
            is_active: self.is_active,
            fees: self.fees.0,
            taxes: self.taxes.0,
            created_at: ts_from_db(self.created_at)?,
            updated_at: ts_from_db(self.updated_at)?,
        })
    }
}

/// Daily price override row.
#[derive(FromRow)]
pub struct DbDailyPrice {
    pub room_id: DbId,
    pub date: NaiveDate,
    pub price: DbDecimal,
    pub currency: String,
    pub is_available: bool,
    pub rate_used: Option<DbDecimal>,
}

impl DbDailyPrice {
    pub fn into_domain(self) -> Result<DailyPriceEntry, RepoError> {
        Ok(DailyPriceEntry {
            room_id: RoomId::from_uuid(id_from_db(self.room_id)?),
            date: self.date,
            price: decimal_from_db(self.price)?,
            currency: currency_from_db(&self.currency)?,
            is_available: self.is_available,
            rate_used: self.rate_used.map(decimal_from_db).transpose()?,
        })
    }
}

/// Exchange rate row.
#[derive(FromRow)]
pub struct DbExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: DbDecimal,
    pub as_of: NaiveDate,
}

impl DbExchangeRate {
    pub fn into_domain(self) -> Result<ExchangeRate, RepoError> {
        Ok(ExchangeRate {
            from: currency_from_db(&self.from_currency)?,
            to: currency_from_db(&self.to_currency)?,
            rate: decimal_from_db(self.rate)?,
            as_of: self.as_of,
        })
    }
}

pub const BOOKING_COLUMNS: &str = "id, reference, room_id, hotel_id, check_in, check_out, nights, \
     guest_first_name, guest_last_name, guest_email, guest_phone, adults, children, infants, \
     status, source, currency, nightly, subtotal, tax_amount, fee_amount, discount_amount, total, \
     special_requests, created_at, updated_at, confirmed_at, cancelled_at, checked_in_at, \
     checked_out_at, refunded_at";

/// Booking row from database.
#[derive(FromRow)]
pub struct DbBooking {
    pub id: DbId,
    pub reference: String,
    pub room_id: DbId,
    pub hotel_id: DbId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i32,
    pub guest_first_name: String,
    pub guest_last_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub adults: i32,
    pub children: i32,
    pub infants: i32,
    pub status: String,
    pub source: String,
    pub currency: String,
    pub nightly: Json<Vec<NightlyPrice>>,
    pub subtotal: DbDecimal,
    pub tax_amount: DbDecimal,
    pub fee_amount: DbDecimal,
    pub discount_amount: DbDecimal,
    pub total: DbDecimal,
    pub special_requests: Option<String>,
    pub created_at: DbTimestamp,
    pub updated_at: DbTimestamp,
    pub confirmed_at: Option<DbTimestamp>,
    pub cancelled_at: Option<DbTimestamp>,
    pub checked_in_at: Option<DbTimestamp>,
    pub checked_out_at: Option<DbTimestamp>,
    pub refunded_at: Option<DbTimestamp>,
}

impl DbBooking {
    pub fn into_domain(self) -> Result<Booking, RepoError> {
        Ok(Booking {
            id: BookingId::from_uuid(id_from_db(self.id)?),
            reference: self.reference,
            room_id: RoomId::from_uuid(id_from_db(self.room_id)?),
            hotel_id: HotelId::from_uuid(id_from_db(self.hotel_id)?),
            check_in: self.check_in,
            check_out: self.check_out,
            nights: count_from_db(self.nights)?,
            guest: GuestDetails {
                first_name: self.guest_first_name,
                last_name: self.guest_last_name,
                email: self.guest_email,
                phone: self.guest_phone,
                adults: count_from_db(self.adults)?,
                children: count_from_db(self.children)?,
                infants: count_from_db(self.infants)?,
            },
            status: self.status.parse().map_err(RepoError::Domain)?,
            source: self.source.parse().map_err(RepoError::Domain)?,
            currency: currency_from_db(&self.currency)?,
            nightly: self.nightly.0,
            totals: BookingTotals {
                subtotal: decimal_from_db(self.subtotal)?,
                tax_amount: decimal_from_db(self.tax_amount)?,
                fee_amount: decimal_from_db(self.fee_amount)?,
                discount_amount: decimal_from_db(self.discount_amount)?,
                total: decimal_from_db(self.total)?,
            },
            special_requests: self.special_requests,
            created_at: ts_from_db(self.created_at)?,
            updated_at: ts_from_db(self.updated_at)?,
            confirmed_at: opt_ts_from_db(self.confirmed_at)?,
            cancelled_at: opt_ts_from_db(self.cancelled_at)?,
            checked_in_at: opt_ts_from_db(self.checked_in_at)?,
            checked_out_at: opt_ts_from_db(self.checked_out_at)?,
            refunded_at: opt_ts_from_db(self.refunded_at)?,
        })
    }
}

/// Statuses that hold a room's nights, as stored in `bookings.status`.
pub const BLOCKING_STATUSES_SQL: &str = "'pending', 'confirmed', 'checked_in', 'checked_out'";

/// Counts are stored as `INTEGER`; values past `i32::MAX` are refused.
pub fn count_to_db(value: u32) -> Result<i32, RepoError> {
    i32::try_from(value).map_err(|e| RepoError::Database(format!("count {value} out of range: {e}")))
}
