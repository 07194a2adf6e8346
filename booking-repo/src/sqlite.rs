//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use booking_types::{
    AvailabilityDecision, Booking, BookingId, BookingRepository, BookingStatus, CurrencyCode,
    DailyPriceEntry, DomainError, ExchangeRate, ExchangeRateProvider, HotelId, RepoError, Room,
    RoomId, StayRange,
};

use crate::types::{
    BLOCKING_STATUSES_SQL, BOOKING_COLUMNS, DbBooking, DbDailyPrice, DbExchangeRate, DbRoom,
    ROOM_COLUMNS, count_to_db, decimal_to_db, id_to_db, opt_ts_to_db, ts_to_db,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// SQLite has no row locks, so booking commits are serialized in-process by
/// `booking_lock` and re-validated inside a transaction.
pub struct SqliteRepo {
    pool: SqlitePool,
    booking_lock: Mutex<()>,
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Maps write failures, treating busy/locked databases and unique
/// violations as retryable contention.
fn map_write_err(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        let locked = matches!(db.code().as_deref(), Some("5") | Some("6"));
        if locked || db.is_unique_violation() {
            return RepoError::Conflict(db.message().to_string());
        }
    }
    RepoError::Database(err.to_string())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `:memory:` is a separate database; keep exactly one alive.
        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = pool_options.connect_with(options).await?;

        let repo = Self {
            pool,
            booking_lock: Mutex::new(()),
        };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    async fn overlapping_bookings(
        tx: &mut Transaction<'_, Sqlite>,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<Booking>, RepoError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE room_id = ? AND status IN ({BLOCKING_STATUSES_SQL}) \
             AND check_in < ? AND check_out > ? ORDER BY check_in"
        );
        let rows: Vec<DbBooking> = sqlx::query_as(&sql)
            .bind(id_to_db(room_id.into_uuid()))
            .bind(range.check_out)
            .bind(range.check_in)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        rows.into_iter().map(DbBooking::into_domain).collect()
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>, RepoError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?");
        let row: Option<DbBooking> = sqlx::query_as(&sql)
            .bind(id_to_db(id.into_uuid()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        row.map(DbBooking::into_domain).transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange rates
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ExchangeRateProvider for SqliteRepo {
    async fn record_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate, RepoError> {
        sqlx::query(
            r#"INSERT INTO exchange_rates (from_currency, to_currency, rate, as_of) VALUES (?, ?, ?, ?)
               ON CONFLICT (from_currency, to_currency, as_of) DO UPDATE SET rate = excluded.rate"#,
        )
        .bind(rate.from.code())
        .bind(rate.to.code())
        .bind(decimal_to_db(rate.rate))
        .bind(rate.as_of)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(rate)
    }

    async fn latest_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Option<ExchangeRate>, RepoError> {
        let row: Option<DbExchangeRate> = sqlx::query_as(
            r#"SELECT from_currency, to_currency, rate, as_of FROM exchange_rates
               WHERE from_currency = ? AND to_currency = ? ORDER BY as_of DESC LIMIT 1"#,
        )
        .bind(from.code())
        .bind(to.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbExchangeRate::into_domain).transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BookingRepository for SqliteRepo {
    async fn create_room(&self, room: Room) -> Result<Room, RepoError> {
        sqlx::query(&format!(
            "INSERT INTO rooms ({ROOM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(id_to_db(room.id.into_uuid()))
        .bind(id_to_db(room.hotel_id.into_uuid()))
        .bind(&room.name)
        .bind(&room.room_type)
        .bind(count_to_db(room.max_occupancy)?)
        .bind(decimal_to_db(room.base_price))
        .bind(room.currency.code())
        .bind(count_to_db(room.min_stay)?)
        .bind(room.max_stay.map(count_to_db).transpose()?)
        .bind(room.is_active)
        .bind(Json(&room.fees))
        .bind(Json(&room.taxes))
        .bind(ts_to_db(room.created_at))
        .bind(ts_to_db(room.updated_at))
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(room)
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        let row: Option<DbRoom> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?"))
                .bind(id_to_db(id.into_uuid()))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRoom::into_domain).transpose()
    }

    async fn list_rooms(&self, hotel_id: Option<HotelId>) -> Result<Vec<Room>, RepoError> {
        let rows: Vec<DbRoom> = match hotel_id {
            Some(hotel_id) => sqlx::query_as(&format!(
                "SELECT {ROOM_COLUMNS} FROM rooms WHERE hotel_id = ? ORDER BY created_at, name"
            ))
            .bind(id_to_db(hotel_id.into_uuid()))
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(&format!(
                "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY created_at, name"
            ))
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRoom::into_domain).collect()
    }

    async fn upsert_daily_price(
        &self,
        entry: DailyPriceEntry,
    ) -> Result<DailyPriceEntry, RepoError> {
        sqlx::query(
            r#"INSERT INTO daily_room_prices (room_id, date, price, currency, is_available, rate_used)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (room_id, date) DO UPDATE SET
                   price = excluded.price,
                   currency = excluded.currency,
                   is_available = excluded.is_available,
                   rate_used = excluded.rate_used"#,
        )
        .bind(id_to_db(entry.room_id.into_uuid()))
        .bind(entry.date)
        .bind(decimal_to_db(entry.price))
        .bind(entry.currency.code())
        .bind(entry.is_available)
        .bind(entry.rate_used.map(decimal_to_db))
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(entry)
    }

    async fn daily_prices(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<DailyPriceEntry>, RepoError> {
        let rows: Vec<DbDailyPrice> = sqlx::query_as(
            r#"SELECT room_id, date, price, currency, is_available, rate_used FROM daily_room_prices
               WHERE room_id = ? AND date >= ? AND date < ? ORDER BY date"#,
        )
        .bind(id_to_db(room_id.into_uuid()))
        .bind(range.check_in)
        .bind(range.check_out)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbDailyPrice::into_domain).collect()
    }

    async fn active_bookings(
        &self,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<Booking>, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;
        let bookings = Self::overlapping_bookings(&mut tx, room_id, range).await?;
        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;
        Ok(bookings)
    }

    async fn create_booking(&self, booking: Booking) -> Result<Booking, RepoError> {
        let _guard = self.booking_lock.lock().await;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let room_id_str = id_to_db(booking.room_id.into_uuid());
        let room: Option<(bool,)> = sqlx::query_as(r#"SELECT is_active FROM rooms WHERE id = ?"#)
            .bind(&room_id_str)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        match room {
            None => return Err(DomainError::RoomNotFound(booking.room_id).into()),
            Some((false,)) => return Err(DomainError::RoomInactive(booking.room_id).into()),
            Some((true,)) => {}
        }

        // Re-validate inside the transaction
        let stay = booking.stay();
        let existing = Self::overlapping_bookings(&mut tx, booking.room_id, stay).await?;
        let blocked: Vec<DbDailyPrice> = sqlx::query_as(
            r#"SELECT room_id, date, price, currency, is_available, rate_used FROM daily_room_prices
               WHERE room_id = ? AND date >= ? AND date < ? AND is_available = 0"#,
        )
        .bind(&room_id_str)
        .bind(stay.check_in)
        .bind(stay.check_out)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;
        let blocked = blocked
            .into_iter()
            .map(DbDailyPrice::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        AvailabilityDecision::evaluate(booking.room_id, stay, &existing, &blocked)
            .ensure_available()?;

        sqlx::query(&format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES \
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(id_to_db(booking.id.into_uuid()))
        .bind(&booking.reference)
        .bind(&room_id_str)
        .bind(id_to_db(booking.hotel_id.into_uuid()))
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(count_to_db(booking.nights)?)
        .bind(&booking.guest.first_name)
        .bind(&booking.guest.last_name)
        .bind(&booking.guest.email)
        .bind(&booking.guest.phone)
        .bind(count_to_db(booking.guest.adults)?)
        .bind(count_to_db(booking.guest.children)?)
        .bind(count_to_db(booking.guest.infants)?)
        .bind(booking.status.as_str())
        .bind(booking.source.as_str())
        .bind(booking.currency.code())
        .bind(Json(&booking.nightly))
        .bind(decimal_to_db(booking.totals.subtotal))
        .bind(decimal_to_db(booking.totals.tax_amount))
        .bind(decimal_to_db(booking.totals.fee_amount))
        .bind(decimal_to_db(booking.totals.discount_amount))
        .bind(decimal_to_db(booking.totals.total))
        .bind(&booking.special_requests)
        .bind(ts_to_db(booking.created_at))
        .bind(ts_to_db(booking.updated_at))
        .bind(opt_ts_to_db(booking.confirmed_at))
        .bind(opt_ts_to_db(booking.cancelled_at))
        .bind(opt_ts_to_db(booking.checked_in_at))
        .bind(opt_ts_to_db(booking.checked_out_at))
        .bind(opt_ts_to_db(booking.refunded_at))
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        tracing::debug!(booking_id = %booking.id, reference = %booking.reference, "booking committed");
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, RepoError> {
        self.fetch_booking(id).await
    }

    async fn list_bookings_for_room(&self, room_id: RoomId) -> Result<Vec<Booking>, RepoError> {
        let rows: Vec<DbBooking> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE room_id = ? ORDER BY check_in, created_at"
        ))
        .bind(id_to_db(room_id.into_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbBooking::into_domain).collect()
    }

    async fn update_booking_status(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<Booking, RepoError> {
        let result = sqlx::query(
            r#"UPDATE bookings SET status = ?, updated_at = ?, confirmed_at = ?, cancelled_at = ?,
                   checked_in_at = ?, checked_out_at = ?, refunded_at = ?
               WHERE id = ? AND status = ?"#,
        )
        .bind(booking.status.as_str())
        .bind(ts_to_db(booking.updated_at))
        .bind(opt_ts_to_db(booking.confirmed_at))
        .bind(opt_ts_to_db(booking.cancelled_at))
        .bind(opt_ts_to_db(booking.checked_in_at))
        .bind(opt_ts_to_db(booking.checked_out_at))
        .bind(opt_ts_to_db(booking.refunded_at))
        .bind(id_to_db(booking.id.into_uuid()))
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        if result.rows_affected() == 0 {
            return match self.fetch_booking(booking.id).await? {
                None => Err(RepoError::NotFound),
                Some(current) => Err(RepoError::Conflict(format!(
                    "booking {} is now {}",
                    booking.id, current.status
                ))),
            };
        }

        Ok(booking.clone())
    }
}
