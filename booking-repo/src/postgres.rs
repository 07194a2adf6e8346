//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

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
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
///
/// Booking commits lock the room row with `SELECT ... FOR UPDATE`, which
/// serializes concurrent bookings of the same room.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_tables_pg.sql"),
        "0001",
    )
    .await
}

/// Serialization failures, deadlocks and unique violations are retryable.
fn map_write_err(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        let contention = matches!(db.code().as_deref(), Some("40001") | Some("40P01"));
        if contention || db.is_unique_violation() {
            return RepoError::Conflict(db.message().to_string());
        }
    }
    RepoError::Database(err.to_string())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn overlapping_bookings(
        tx: &mut Transaction<'_, Postgres>,
        room_id: RoomId,
        range: StayRange,
    ) -> Result<Vec<Booking>, RepoError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE room_id = $1 AND status IN ({BLOCKING_STATUSES_SQL}) \
             AND check_in < $2 AND check_out > $3 ORDER BY check_in"
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
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<DbBooking> = sqlx::query_as(&sql)
            .bind(id.into_uuid())
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
impl ExchangeRateProvider for PostgresRepo {
    async fn record_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate, RepoError> {
        sqlx::query(
            r#"INSERT INTO exchange_rates (from_currency, to_currency, rate, as_of) VALUES ($1, $2, $3, $4)
               ON CONFLICT (from_currency, to_currency, as_of) DO UPDATE SET rate = EXCLUDED.rate"#,
        )
        .bind(rate.from.code())
        .bind(rate.to.code())
        .bind(rate.rate)
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
               WHERE from_currency = $1 AND to_currency = $2 ORDER BY as_of DESC LIMIT 1"#,
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
impl BookingRepository for PostgresRepo {
    async fn create_room(&self, room: Room) -> Result<Room, RepoError> {
        sqlx::query(&format!(
            "INSERT INTO rooms ({ROOM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(room.id.into_uuid())
        .bind(room.hotel_id.into_uuid())
        .bind(&room.name)
        .bind(&room.room_type)
        .bind(count_to_db(room.max_occupancy)?)
        .bind(room.base_price)
        .bind(room.currency.code())
        .bind(count_to_db(room.min_stay)?)
        .bind(room.max_stay.map(count_to_db).transpose()?)
        .bind(room.is_active)
        .bind(Json(&room.fees))
        .bind(Json(&room.taxes))
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(room)
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        let row: Option<DbRoom> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
                .bind(id.into_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRoom::into_domain).transpose()
    }

    async fn list_rooms(&self, hotel_id: Option<HotelId>) -> Result<Vec<Room>, RepoError> {
        let rows: Vec<DbRoom> = sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms \
             WHERE ($1::uuid IS NULL OR hotel_id = $1) ORDER BY created_at, name"
        ))
        .bind(hotel_id.map(HotelId::into_uuid))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRoom::into_domain).collect()
    }

    async fn upsert_daily_price(
        &self,
        entry: DailyPriceEntry,
    ) -> Result<DailyPriceEntry, RepoError> {
        sqlx::query(
            r#"INSERT INTO daily_room_prices (room_id, date, price, currency, is_available, rate_used)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (room_id, date) DO UPDATE SET
                   price = EXCLUDED.price,
                   currency = EXCLUDED.currency,
                   is_available = EXCLUDED.is_available,
                   rate_used = EXCLUDED.rate_used"#,
        )
        .bind(entry.room_id.into_uuid())
        .bind(entry.date)
        .bind(entry.price)
        .bind(entry.currency.code())
        .bind(entry.is_available)
        .bind(entry.rate_used)
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
               WHERE room_id = $1 AND date >= $2 AND date < $3 ORDER BY date"#,
        )
        .bind(room_id.into_uuid())
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
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Lock the room row; concurrent bookings of this room wait here
        let room: Option<(bool,)> =
            sqlx::query_as(r#"SELECT is_active FROM rooms WHERE id = $1 FOR UPDATE"#)
                .bind(booking.room_id.into_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_write_err)?;
        match room {
            None => return Err(DomainError::RoomNotFound(booking.room_id).into()),
            Some((false,)) => return Err(DomainError::RoomInactive(booking.room_id).into()),
            Some((true,)) => {}
        }

        let stay = booking.stay();
        let existing = Self::overlapping_bookings(&mut tx, booking.room_id, stay).await?;
        let blocked: Vec<DbDailyPrice> = sqlx::query_as(
            r#"SELECT room_id, date, price, currency, is_available, rate_used FROM daily_room_prices
               WHERE room_id = $1 AND date >= $2 AND date < $3 AND NOT is_available"#,
        )
        .bind(booking.room_id.into_uuid())
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
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
              $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31)"
        ))
        .bind(booking.id.into_uuid())
        .bind(&booking.reference)
        .bind(booking.room_id.into_uuid())
        .bind(booking.hotel_id.into_uuid())
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
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE room_id = $1 ORDER BY check_in, created_at"
        ))
        .bind(room_id.into_uuid())
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
            r#"UPDATE bookings SET status = $1, updated_at = $2, confirmed_at = $3, cancelled_at = $4,
                   checked_in_at = $5, checked_out_at = $6, refunded_at = $7
               WHERE id = $8 AND status = $9"#,
        )
        .bind(booking.status.as_str())
        .bind(booking.updated_at)
        .bind(booking.confirmed_at)
        .bind(booking.cancelled_at)
        .bind(booking.checked_in_at)
        .bind(booking.checked_out_at)
        .bind(booking.refunded_at)
        .bind(booking.id.into_uuid())
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
