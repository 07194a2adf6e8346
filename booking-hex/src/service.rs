//! Booking Application Service
//!
//! Orchestrates domain operations through the repository port.
//! Contains NO infrastructure logic - pricing and availability rules live in
//! `booking-types`, this layer only loads their inputs and persists results.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use exchange_rates::{Conversions, FallbackPolicy, resolve_rate};
use rust_decimal::Decimal;

use booking_types::domain::{NewRoom, price_calendar, source_currencies};
use booking_types::{
    AppError, AvailabilityDecision, AvailableRoom, Booking, BookingDraft, BookingId,
    BookingRepository, BookingStatus, CalendarQuery, CreateBookingRequest, CreateRoomRequest,
    CurrencyCode, DailyPriceEntry, DomainError, ExchangeRate, HotelId, Money,
    PriceCalendarResponse, Quote, RecordExchangeRateRequest, RepoError, ResolvedRate, Room,
    RoomId, SetDailyPriceRequest, StayRange,
};

/// Tunables for pricing and booking commits.
#[derive(Debug, Clone, Copy)]
pub struct PricingPolicy {
    /// What to do when no exchange rate is recorded for a pair
    pub fallback: FallbackPolicy,
    /// Commit attempts per booking before a conflict is reported
    pub max_booking_attempts: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::DefaultTable,
            max_booking_attempts: 3,
        }
    }
}

/// Application service for room pricing, availability and bookings.
///
/// Generic over `R: BookingRepository` - the adapter is injected at compile time.
pub struct BookingService<R: BookingRepository> {
    repo: R,
    policy: PricingPolicy,
}

impl<R: BookingRepository> BookingService<R> {
    /// Creates a service with the default pricing policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, PricingPolicy::default())
    }

    pub fn with_policy(repo: R, policy: PricingPolicy) -> Self {
        Self { repo, policy }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn policy(&self) -> PricingPolicy {
        self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rooms
    // ─────────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(hotel_id = %req.hotel_id, name = %req.name))]
    pub async fn create_room(&self, req: CreateRoomRequest) -> Result<Room, AppError> {
        let room = Room::new(NewRoom::from(req))?;
        let room = self.repo.create_room(room).await?;
        tracing::info!(room_id = %room.id, "room created");
        Ok(room)
    }

    pub async fn get_room(&self, id: RoomId) -> Result<Room, AppError> {
        self.repo
            .get_room(id)
            .await?
            .ok_or_else(|| DomainError::RoomNotFound(id).into())
    }

    pub async fn list_rooms(&self, hotel_id: Option<HotelId>) -> Result<Vec<Room>, AppError> {
        self.repo.list_rooms(hotel_id).await.map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Daily prices
    // ─────────────────────────────────────────────────────────────────────────────

    /// Sets, converts or blocks the price of one date.
    #[tracing::instrument(skip_all, fields(room_id = %room_id, date = %req.date))]
    pub async fn set_daily_price(
        &self,
        room_id: RoomId,
        req: SetDailyPriceRequest,
    ) -> Result<DailyPriceEntry, AppError> {
        let room = self.get_room(room_id).await?;
        let target = req.currency.unwrap_or(room.currency);

        let (price, rate_used) = match (req.price, req.local_price) {
            (Some(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "give either price or local_price, not both".into(),
                ));
            }
            (Some(price), None) => (Money::new(price, target)?, None),
            (None, Some(local)) => {
                let local_currency = req.local_currency.ok_or_else(|| {
                    AppError::BadRequest("local_currency is required with local_price".into())
                })?;
                let local = Money::new(local, local_currency)?;
                let rate = self.resolve_rate(local_currency, target).await?;
                let converted = local.convert(&rate)?;
                let rate_used = (!rate.is_identity()).then(|| rate.stored_rate());
                (converted, rate_used)
            }
            (None, None) if !req.is_available => (room.base_rate(), None),
            (None, None) => {
                return Err(AppError::BadRequest(
                    "price or local_price is required for an available date".into(),
                ));
            }
        };

        let entry = DailyPriceEntry {
            room_id: room.id,
            date: req.date,
            price: price.amount(),
            currency: price.currency(),
            is_available: req.is_available,
            rate_used,
        };
        let entry = self.repo.upsert_daily_price(entry).await?;
        tracing::debug!(price = %entry.price, currency = %entry.currency, available = entry.is_available, "daily price set");
        Ok(entry)
    }

    /// One row per day of the inclusive range `[start, end]`.
    #[tracing::instrument(skip_all, fields(room_id = %room_id, start = %query.start, end = %query.end))]
    pub async fn price_calendar(
        &self,
        room_id: RoomId,
        query: CalendarQuery,
    ) -> Result<PriceCalendarResponse, AppError> {
        let room = self.get_room(room_id).await?;
        let range = StayRange::inclusive(query.start, query.end)?;
        let target = query.currency.unwrap_or(room.currency);

        let entries = self.repo.daily_prices(room.id, range).await?;
        let conversions = self
            .conversions(target, source_currencies(&room, &range, &entries))
            .await?;
        let days = price_calendar(&room, range, &entries, &conversions)?;

        Ok(PriceCalendarResponse {
            room_id: room.id,
            currency: target,
            days,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Exchange rates
    // ─────────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip_all, fields(from = %req.from, to = %req.to, rate = %req.rate))]
    pub async fn record_exchange_rate(
        &self,
        req: RecordExchangeRateRequest,
    ) -> Result<ExchangeRate, AppError> {
        let as_of = req.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let rate = ExchangeRate::new(req.from, req.to, req.rate, as_of).map_err(DomainError::from)?;
        self.repo.record_rate(rate).await.map_err(Into::into)
    }

    /// The rate a conversion `from -> to` would use right now.
    pub async fn latest_exchange_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<ResolvedRate, AppError> {
        self.resolve_rate(from, to).await
    }

    /// Latest direct record, else latest inverse record, else the fallback table.
    async fn resolve_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<ResolvedRate, AppError> {
        if from == to {
            return Ok(ResolvedRate::identity(from));
        }
        let direct = self.repo.latest_rate(from, to).await?;
        let inverse = match direct {
            Some(_) => None,
            None => self.repo.latest_rate(to, from).await?,
        };
        let rate = resolve_rate(
            from,
            to,
            direct.as_ref(),
            inverse.as_ref(),
            self.policy.fallback,
        )
        .map_err(DomainError::from)?;

        if rate.is_fallback() {
            tracing::warn!(
                from = %from,
                to = %to,
                rate = %rate.rate,
                "no exchange rate recorded, using fallback rate"
            );
        }
        Ok(rate)
    }

    async fn conversions(
        &self,
        target: CurrencyCode,
        sources: BTreeSet<CurrencyCode>,
    ) -> Result<Conversions, AppError> {
        let mut conversions = Conversions::new(target);
        for from in sources.into_iter().filter(|c| *c != target) {
            let rate = self.resolve_rate(from, target).await?;
            conversions.insert(rate).map_err(DomainError::from)?;
        }
        Ok(conversions)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Quotes & availability
    // ─────────────────────────────────────────────────────────────────────────────

    /// Prices a stay in `currency` (the room currency when `None`).
    #[tracing::instrument(skip_all, fields(room_id = %room_id, %check_in, %check_out))]
    pub async fn quote(
        &self,
        room_id: RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        currency: Option<CurrencyCode>,
    ) -> Result<Quote, AppError> {
        let stay = StayRange::for_stay(check_in, check_out)?;
        let room = self.get_room(room_id).await?;
        self.quote_room(&room, stay, currency).await
    }

    async fn quote_room(
        &self,
        room: &Room,
        stay: StayRange,
        currency: Option<CurrencyCode>,
    ) -> Result<Quote, AppError> {
        room.ensure_active()?;
        let target = currency.unwrap_or(room.currency);
        let entries = self.repo.daily_prices(room.id, stay).await?;
        let conversions = self
            .conversions(target, source_currencies(room, &stay, &entries))
            .await?;
        Ok(Quote::compute(room, stay, &entries, &conversions)?)
    }

    #[tracing::instrument(skip_all, fields(room_id = %room_id, %check_in, %check_out))]
    pub async fn check_availability(
        &self,
        room_id: RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<AvailabilityDecision, AppError> {
        let stay = StayRange::for_stay(check_in, check_out)?;
        let room = self.get_room(room_id).await?;
        room.ensure_active()?;
        self.availability(&room, stay).await
    }

    async fn availability(
        &self,
        room: &Room,
        stay: StayRange,
    ) -> Result<AvailabilityDecision, AppError> {
        let bookings = self.repo.active_bookings(room.id, stay).await?;
        let entries = self.repo.daily_prices(room.id, stay).await?;
        Ok(AvailabilityDecision::evaluate(
            room.id, stay, &bookings, &entries,
        ))
    }

    /// Active rooms of a hotel that can be booked for the stay, with quotes.
    #[tracing::instrument(skip_all, fields(hotel_id = %hotel_id, %check_in, %check_out))]
    pub async fn search_available_rooms(
        &self,
        hotel_id: HotelId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        currency: Option<CurrencyCode>,
    ) -> Result<Vec<AvailableRoom>, AppError> {
        let stay = StayRange::for_stay(check_in, check_out)?;
        let rooms = self.repo.list_rooms(Some(hotel_id)).await?;

        let mut available = Vec::new();
        for room in rooms.into_iter().filter(|r| r.is_active) {
            if !self.availability(&room, stay).await?.available {
                continue;
            }
            match self.quote_room(&room, stay, currency).await {
                Ok(quote) => available.push(AvailableRoom { room, quote }),
                // Stay rules or blocked nights rule the room out
                Err(AppError::DateUnavailable(_) | AppError::UnprocessableEntity(_)) => {}
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(count = available.len(), "available rooms found");
        Ok(available)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────────

    /// Quotes, checks and commits a booking.
    ///
    /// The commit re-validates availability atomically. A lost race or write
    /// contention is retried with a fresh quote up to
    /// `PricingPolicy::max_booking_attempts` times.
    #[tracing::instrument(skip_all, fields(room_id = %req.room_id, check_in = %req.check_in, check_out = %req.check_out))]
    pub async fn create_booking(&self, req: CreateBookingRequest) -> Result<Booking, AppError> {
        let stay = StayRange::for_stay(req.check_in, req.check_out)?;
        let draft = BookingDraft {
            guest: req.guest,
            discount: req.discount.unwrap_or(Decimal::ZERO),
            source: req.source.unwrap_or_default(),
            special_requests: req.special_requests,
        };
        let max_attempts = self.policy.max_booking_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;

            let room = self.get_room(req.room_id).await?;
            let quote = self.quote_room(&room, stay, req.currency).await?;
            self.availability(&room, stay)
                .await?
                .ensure_available()?;
            let booking = Booking::from_quote(&room, &quote, draft.clone(), Utc::now())?;

            match self.repo.create_booking(booking).await {
                Ok(booking) => {
                    tracing::info!(
                        booking_id = %booking.id,
                        reference = %booking.reference,
                        total = %booking.totals.total,
                        currency = %booking.currency,
                        "booking created"
                    );
                    return Ok(booking);
                }
                Err(RepoError::Domain(DomainError::BookingConflict { conflicts }))
                    if attempt < max_attempts =>
                {
                    tracing::warn!(attempt, conflicts = conflicts.len(), "booking lost a race at commit, retrying");
                }
                Err(RepoError::Conflict(msg)) if attempt < max_attempts => {
                    tracing::warn!(attempt, error = %msg, "write contention at booking commit, retrying");
                }
                Err(RepoError::Conflict(_)) => {
                    return Err(AppError::BookingConflict(vec![stay]));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<Booking, AppError> {
        self.repo
            .get_booking(id)
            .await?
            .ok_or_else(|| DomainError::BookingNotFound(id).into())
    }

    pub async fn list_room_bookings(&self, room_id: RoomId) -> Result<Vec<Booking>, AppError> {
        let room = self.get_room(room_id).await?;
        self.repo
            .list_bookings_for_room(room.id)
            .await
            .map_err(Into::into)
    }

    /// Moves a booking along its lifecycle.
    #[tracing::instrument(skip_all, fields(booking_id = %id, status = %status))]
    pub async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let mut booking = self.get_booking(id).await?;
        let expected = booking.status;
        let now = Utc::now();
        booking.transition(status, now.date_naive(), now)?;

        let booking = self.repo.update_booking_status(&booking, expected).await?;
        tracing::info!(from = %expected, to = %booking.status, "booking status updated");
        Ok(booking)
    }
}
