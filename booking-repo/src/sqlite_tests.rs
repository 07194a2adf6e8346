//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use booking_types::domain::NewRoom;
    use booking_types::{
        Booking, BookingDraft, BookingRepository, BookingSource, BookingStatus, CurrencyCode,
        DailyPriceEntry, DomainError, ExchangeRate, ExchangeRateProvider, Fee, GuestDetails,
        HotelId, Quote, RepoError, Room, RoomId, StayRange, Tax,
    };
    use chrono::{NaiveDate, Utc};
    use exchange_rates::Conversions;
    use rust_decimal_macros::dec;

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn stay(a: NaiveDate, b: NaiveDate) -> StayRange {
        StayRange::new(a, b).unwrap()
    }

    fn new_room(hotel_id: HotelId, name: &str) -> Room {
        Room::new(NewRoom {
            hotel_id,
            name: name.to_string(),
            room_type: "double".to_string(),
            max_occupancy: 2,
            base_price: dec!(100.00),
            currency: CurrencyCode::USD,
            min_stay: 1,
            max_stay: None,
            is_active: true,
            fees: vec![Fee {
                name: "Cleaning".into(),
                amount: dec!(15.00),
                is_percentage: false,
                is_mandatory: true,
            }],
            taxes: vec![Tax {
                name: "VAT".into(),
                rate: dec!(16.00),
                is_inclusive: true,
            }],
        })
        .unwrap()
    }

    async fn create_room(repo: &SqliteRepo) -> Room {
        repo.create_room(new_room(HotelId::new(), "Room 1"))
            .await
            .unwrap()
    }

    fn booking_for(room: &Room, range: StayRange) -> Booking {
        let quote = Quote::compute(room, range, &[], &Conversions::new(room.currency)).unwrap();
        let draft = BookingDraft {
            guest: GuestDetails {
                first_name: "Amina".into(),
                last_name: "Otieno".into(),
                email: "amina@example.com".into(),
                phone: Some("+254700000000".into()),
                adults: 2,
                children: 0,
                infants: 1,
            },
            discount: dec!(0),
            source: BookingSource::Website,
            special_requests: None,
        };
        Booking::from_quote(room, &quote, draft, Utc::now()).unwrap()
    }

    fn blocked(room: &Room, day: NaiveDate) -> DailyPriceEntry {
        DailyPriceEntry {
            room_id: room.id,
            date: day,
            price: room.base_price,
            currency: room.currency,
            is_available: false,
            rate_used: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rooms
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_get_room() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;

        let fetched = repo.get_room(room.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, room.id);
        assert_eq!(fetched.base_price, dec!(100.00));
        assert_eq!(fetched.currency, CurrencyCode::USD);
        assert_eq!(fetched.fees, room.fees);
        assert_eq!(fetched.taxes, room.taxes);
        assert_eq!(fetched.created_at, room.created_at);
    }

    #[tokio::test]
    async fn test_get_room_not_found() {
        let repo = setup_repo().await;
        assert!(repo.get_room(RoomId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_counts_beyond_integer_column_rejected() {
        let repo = setup_repo().await;
        let mut room = new_room(HotelId::new(), "Room 1");
        room.max_stay = Some(u32::MAX);

        let result = repo.create_room(room.clone()).await;

        assert!(matches!(result, Err(RepoError::Database(_))));
        assert!(repo.get_room(room.id).await.unwrap().is_none());

        let room = create_room(&repo).await;
        let mut booking = booking_for(&room, stay(date(3, 1), date(3, 2)));
        booking.guest.infants = u32::MAX;
        let result = repo.create_booking(booking.clone()).await;
        assert!(matches!(result, Err(RepoError::Database(_))));
        assert!(repo.get_booking(booking.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_rooms_by_hotel() {
        let repo = setup_repo().await;
        let hotel = HotelId::new();
        repo.create_room(new_room(hotel, "A")).await.unwrap();
        repo.create_room(new_room(hotel, "B")).await.unwrap();
        repo.create_room(new_room(HotelId::new(), "C"))
            .await
            .unwrap();

        assert_eq!(repo.list_rooms(Some(hotel)).await.unwrap().len(), 2);
        assert_eq!(repo.list_rooms(None).await.unwrap().len(), 3);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Daily prices & rates
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_daily_price_upsert_replaces_entry() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;

        let mut entry = DailyPriceEntry {
            room_id: room.id,
            date: date(3, 2),
            price: dec!(150.00),
            currency: CurrencyCode::USD,
            is_available: true,
            rate_used: None,
        };
        repo.upsert_daily_price(entry.clone()).await.unwrap();
        entry.price = dec!(175.00);
        entry.rate_used = Some(dec!(130.0000));
        repo.upsert_daily_price(entry.clone()).await.unwrap();

        let entries = repo
            .daily_prices(room.id, stay(date(3, 1), date(3, 4)))
            .await
            .unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[tokio::test]
    async fn test_daily_prices_range_is_half_open() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        for day in [date(3, 1), date(3, 3), date(3, 4)] {
            repo.upsert_daily_price(blocked(&room, day)).await.unwrap();
        }

        let entries = repo
            .daily_prices(room.id, stay(date(3, 1), date(3, 4)))
            .await
            .unwrap();
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(3, 1), date(3, 3)]);
    }

    #[tokio::test]
    async fn test_latest_rate_by_date() {
        let repo = setup_repo().await;
        for (rate, day) in [(dec!(128), date(1, 1)), (dec!(131), date(3, 1)), (dec!(129), date(2, 1))] {
            repo.record_rate(
                ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, rate, day).unwrap(),
            )
            .await
            .unwrap();
        }
        // Re-recording a date replaces it
        repo.record_rate(
            ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(132.5), date(3, 1))
                .unwrap(),
        )
        .await
        .unwrap();

        let latest = repo
            .latest_rate(CurrencyCode::KES, CurrencyCode::USD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.rate, dec!(132.5));
        assert_eq!(latest.as_of, date(3, 1));
        assert!(
            repo.latest_rate(CurrencyCode::USD, CurrencyCode::KES)
                .await
                .unwrap()
                .is_none()
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_get_booking() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        let booking = booking_for(&room, stay(date(3, 1), date(3, 4)));

        repo.create_booking(booking.clone()).await.unwrap();
        let fetched = repo.get_booking(booking.id).await.unwrap().unwrap();

        assert_eq!(fetched.reference, booking.reference);
        assert_eq!(fetched.status, BookingStatus::Pending);
        assert_eq!(fetched.source, BookingSource::Website);
        assert_eq!(fetched.guest, booking.guest);
        assert_eq!(fetched.nightly, booking.nightly);
        assert_eq!(fetched.totals, booking.totals);
        assert_eq!(fetched.totals.total, dec!(315.00));
    }

    #[tokio::test]
    async fn test_overlapping_booking_rejected() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        repo.create_booking(booking_for(&room, stay(date(1, 15), date(1, 20))))
            .await
            .unwrap();

        let result = repo
            .create_booking(booking_for(&room, stay(date(1, 10), date(1, 16))))
            .await;

        match result {
            Err(RepoError::Domain(DomainError::BookingConflict { conflicts })) => {
                assert_eq!(conflicts, vec![stay(date(1, 15), date(1, 16))]);
            }
            other => panic!("expected booking conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_day_turnover_allowed() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        repo.create_booking(booking_for(&room, stay(date(1, 15), date(1, 20))))
            .await
            .unwrap();

        repo.create_booking(booking_for(&room, stay(date(1, 10), date(1, 15))))
            .await
            .unwrap();
        repo.create_booking(booking_for(&room, stay(date(1, 20), date(1, 22))))
            .await
            .unwrap();

        assert_eq!(repo.list_bookings_for_room(room.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blocked_date_rejected_at_commit() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        let booking = booking_for(&room, stay(date(3, 1), date(3, 4)));
        repo.upsert_daily_price(blocked(&room, date(3, 2)))
            .await
            .unwrap();

        let result = repo.create_booking(booking).await;
        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::DateUnavailable { dates })) if dates == vec![date(3, 2)]
        ));
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_dates() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        let mut first = repo
            .create_booking(booking_for(&room, stay(date(3, 1), date(3, 4))))
            .await
            .unwrap();

        first
            .transition(BookingStatus::Cancelled, date(2, 1), Utc::now())
            .unwrap();
        repo.update_booking_status(&first, BookingStatus::Pending)
            .await
            .unwrap();

        let active = repo
            .active_bookings(room.id, stay(date(3, 1), date(3, 4)))
            .await
            .unwrap();
        assert!(active.is_empty());
        repo.create_booking(booking_for(&room, stay(date(3, 1), date(3, 4))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_booking_inactive_room_rejected() {
        let repo = setup_repo().await;
        let mut room = new_room(HotelId::new(), "Closed");
        let booking = booking_for(&room, stay(date(3, 1), date(3, 2)));
        room.is_active = false;
        repo.create_room(room).await.unwrap();

        let result = repo.create_booking(booking).await;
        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::RoomInactive(_)))
        ));
    }

    #[tokio::test]
    async fn test_status_update_detects_stale_write() {
        let repo = setup_repo().await;
        let room = create_room(&repo).await;
        let booking = repo
            .create_booking(booking_for(&room, stay(date(3, 1), date(3, 4))))
            .await
            .unwrap();

        let mut confirmed = booking.clone();
        confirmed
            .transition(BookingStatus::Confirmed, date(2, 1), Utc::now())
            .unwrap();
        let stored = repo
            .update_booking_status(&confirmed, BookingStatus::Pending)
            .await
            .unwrap();
        assert!(stored.confirmed_at.is_some());

        let mut cancelled = booking.clone();
        cancelled
            .transition(BookingStatus::Cancelled, date(2, 1), Utc::now())
            .unwrap();
        let result = repo
            .update_booking_status(&cancelled, BookingStatus::Pending)
            .await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));

        let fetched = repo.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, BookingStatus::Confirmed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_only_one_wins() {
        let repo = Arc::new(setup_repo().await);
        let room = create_room(&repo).await;
        let range = stay(date(5, 1), date(5, 3));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let booking = booking_for(&room, range);
                tokio::spawn(async move { repo.create_booking(booking).await })
            })
            .collect();

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(RepoError::Domain(DomainError::BookingConflict { .. })) => conflicts += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(repo.list_bookings_for_room(room.id).await.unwrap().len(), 1);
    }
}
