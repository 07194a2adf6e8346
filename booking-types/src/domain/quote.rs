//! Stay quotes and the price calendar.
//!
//! Both are pure functions of a room snapshot, its daily overrides and a set of
//! resolved exchange rates. Each night is converted from the currency of the
//! layer that priced it, so overrides stored in the display currency are never
//! converted while base-priced nights are.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use exchange_rates::{Conversions, CurrencyCode, ResolvedRate, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::calendar::StayRange;
use super::charges::{Charges, FeeLine, TaxLine};
use super::daily_price::{DailyPriceEntry, NightlyRate, PriceSource};
use super::ids::RoomId;
use super::money::Money;
use super::room::Room;
use crate::error::DomainError;

/// Longest range a price calendar may cover.
pub const MAX_CALENDAR_DAYS: u32 = 366;

/// One night of a quote, in the display currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NightlyPrice {
    pub date: NaiveDate,
    #[schema(value_type = String, example = "100.00")]
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub source: PriceSource,
    #[schema(value_type = String)]
    pub original_price: Decimal,
    pub original_currency: CurrencyCode,
    /// Rate applied when the night was converted
    #[schema(value_type = Option<String>)]
    pub rate_applied: Option<Decimal>,
}

/// A computed, not yet committed price for a candidate stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub per_night: Vec<NightlyPrice>,
    #[schema(value_type = String, example = "300.00")]
    pub subtotal: Decimal,
    pub fees: Vec<FeeLine>,
    pub taxes: Vec<TaxLine>,
    #[schema(value_type = String)]
    pub fee_total: Decimal,
    #[schema(value_type = String)]
    pub tax_total: Decimal,
    #[schema(value_type = String)]
    pub inclusive_tax_total: Decimal,
    #[schema(value_type = String, example = "300.00")]
    pub total: Decimal,
    pub currency: CurrencyCode,
    /// Non-identity rates used by this quote
    pub rates: Vec<ResolvedRate>,
}

/// One row of a room's price calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CalendarDay {
    pub date: NaiveDate,
    #[schema(value_type = String, example = "100.00")]
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub available: bool,
    pub source: PriceSource,
    #[schema(value_type = Option<String>)]
    pub rate_applied: Option<Decimal>,
}

fn index_by_date(entries: &[DailyPriceEntry]) -> HashMap<NaiveDate, &DailyPriceEntry> {
    entries.iter().map(|e| (e.date, e)).collect()
}

/// Currencies a quote or calendar over `range` may need rates from.
pub fn source_currencies(
    room: &Room,
    range: &StayRange,
    entries: &[DailyPriceEntry],
) -> BTreeSet<CurrencyCode> {
    std::iter::once(room.currency)
        .chain(
            entries
                .iter()
                .filter(|e| range.contains(e.date))
                .map(|e| e.currency),
        )
        .collect()
}

fn convert_night(
    date: NaiveDate,
    price: Money,
    source: PriceSource,
    conversions: &Conversions,
    used: &mut BTreeMap<CurrencyCode, ResolvedRate>,
) -> Result<NightlyPrice, DomainError> {
    let rate = conversions.rate_from(price.currency())?;
    let converted = price.convert(&rate)?;
    let rate_applied = if rate.is_identity() {
        None
    } else {
        used.insert(rate.from, rate);
        Some(rate.stored_rate())
    };
    Ok(NightlyPrice {
        date,
        price: converted.amount(),
        currency: converted.currency(),
        source,
        original_price: price.amount(),
        original_currency: price.currency(),
        rate_applied,
    })
}

impl Quote {
    /// Prices every night of `stay` and applies the room's charges once.
    ///
    /// Fails without a partial result if the room is inactive, the stay length
    /// breaks the room's rules, any night is blocked (all blocked dates are
    /// listed) or a needed rate is missing.
    pub fn compute(
        room: &Room,
        stay: StayRange,
        entries: &[DailyPriceEntry],
        conversions: &Conversions,
    ) -> Result<Quote, DomainError> {
        room.ensure_active()?;
        room.check_stay_length(stay.nights())?;

        let by_date = index_by_date(entries);
        let rates: Vec<(NaiveDate, NightlyRate)> = stay
            .dates()
            .map(|date| (date, NightlyRate::resolve(room, by_date.get(&date).copied())))
            .collect();

        let blocked: Vec<NaiveDate> = rates
            .iter()
            .filter(|(_, rate)| rate.is_blocked())
            .map(|(date, _)| *date)
            .collect();
        if !blocked.is_empty() {
            return Err(DomainError::DateUnavailable { dates: blocked });
        }

        let mut used = BTreeMap::new();
        let mut per_night = Vec::with_capacity(rates.len());
        for (date, rate) in rates {
            if let Some((price, source)) = rate.price() {
                per_night.push(convert_night(date, price, source, conversions, &mut used)?);
            }
        }

        let subtotal = round_money(per_night.iter().map(|n| n.price).sum());

        let fixed_rate = conversions.rate_from(room.currency)?;
        if !fixed_rate.is_identity() && !room.fees.is_empty() {
            used.insert(fixed_rate.from, fixed_rate);
        }
        let charges = Charges::aggregate(subtotal, &room.fees, &room.taxes, &fixed_rate)?;
        let total = round_money(subtotal + charges.additional());

        Ok(Quote {
            room_id: room.id,
            check_in: stay.check_in,
            check_out: stay.check_out,
            nights: stay.nights(),
            per_night,
            subtotal,
            fees: charges.fees,
            taxes: charges.taxes,
            fee_total: charges.fee_total,
            tax_total: charges.tax_total,
            inclusive_tax_total: charges.inclusive_tax_total,
            total,
            currency: conversions.target(),
            rates: used.into_values().collect(),
        })
    }

    pub fn stay(&self) -> StayRange {
        StayRange {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    /// Rates that came from the fallback table.
    pub fn fallback_rates(&self) -> impl Iterator<Item = &ResolvedRate> {
        self.rates.iter().filter(|r| r.is_fallback())
    }
}

/// One row per day of `range`, blocked days included with `available = false`.
pub fn price_calendar(
    room: &Room,
    range: StayRange,
    entries: &[DailyPriceEntry],
    conversions: &Conversions,
) -> Result<Vec<CalendarDay>, DomainError> {
    if range.nights() > MAX_CALENDAR_DAYS {
        return Err(DomainError::ValidationError(format!(
            "calendar range is limited to {} days",
            MAX_CALENDAR_DAYS
        )));
    }

    let by_date = index_by_date(entries);
    let mut used = BTreeMap::new();
    range
        .dates()
        .map(|date| {
            let entry = by_date.get(&date).copied();
            let (price, source, available) = match NightlyRate::resolve(room, entry) {
                NightlyRate::Override(price) => (price, PriceSource::Override, true),
                NightlyRate::Base(price) => (price, PriceSource::Base, true),
                NightlyRate::Blocked => {
                    let nominal = entry
                        .and_then(|e| Money::new(e.price, e.currency).ok())
                        .unwrap_or_else(|| room.base_rate());
                    (nominal, PriceSource::Override, false)
                }
            };
            let night = convert_night(date, price, source, conversions, &mut used)?;
            Ok(CalendarDay {
                date,
                price: night.price,
                currency: night.currency,
                available,
                source,
                rate_applied: night.rate_applied,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::tests::new_room;
    use crate::domain::room::{Fee, Tax};
    use chrono::Days;
    use exchange_rates::{FallbackPolicy, resolve_rate};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn stay(a: NaiveDate, b: NaiveDate) -> StayRange {
        StayRange::new(a, b).unwrap()
    }

    fn usd_room() -> Room {
        Room::new(new_room(dec!(100), CurrencyCode::USD)).unwrap()
    }

    fn usd_only() -> Conversions {
        Conversions::new(CurrencyCode::USD)
    }

    fn kes_to_usd() -> Conversions {
        let mut table = Conversions::new(CurrencyCode::USD);
        table
            .insert(
                resolve_rate(
                    CurrencyCode::KES,
                    CurrencyCode::USD,
                    None,
                    None,
                    FallbackPolicy::DefaultTable,
                )
                .unwrap(),
            )
            .unwrap();
        table
    }

    fn override_entry(room: &Room, date: NaiveDate, price: Decimal, available: bool) -> DailyPriceEntry {
        DailyPriceEntry {
            room_id: room.id,
            date,
            price,
            currency: room.currency,
            is_available: available,
            rate_used: None,
        }
    }

    #[test]
    fn test_base_price_three_nights() {
        let room = usd_room();
        let quote =
            Quote::compute(&room, stay(date(3, 1), date(3, 4)), &[], &usd_only()).unwrap();

        assert_eq!(quote.nights, 3);
        assert_eq!(quote.per_night.len(), 3);
        assert!(quote.per_night.iter().all(|n| n.price == dec!(100.00)));
        assert_eq!(quote.subtotal, dec!(300.00));
        assert_eq!(quote.total, dec!(300.00));
        assert!(quote.rates.is_empty());
    }

    #[test]
    fn test_override_replaces_single_night() {
        let room = usd_room();
        let entries = [override_entry(&room, date(3, 2), dec!(150), true)];
        let quote =
            Quote::compute(&room, stay(date(3, 1), date(3, 4)), &entries, &usd_only()).unwrap();

        let prices: Vec<_> = quote.per_night.iter().map(|n| n.price).collect();
        assert_eq!(prices, vec![dec!(100.00), dec!(150.00), dec!(100.00)]);
        assert_eq!(quote.per_night[1].source, PriceSource::Override);
        assert_eq!(quote.subtotal, dec!(350.00));
    }

    #[test]
    fn test_one_night_single_line() {
        let room = usd_room();
        let quote =
            Quote::compute(&room, stay(date(3, 1), date(3, 2)), &[], &usd_only()).unwrap();
        assert_eq!(quote.per_night.len(), 1);
        assert_eq!(quote.per_night[0].date, date(3, 1));
    }

    #[test]
    fn test_checkout_night_not_priced() {
        let room = usd_room();
        let entries = [override_entry(&room, date(3, 4), dec!(999), false)];
        let quote =
            Quote::compute(&room, stay(date(3, 1), date(3, 4)), &entries, &usd_only()).unwrap();
        assert_eq!(quote.subtotal, dec!(300.00));
    }

    #[test]
    fn test_blocked_dates_all_reported() {
        let room = usd_room();
        let entries = [
            override_entry(&room, date(3, 2), dec!(100), false),
            override_entry(&room, date(3, 3), dec!(100), false),
        ];
        let result = Quote::compute(&room, stay(date(3, 1), date(3, 5)), &entries, &usd_only());
        assert_eq!(
            result,
            Err(DomainError::DateUnavailable {
                dates: vec![date(3, 2), date(3, 3)]
            })
        );
    }

    #[test]
    fn test_inactive_room_rejected() {
        let mut room = usd_room();
        room.is_active = false;
        let result = Quote::compute(&room, stay(date(3, 1), date(3, 2)), &[], &usd_only());
        assert!(matches!(result, Err(DomainError::RoomInactive(_))));
    }

    #[test]
    fn test_fees_and_taxes_applied_once() {
        let mut room = usd_room();
        room.fees.push(Fee {
            name: "Cleaning".into(),
            amount: dec!(20),
            is_percentage: false,
            is_mandatory: true,
        });
        room.taxes.push(Tax {
            name: "VAT".into(),
            rate: dec!(10),
            is_inclusive: false,
        });
        let quote =
            Quote::compute(&room, stay(date(3, 1), date(3, 4)), &[], &usd_only()).unwrap();

        assert_eq!(quote.fee_total, dec!(20.00));
        assert_eq!(quote.tax_total, dec!(30.00));
        assert_eq!(quote.total, dec!(350.00));
    }

    #[test]
    fn test_per_night_conversion_tracks_source_currency() {
        // KES room with one override already stored in USD
        let room = Room::new(new_room(dec!(13000), CurrencyCode::KES)).unwrap();
        let entries = [DailyPriceEntry {
            room_id: room.id,
            date: date(3, 2),
            price: dec!(120),
            currency: CurrencyCode::USD,
            is_available: true,
            rate_used: Some(dec!(130.0000)),
        }];
        let quote =
            Quote::compute(&room, stay(date(3, 1), date(3, 3)), &entries, &kes_to_usd()).unwrap();

        assert_eq!(quote.currency, CurrencyCode::USD);
        assert_eq!(quote.per_night[0].price, dec!(100.00));
        assert_eq!(quote.per_night[0].rate_applied, Some(dec!(130.0000)));
        assert_eq!(quote.per_night[1].price, dec!(120.00));
        assert_eq!(quote.per_night[1].rate_applied, None);
        assert_eq!(quote.subtotal, dec!(220.00));
        assert_eq!(quote.fallback_rates().count(), 1);
    }

    #[test]
    fn test_missing_rate_is_reported() {
        let room = Room::new(new_room(dec!(13000), CurrencyCode::KES)).unwrap();
        let result = Quote::compute(&room, stay(date(3, 1), date(3, 2)), &[], &usd_only());
        assert!(matches!(result, Err(DomainError::RateUnavailable { .. })));
    }

    #[test]
    fn test_source_currencies_limited_to_range() {
        let room = Room::new(new_room(dec!(13000), CurrencyCode::KES)).unwrap();
        let mut inside = override_entry(&room, date(3, 1), dec!(1), true);
        inside.currency = CurrencyCode::EUR;
        let mut outside = override_entry(&room, date(4, 1), dec!(1), true);
        outside.currency = CurrencyCode::GBP;
        let currencies =
            source_currencies(&room, &stay(date(3, 1), date(3, 3)), &[inside, outside]);
        assert_eq!(
            currencies.into_iter().collect::<Vec<_>>(),
            vec![CurrencyCode::KES, CurrencyCode::EUR]
        );
    }

    #[test]
    fn test_calendar_lists_blocked_days() {
        let room = usd_room();
        let entries = [
            override_entry(&room, date(3, 2), dec!(150), true),
            override_entry(&room, date(3, 3), dec!(80), false),
        ];
        let days = price_calendar(
            &room,
            StayRange::inclusive(date(3, 1), date(3, 3)).unwrap(),
            &entries,
            &usd_only(),
        )
        .unwrap();

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].source, PriceSource::Base);
        assert_eq!(days[1].price, dec!(150.00));
        assert!(!days[2].available);
        assert_eq!(days[2].price, dec!(80.00));
    }

    #[test]
    fn test_calendar_range_capped() {
        let room = usd_room();
        let start = date(1, 1);
        let range = StayRange::inclusive(start, start + Days::new(366)).unwrap();
        assert!(matches!(
            price_calendar(&room, range, &[], &usd_only()),
            Err(DomainError::ValidationError(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_no_overrides_total_is_base_times_nights(
            cents in 0i64..10_000_000,
            nights in 1u64..60,
            fee_cents in 0i64..100_000,
            tax_bp in 0i64..3_000,
        ) {
            let base = Decimal::new(cents, 2);
            let mut room = Room::new(new_room(base, CurrencyCode::USD)).unwrap();
            room.fees.push(Fee {
                name: "Cleaning".into(),
                amount: Decimal::new(fee_cents, 2),
                is_percentage: false,
                is_mandatory: true,
            });
            room.taxes.push(Tax { name: "VAT".into(), rate: Decimal::new(tax_bp, 2), is_inclusive: false });
            let check_in = date(3, 1);
            let range = stay(check_in, check_in + Days::new(nights));

            let quote = Quote::compute(&room, range, &[], &usd_only()).unwrap();
            let subtotal = base * Decimal::from(nights);
            let expected = subtotal
                + Decimal::new(fee_cents, 2)
                + round_money(subtotal * Decimal::new(tax_bp, 2) / Decimal::ONE_HUNDRED);
            prop_assert_eq!(quote.subtotal, subtotal);
            prop_assert_eq!(quote.total, expected);
        }

        #[test]
        fn prop_quote_is_idempotent(cents in 0i64..1_000_000, nights in 1u64..30, blocked in 0u64..40) {
            let room = Room::new(new_room(Decimal::new(cents, 4), CurrencyCode::KES)).unwrap();
            let check_in = date(3, 1);
            let entries = vec![override_entry(&room, check_in + Days::new(blocked), dec!(5), false)];
            let range = stay(check_in, check_in + Days::new(nights));

            let first = Quote::compute(&room, range, &entries, &kes_to_usd());
            let second = Quote::compute(&room, range, &entries, &kes_to_usd());
            prop_assert_eq!(first, second);
        }
    }
}
