//! Currency table and exchange rate resolution for room pricing.
//!
//! Currencies are defined declaratively with a macro that generates the
//! runtime `CurrencyCode` enum together with its metadata and the fallback
//! table used when no rate has been recorded for a pair.
//!
//! # Rate convention
//! An [`ExchangeRate`] from `KES` to `USD` with rate `130` means that 130 KES
//! buy one USD. Converting an amount from `from` to `to` divides by the rate;
//! converting back multiplies by it.
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use exchange_rates::{CurrencyCode, ExchangeRate, FallbackPolicy, RateBook};
//! use rust_decimal::Decimal;
//!
//! let mut book = RateBook::new();
//! let as_of = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, Decimal::new(130, 0), as_of).unwrap());
//!
//! let rate = book
//!     .resolve(CurrencyCode::KES, CurrencyCode::USD, FallbackPolicy::DefaultTable)
//!     .unwrap();
//! assert_eq!(rate.convert(Decimal::new(1300000, 2)).unwrap(), Decimal::new(10000, 2));
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept on every money amount.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept on a rate persisted next to a converted price.
pub const RATE_SCALE: u32 = 4;

/// Rounds a money amount to cents, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Rounds a rate to four decimal places, half-up.
pub fn round_rate(rate: Decimal) -> Decimal {
    let mut rounded = rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATE_SCALE);
    rounded
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for exchange rate operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Exchange rate must be positive, got {0}")]
    NonPositiveRate(Decimal),

    #[error("From and to currencies must differ, got {0} for both")]
    SameCurrency(CurrencyCode),

    #[error("Rate not available for {0} -> {1}")]
    RateNotAvailable(CurrencyCode, CurrencyCode),

    #[error("Conversion overflow for {0} -> {1}")]
    Overflow(CurrencyCode, CurrencyCode),
}

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines all currencies, CurrencyCode enum, and fallback table
// ─────────────────────────────────────────────────────────────────────────────

/// Macro to define currencies with auto-generated metadata and fallback rates.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     Name => ("CODE", "SYMBOL", "minor_unit", decimal_places, (units_per_usd_mantissa, scale)),
/// }
/// ```
#[macro_export]
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $minor:literal, $places:expr, ($per_usd:expr, $per_usd_scale:expr))
        ),* $(,)?
    ) => {
        /// ISO-4217 currency codes accepted by the pricing engine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, utoipa::ToSchema)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum CurrencyCode {
            $($name),*
        }

        impl CurrencyCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $symbol),*
                }
            }

            pub fn minor_unit(&self) -> &'static str {
                match self {
                    $(CurrencyCode::$name => $minor),*
                }
            }

            pub fn decimal_places(&self) -> u32 {
                match self {
                    $(CurrencyCode::$name => $places),*
                }
            }

            /// Units of this currency that buy one USD when no rate is recorded.
            pub fn fallback_units_per_usd(&self) -> Decimal {
                match self {
                    $(CurrencyCode::$name => Decimal::new($per_usd, $per_usd_scale)),*
                }
            }

            pub fn all() -> &'static [CurrencyCode] {
                &[$(CurrencyCode::$name),*]
            }
        }

        impl std::fmt::Display for CurrencyCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for CurrencyCode {
            type Err = ExchangeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(CurrencyCode::$name),)*
                    _ => Err(ExchangeError::UnsupportedCurrency(s.to_string())),
                }
            }
        }

        /// Accepts any case, like `FromStr`.
        impl<'de> serde::Deserialize<'de> for CurrencyCode {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let code = <String as serde::Deserialize>::deserialize(deserializer)?;
                code.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS - Add new currencies here!
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    USD => ("USD", "$", "cent", 2, (1, 0)),
    KES => ("KES", "KSh", "cent", 2, (130, 0)),
    EUR => ("EUR", "€", "cent", 2, (92, 2)),
    GBP => ("GBP", "£", "penny", 2, (79, 2)),
    TZS => ("TZS", "TSh", "cent", 2, (2600, 0)),
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate records
// ─────────────────────────────────────────────────────────────────────────────

/// A recorded rate for one currency pair, effective from `as_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `from` that buy one unit of `to`
    #[schema(value_type = String, example = "130.0000")]
    pub rate: Decimal,
    pub as_of: NaiveDate,
}

impl ExchangeRate {
    /// Creates a rate record.
    ///
    /// # Validation
    /// - `rate` must be strictly positive
    /// - `from` and `to` must differ
    pub fn new(
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
        as_of: NaiveDate,
    ) -> Result<Self, ExchangeError> {
        if rate <= Decimal::ZERO {
            return Err(ExchangeError::NonPositiveRate(rate));
        }
        if from == to {
            return Err(ExchangeError::SameCurrency(from));
        }
        Ok(Self {
            from,
            to,
            rate,
            as_of,
        })
    }
}

/// What to do when no rate exists for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Use the built-in units-per-USD table.
    #[default]
    DefaultTable,
    /// Fail with [`ExchangeError::RateNotAvailable`].
    Disabled,
}

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateSource {
    /// Same currency on both sides.
    Identity,
    /// A record for the exact pair.
    Recorded { as_of: NaiveDate },
    /// A record for the reversed pair, inverted.
    Inverse { as_of: NaiveDate },
    /// The built-in default table.
    Fallback,
}

/// A rate ready to convert amounts from `from` into `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResolvedRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `from` that buy one unit of `to`
    #[schema(value_type = String, example = "130")]
    pub rate: Decimal,
    pub source: RateSource,
}

impl ResolvedRate {
    pub fn identity(currency: CurrencyCode) -> Self {
        Self {
            from: currency,
            to: currency,
            rate: Decimal::ONE,
            source: RateSource::Identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.source, RateSource::Identity)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, RateSource::Fallback)
    }

    /// Converts `amount` of `from` into `to`, rounded to cents half-up.
    pub fn convert(&self, amount: Decimal) -> Result<Decimal, ExchangeError> {
        if self.is_identity() {
            return Ok(amount);
        }
        amount
            .checked_div(self.rate)
            .map(round_money)
            .ok_or(ExchangeError::Overflow(self.from, self.to))
    }

    /// Converts `amount` of `to` back into `from` with the same rate.
    pub fn convert_back(&self, amount: Decimal) -> Result<Decimal, ExchangeError> {
        if self.is_identity() {
            return Ok(amount);
        }
        amount
            .checked_mul(self.rate)
            .map(round_money)
            .ok_or(ExchangeError::Overflow(self.to, self.from))
    }

    /// The rate as persisted next to a converted price.
    pub fn stored_rate(&self) -> Decimal {
        round_rate(self.rate)
    }
}

/// Resolves the rate for `from -> to` from the latest direct record, the
/// latest record of the reversed pair, then the fallback table.
pub fn resolve_rate(
    from: CurrencyCode,
    to: CurrencyCode,
    direct: Option<&ExchangeRate>,
    inverse: Option<&ExchangeRate>,
    policy: FallbackPolicy,
) -> Result<ResolvedRate, ExchangeError> {
    if from == to {
        return Ok(ResolvedRate::identity(from));
    }

    if let Some(record) = direct.filter(|r| r.rate > Decimal::ZERO) {
        return Ok(ResolvedRate {
            from,
            to,
            rate: record.rate,
            source: RateSource::Recorded {
                as_of: record.as_of,
            },
        });
    }

    if let Some(record) = inverse.filter(|r| r.rate > Decimal::ZERO) {
        let rate = Decimal::ONE
            .checked_div(record.rate)
            .ok_or(ExchangeError::Overflow(from, to))?;
        return Ok(ResolvedRate {
            from,
            to,
            rate,
            source: RateSource::Inverse {
                as_of: record.as_of,
            },
        });
    }

    match policy {
        FallbackPolicy::DefaultTable => {
            let rate = from
                .fallback_units_per_usd()
                .checked_div(to.fallback_units_per_usd())
                .ok_or(ExchangeError::Overflow(from, to))?;
            Ok(ResolvedRate {
                from,
                to,
                rate,
                source: RateSource::Fallback,
            })
        }
        FallbackPolicy::Disabled => Err(ExchangeError::RateNotAvailable(from, to)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory rate book
// ─────────────────────────────────────────────────────────────────────────────

/// Historical rate records grouped by pair.
#[derive(Debug, Clone, Default)]
pub struct RateBook {
    rates: HashMap<(CurrencyCode, CurrencyCode), Vec<ExchangeRate>>,
}

impl RateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rate, replacing any record for the same pair and date.
    pub fn record(&mut self, rate: ExchangeRate) {
        let history = self.rates.entry((rate.from, rate.to)).or_default();
        match history.iter_mut().find(|r| r.as_of == rate.as_of) {
            Some(existing) => *existing = rate,
            None => history.push(rate),
        }
    }

    /// The record with the latest `as_of` for the pair.
    pub fn latest(&self, from: CurrencyCode, to: CurrencyCode) -> Option<&ExchangeRate> {
        self.rates
            .get(&(from, to))
            .and_then(|history| history.iter().max_by_key(|r| r.as_of))
    }

    pub fn resolve(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        policy: FallbackPolicy,
    ) -> Result<ResolvedRate, ExchangeError> {
        resolve_rate(
            from,
            to,
            self.latest(from, to),
            self.latest(to, from),
            policy,
        )
    }

    pub fn len(&self) -> usize {
        self.rates.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion table towards one display currency
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved rates from any number of source currencies into one target.
#[derive(Debug, Clone)]
pub struct Conversions {
    target: CurrencyCode,
    rates: HashMap<CurrencyCode, ResolvedRate>,
}

impl Conversions {
    pub fn new(target: CurrencyCode) -> Self {
        Self {
            target,
            rates: HashMap::new(),
        }
    }

    pub fn target(&self) -> CurrencyCode {
        self.target
    }

    /// Adds a resolved rate; its `to` side must be the target currency.
    pub fn insert(&mut self, rate: ResolvedRate) -> Result<(), ExchangeError> {
        if rate.to != self.target {
            return Err(ExchangeError::RateNotAvailable(rate.from, self.target));
        }
        self.rates.insert(rate.from, rate);
        Ok(())
    }

    /// The rate from `from` into the target currency.
    pub fn rate_from(&self, from: CurrencyCode) -> Result<ResolvedRate, ExchangeError> {
        if from == self.target {
            return Ok(ResolvedRate::identity(from));
        }
        self.rates
            .get(&from)
            .copied()
            .ok_or(ExchangeError::RateNotAvailable(from, self.target))
    }

    /// Rates that came from the fallback table.
    pub fn fallbacks(&self) -> impl Iterator<Item = &ResolvedRate> {
        self.rates.values().filter(|r| r.is_fallback())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_currency_json_is_case_insensitive() {
        let code: CurrencyCode = serde_json::from_str("\"kes\"").unwrap();
        assert_eq!(code, CurrencyCode::KES);
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"KES\"");
        assert_eq!("Eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);

        let err = serde_json::from_str::<CurrencyCode>("\"XYZ\"").unwrap_err();
        assert!(err.to_string().contains("XYZ"));
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
        assert_eq!(round_money(dec!(0.005)), dec!(0.01));
        assert_eq!(round_money(dec!(100)).to_string(), "100.00");
    }

    #[test]
    fn test_round_rate_half_up() {
        assert_eq!(round_rate(dec!(129.99995)), dec!(130.0000));
        assert_eq!(round_rate(dec!(0.00769230)), dec!(0.0077));
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!("kes".parse::<CurrencyCode>().unwrap(), CurrencyCode::KES);
        assert!(matches!(
            "XYZ".parse::<CurrencyCode>(),
            Err(ExchangeError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_currency_code_display() {
        assert_eq!(CurrencyCode::KES.to_string(), "KES");
        assert_eq!(CurrencyCode::all().len(), 5);
    }

    #[test]
    fn test_rate_must_be_positive() {
        let result = ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(0), day(1));
        assert!(matches!(result, Err(ExchangeError::NonPositiveRate(_))));
    }

    #[test]
    fn test_rate_pair_must_differ() {
        let result = ExchangeRate::new(CurrencyCode::USD, CurrencyCode::USD, dec!(1), day(1));
        assert!(matches!(result, Err(ExchangeError::SameCurrency(_))));
    }

    #[test]
    fn test_latest_rate_wins() {
        let mut book = RateBook::new();
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(128), day(1)).unwrap());
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(131), day(5)).unwrap());
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(129), day(3)).unwrap());

        let latest = book.latest(CurrencyCode::KES, CurrencyCode::USD).unwrap();
        assert_eq!(latest.rate, dec!(131));
        assert_eq!(latest.as_of, day(5));
    }

    #[test]
    fn test_record_replaces_same_day() {
        let mut book = RateBook::new();
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(128), day(1)).unwrap());
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(130), day(1)).unwrap());

        assert_eq!(book.len(), 1);
        assert_eq!(
            book.latest(CurrencyCode::KES, CurrencyCode::USD).unwrap().rate,
            dec!(130)
        );
    }

    #[test]
    fn test_resolve_direct_record() {
        let mut book = RateBook::new();
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(130), day(2)).unwrap());

        let rate = book
            .resolve(CurrencyCode::KES, CurrencyCode::USD, FallbackPolicy::Disabled)
            .unwrap();
        assert_eq!(rate.source, RateSource::Recorded { as_of: day(2) });
        assert_eq!(rate.convert(dec!(13000.00)).unwrap(), dec!(100.00));
        assert_eq!(rate.convert_back(dec!(100.00)).unwrap(), dec!(13000.00));
    }

    #[test]
    fn test_resolve_inverse_record() {
        let mut book = RateBook::new();
        book.record(ExchangeRate::new(CurrencyCode::KES, CurrencyCode::USD, dec!(130), day(2)).unwrap());

        let rate = book
            .resolve(CurrencyCode::USD, CurrencyCode::KES, FallbackPolicy::Disabled)
            .unwrap();
        assert_eq!(rate.source, RateSource::Inverse { as_of: day(2) });
        assert_eq!(rate.convert(dec!(100.00)).unwrap(), dec!(13000.00));
    }

    #[test]
    fn test_resolve_fallback_table() {
        let book = RateBook::new();
        let rate = book
            .resolve(CurrencyCode::KES, CurrencyCode::USD, FallbackPolicy::DefaultTable)
            .unwrap();

        assert!(rate.is_fallback());
        assert_eq!(rate.rate, dec!(130));
        assert_eq!(rate.stored_rate(), dec!(130.0000));
        assert_eq!(rate.convert(dec!(6500)).unwrap(), dec!(50.00));
    }

    #[test]
    fn test_resolve_without_fallback_fails() {
        let book = RateBook::new();
        let result = book.resolve(CurrencyCode::KES, CurrencyCode::USD, FallbackPolicy::Disabled);
        assert_eq!(
            result,
            Err(ExchangeError::RateNotAvailable(CurrencyCode::KES, CurrencyCode::USD))
        );
    }

    #[test]
    fn test_identity_conversion_keeps_amount() {
        let rate = ResolvedRate::identity(CurrencyCode::USD);
        assert_eq!(rate.convert(dec!(99.999)).unwrap(), dec!(99.999));
    }

    #[test]
    fn test_conversion_rounds_half_up() {
        let rate = resolve_rate(
            CurrencyCode::KES,
            CurrencyCode::USD,
            None,
            None,
            FallbackPolicy::DefaultTable,
        )
        .unwrap();
        // 1234.56 / 130 = 9.49661...
        assert_eq!(rate.convert(dec!(1234.56)).unwrap(), dec!(9.50));
    }

    #[test]
    fn test_conversions_table() {
        let mut table = Conversions::new(CurrencyCode::USD);
        let kes = resolve_rate(
            CurrencyCode::KES,
            CurrencyCode::USD,
            None,
            None,
            FallbackPolicy::DefaultTable,
        )
        .unwrap();
        table.insert(kes).unwrap();

        assert!(table.rate_from(CurrencyCode::USD).unwrap().is_identity());
        assert_eq!(table.rate_from(CurrencyCode::KES).unwrap().rate, dec!(130));
        assert!(table.rate_from(CurrencyCode::EUR).is_err());
        assert_eq!(table.fallbacks().count(), 1);
    }

    #[test]
    fn test_conversions_reject_wrong_target() {
        let mut table = Conversions::new(CurrencyCode::USD);
        let eur_kes = resolve_rate(
            CurrencyCode::EUR,
            CurrencyCode::KES,
            None,
            None,
            FallbackPolicy::DefaultTable,
        )
        .unwrap();
        assert!(table.insert(eur_kes).is_err());
    }

    fn kes_per_usd(rate: Decimal) -> ResolvedRate {
        ResolvedRate {
            from: CurrencyCode::KES,
            to: CurrencyCode::USD,
            rate,
            source: RateSource::Recorded { as_of: day(1) },
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_kes_usd_round_trip_within_a_cent(
            cents in 0i64..100_000_000,
            ten_thousandths in 10_000i64..50_000_000,
        ) {
            let rate = kes_per_usd(Decimal::new(ten_thousandths, RATE_SCALE));
            let kes = Decimal::new(cents, 2);

            let usd = rate.convert(kes).unwrap();
            let back = rate.convert_back(usd).unwrap();
            let again = rate.convert(back).unwrap();

            proptest::prop_assert!((again - usd).abs() <= dec!(0.01));
        }

        #[test]
        fn prop_usd_kes_usd_is_stable(
            cents in 0i64..10_000_000,
            ten_thousandths in 10_000i64..50_000_000,
        ) {
            let rate = kes_per_usd(Decimal::new(ten_thousandths, RATE_SCALE));
            let usd = Decimal::new(cents, 2);

            let kes = rate.convert_back(usd).unwrap();
            proptest::prop_assert!((rate.convert(kes).unwrap() - usd).abs() <= dec!(0.01));
        }
    }
}
