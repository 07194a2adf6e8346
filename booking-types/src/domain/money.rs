//! Decimal monetary value with embedded currency.

use std::fmt;

use exchange_rates::{CurrencyCode, ResolvedRate, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Non-negative money amount in a single currency.
///
/// Amounts are fixed-point decimals kept at cent precision; binary floats are
/// never used for prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    #[schema(value_type = String, example = "100.00")]
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    /// Creates a new Money value rounded to cents.
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self {
            amount: round_money(amount),
            currency,
        })
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Checked addition - returns error if currencies don't match.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| DomainError::ValidationError("amount overflow".into()))?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// Checked subtraction - returns error if currencies don't match or the result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(other)?;
        if self.amount < other.amount {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// Converts into the rate's target currency.
    pub fn convert(&self, rate: &ResolvedRate) -> Result<Money, DomainError> {
        if rate.from != self.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: rate.from,
                got: self.currency,
            });
        }
        Ok(Money {
            amount: rate.convert(self.amount)?,
            currency: rate.to,
        })
    }

    fn ensure_same_currency(&self, other: Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_rates::{FallbackPolicy, resolve_rate};
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_creation_rounds_to_cents() {
        let money = Money::new(dec!(10.005), CurrencyCode::USD).unwrap();
        assert_eq!(money.amount(), dec!(10.01));
        assert_eq!(money.currency(), CurrencyCode::USD);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(dec!(-1), CurrencyCode::USD);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_money_addition() {
        let a = Money::new(dec!(100), CurrencyCode::USD).unwrap();
        let b = Money::new(dec!(50.50), CurrencyCode::USD).unwrap();
        assert_eq!(a.checked_add(b).unwrap().amount(), dec!(150.50));
    }

    #[test]
    fn test_subtraction_below_zero_fails() {
        let a = Money::new(dec!(10), CurrencyCode::USD).unwrap();
        let b = Money::new(dec!(10.01), CurrencyCode::USD).unwrap();
        assert!(matches!(a.checked_sub(b), Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::new(dec!(100), CurrencyCode::USD).unwrap();
        let eur = Money::new(dec!(50), CurrencyCode::EUR).unwrap();
        let result = usd.checked_add(eur);
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_convert_with_rate() {
        let rate = resolve_rate(
            CurrencyCode::KES,
            CurrencyCode::USD,
            None,
            None,
            FallbackPolicy::DefaultTable,
        )
        .unwrap();
        let kes = Money::new(dec!(13000), CurrencyCode::KES).unwrap();
        let usd = kes.convert(&rate).unwrap();
        assert_eq!(usd.amount(), dec!(100.00));
        assert_eq!(usd.currency(), CurrencyCode::USD);

        let eur = Money::new(dec!(1), CurrencyCode::EUR).unwrap();
        assert!(eur.convert(&rate).is_err());
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(dec!(10.5), CurrencyCode::USD).unwrap();
        assert_eq!(format!("{}", money), "$10.50");
    }

    #[test]
    fn test_money_serializes_amount_as_string() {
        let money = Money::new(dec!(99.90), CurrencyCode::KES).unwrap();
        let json = serde_json::to_value(money).unwrap();
        assert_eq!(json["amount"], "99.90");
        assert_eq!(json["currency"], "KES");
    }
}
