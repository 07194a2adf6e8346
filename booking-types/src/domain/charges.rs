//! One-off fees and taxes applied to a stay subtotal.

use exchange_rates::{ResolvedRate, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::room::{Fee, Tax};
use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FeeLine {
    pub name: String,
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
    pub is_percentage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaxLine {
    pub name: String,
    #[schema(value_type = String, example = "16.00")]
    pub rate: Decimal,
    #[schema(value_type = String, example = "48.00")]
    pub amount: Decimal,
    pub is_inclusive: bool,
}

/// Result of applying a room's fees and taxes to a subtotal.
///
/// `tax_total` only counts exclusive taxes. Inclusive taxes are already part of
/// the nightly prices and are reported in `inclusive_tax_total` for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Charges {
    pub fees: Vec<FeeLine>,
    pub taxes: Vec<TaxLine>,
    #[schema(value_type = String)]
    pub fee_total: Decimal,
    #[schema(value_type = String)]
    pub tax_total: Decimal,
    #[schema(value_type = String)]
    pub inclusive_tax_total: Decimal,
}

fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / Decimal::ONE_HUNDRED)
}

impl Charges {
    /// Applies charges once per stay. Optional fees are skipped.
    ///
    /// `fixed_rate` converts fixed fee amounts from the room currency into the
    /// subtotal's currency.
    pub fn aggregate(
        subtotal: Decimal,
        fees: &[Fee],
        taxes: &[Tax],
        fixed_rate: &ResolvedRate,
    ) -> Result<Self, DomainError> {
        let mut fee_lines = Vec::new();
        for fee in fees.iter().filter(|f| f.is_mandatory) {
            let amount = if fee.is_percentage {
                percent_of(subtotal, fee.amount)
            } else {
                fixed_rate.convert(round_money(fee.amount))?
            };
            fee_lines.push(FeeLine {
                name: fee.name.clone(),
                amount,
                is_percentage: fee.is_percentage,
            });
        }

        let tax_lines: Vec<TaxLine> = taxes
            .iter()
            .map(|tax| {
                let amount = if tax.is_inclusive {
                    let divisor = Decimal::ONE + tax.rate / Decimal::ONE_HUNDRED;
                    round_money(subtotal - subtotal / divisor)
                } else {
                    percent_of(subtotal, tax.rate)
                };
                TaxLine {
                    name: tax.name.clone(),
                    rate: tax.rate,
                    amount,
                    is_inclusive: tax.is_inclusive,
                }
            })
            .collect();

        let fee_total = round_money(fee_lines.iter().map(|l| l.amount).sum());
        let tax_total = round_money(
            tax_lines
                .iter()
                .filter(|l| !l.is_inclusive)
                .map(|l| l.amount)
                .sum(),
        );
        let inclusive_tax_total = round_money(
            tax_lines
                .iter()
                .filter(|l| l.is_inclusive)
                .map(|l| l.amount)
                .sum(),
        );

        Ok(Self {
            fees: fee_lines,
            taxes: tax_lines,
            fee_total,
            tax_total,
            inclusive_tax_total,
        })
    }

    /// Amount added on top of the subtotal.
    pub fn additional(&self) -> Decimal {
        self.fee_total + self.tax_total
    }
}
